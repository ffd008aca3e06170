//! Error types for console-bridge.

use thiserror::Error;

/// Main error type for console session operations.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// The proxy URL could not be parsed.
    #[error("invalid proxy URL: {0}")]
    InvalidUrl(String),

    /// The proxy URL uses a scheme we cannot speak.
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// DNS resolution or TCP connection failed.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// TLS negotiation failed.
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// WebSocket protocol error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    /// A request header value could not be encoded.
    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),

    /// The WebSocket upgrade did not complete in time.
    #[error("handshake timeout: no WebSocket open after {0:?}")]
    HandshakeTimeout(std::time::Duration),

    /// The proxy did not acknowledge the ticket in time.
    #[error("authentication timeout: no OK from console proxy after {0:?}")]
    AuthenticationTimeout(std::time::Duration),

    /// The remote end closed the connection before the session started.
    #[error("connection closed by console proxy")]
    ConnectionClosed,

    /// Local terminal could not be configured.
    #[error("terminal error: {0}")]
    Terminal(std::io::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: crate::session::Phase,
        to: crate::session::Phase,
    },
}

impl From<tokio_tungstenite::tungstenite::Error> for ConsoleError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

/// Convenience Result type for console-bridge operations.
pub type Result<T> = std::result::Result<T, ConsoleError>;
