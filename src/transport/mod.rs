//! Byte-stream transport to the console proxy.
//!
//! Opens a TCP connection to the host named in the proxy URL and, for
//! `wss`/`https` URLs, wraps it in a TLS client session. Failures here are
//! fatal and are never retried.

mod tls;

pub use tls::connector;

use tokio::net::TcpStream;
use tokio_tungstenite::MaybeTlsStream;
use tracing::{debug, info};
use url::{Host, Url};

use crate::error::ConsoleError;
use crate::Result;

/// The live connection, plain or TLS-wrapped.
pub type TransportStream = MaybeTlsStream<TcpStream>;

/// A parsed console proxy endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    url: Url,
    host: String,
    port: u16,
    secure: bool,
}

impl ProxyTarget {
    /// Parse a proxy URL.
    ///
    /// Accepts `ws`, `wss`, `http` and `https`. HTTP schemes are mapped to
    /// their WebSocket counterparts.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut url =
            Url::parse(raw).map_err(|e| ConsoleError::InvalidUrl(format!("{}: {}", raw, e)))?;

        let secure = match url.scheme() {
            "wss" | "https" => true,
            "ws" | "http" => false,
            other => return Err(ConsoleError::UnsupportedScheme(other.to_string())),
        };

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(ConsoleError::InvalidUrl(format!("{}: missing host", raw))),
        };

        let port = url
            .port_or_known_default()
            .ok_or_else(|| ConsoleError::InvalidUrl(format!("{}: missing port", raw)))?;

        let ws_scheme = if secure { "wss" } else { "ws" };
        if url.scheme() != ws_scheme {
            url.set_scheme(ws_scheme)
                .map_err(|_| ConsoleError::InvalidUrl(format!("{}: cannot use {}", raw, ws_scheme)))?;
        }

        Ok(Self {
            url,
            host,
            port,
            secure,
        })
    }

    /// WebSocket URL (`ws://` or `wss://`).
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host name or address, without IPv6 brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port, defaulted from the scheme when absent.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the connection is TLS-wrapped.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Open a connected stream to the proxy.
///
/// When `verify_tls` is false the TLS layer accepts any certificate and
/// host name; see [`connector`].
pub async fn connect(target: &ProxyTarget, verify_tls: bool) -> Result<TransportStream> {
    let address = target.authority();
    debug!(%address, secure = target.secure, "Connecting to console proxy");

    let tcp = TcpStream::connect((target.host.as_str(), target.port))
        .await
        .map_err(|source| ConsoleError::Connect {
            address: address.clone(),
            source,
        })?;
    tcp.set_nodelay(true)?;

    if !target.secure {
        info!(%address, "Connected (plain)");
        return Ok(MaybeTlsStream::Plain(tcp));
    }

    let tls = connector(verify_tls)?.connect(&target.host, tcp).await?;
    info!(%address, verify_tls, "Connected (TLS)");
    Ok(MaybeTlsStream::NativeTls(tls))
}
