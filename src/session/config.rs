//! Per-session inputs.

use std::fmt;
use std::time::Duration;

use crate::protocol::HANDSHAKE_TIMEOUT;

/// Default interval between keepalive pings.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(120);

/// Credentials and endpoint for one console session.
///
/// All four strings come from the management API's ticket call and are
/// used verbatim.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Console proxy WebSocket URL.
    pub url: String,
    /// Value of the Cookie header on the upgrade request.
    pub cookie: String,
    /// User identity sent in the login frame.
    pub user: String,
    /// One-time console ticket.
    pub ticket: String,
    /// Whether to validate the proxy's TLS certificate.
    pub verify_tls: bool,
}

impl SessionConfig {
    /// Create a config with certificate verification enabled.
    pub fn new(
        url: impl Into<String>,
        cookie: impl Into<String>,
        user: impl Into<String>,
        ticket: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            cookie: cookie.into(),
            user: user.into(),
            ticket: ticket.into(),
            verify_tls: true,
        }
    }

    /// Skip certificate and host name validation.
    pub fn insecure(mut self) -> Self {
        self.verify_tls = false;
        self
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("url", &self.url)
            .field("cookie", &"<redacted>")
            .field("user", &self.user)
            .field("ticket", &"<redacted>")
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

/// Timing knobs for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Bound on the WebSocket upgrade and on the login, each.
    pub handshake_timeout: Duration,
    /// Interval between keepalive pings.
    pub keepalive_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            handshake_timeout: HANDSHAKE_TIMEOUT,
            keepalive_interval: KEEPALIVE_INTERVAL,
        }
    }
}
