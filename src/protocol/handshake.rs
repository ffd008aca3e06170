//! Opening and authenticating a console connection.
//!
//! ```text
//! Idle -> WsConnecting -> WsOpen -> Authenticating -> Authenticated
//!              \______________\___________\_______-> Failed
//! ```
//!
//! The WebSocket upgrade carries the session cookie and a Referer whose
//! query selects the xterm.js text protocol. Once open, the client sends
//! `<user>:<ticket>\n` and waits for the proxy to answer `OK`.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tracing::{debug, info};

use super::codec::encode_auth;
use crate::error::ConsoleError;
use crate::session::{ConsoleSocket, SessionConfig};
use crate::transport::ProxyTarget;
use crate::Result;

/// Default bound on each handshake phase.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Query the proxy expects in the Referer to pick the text terminal.
pub const REFERER_QUERY: &str = "?console=shell&xtermjs=1&vmid=0&vmname=&node=localhost&cmd=";

/// The proxy's acknowledgement of a valid ticket.
const AUTH_OK: &[u8] = b"OK";

/// Progress of a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakePhase {
    /// Nothing sent yet.
    #[default]
    Idle,
    /// HTTP upgrade in flight.
    WsConnecting,
    /// WebSocket open, login not yet sent.
    WsOpen,
    /// Login sent, waiting for `OK`.
    Authenticating,
    /// Ready for the session loop.
    Authenticated,
    /// Gave up.
    Failed,
}

/// Build the upgrade request with the Cookie and Referer headers.
pub fn build_request(target: &ProxyTarget, cookie: &str) -> Result<Request> {
    let mut request = target.url().as_str().into_client_request()?;
    let referer = format!("https://{}/{}", target.authority(), REFERER_QUERY);

    let headers = request.headers_mut();
    headers.insert(
        header::COOKIE,
        HeaderValue::from_str(cookie).map_err(|_| ConsoleError::InvalidHeader("Cookie"))?,
    );
    headers.insert(
        header::REFERER,
        HeaderValue::from_str(&referer).map_err(|_| ConsoleError::InvalidHeader("Referer"))?,
    );
    Ok(request)
}

/// Drives a stream from connected to authenticated.
pub struct Handshake<'a> {
    config: &'a SessionConfig,
    timeout: Duration,
    phase: HandshakePhase,
}

impl<'a> Handshake<'a> {
    /// Create a handshake bounded by `timeout` per phase.
    pub fn new(config: &'a SessionConfig, timeout: Duration) -> Self {
        Self {
            config,
            timeout,
            phase: HandshakePhase::Idle,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> HandshakePhase {
        self.phase
    }

    /// Upgrade `stream` to a WebSocket and log in.
    ///
    /// The upgrade must complete within the timeout. While authenticating
    /// the timeout is an idle bound: it restarts with every frame received.
    /// Any frame other than `OK` is ignored; the proxy may emit other lines
    /// first, and an explicit rejection is only ever observed as a timeout
    /// or a closed connection.
    pub async fn perform<S>(
        &mut self,
        target: &ProxyTarget,
        stream: S,
    ) -> Result<ConsoleSocket<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let request = build_request(target, &self.config.cookie).map_err(|e| self.fail(e))?;

        self.phase = HandshakePhase::WsConnecting;
        debug!(url = %target.url(), "Starting WebSocket upgrade");
        let ws = match tokio::time::timeout(
            self.timeout,
            tokio_tungstenite::client_async(request, stream),
        )
        .await
        {
            Ok(Ok((ws, response))) => {
                debug!(status = %response.status(), "WebSocket open");
                ws
            }
            Ok(Err(e)) => return Err(self.fail(e.into())),
            Err(_) => return Err(self.fail(ConsoleError::HandshakeTimeout(self.timeout))),
        };
        self.phase = HandshakePhase::WsOpen;

        let mut socket = ConsoleSocket::new(ws, target.url().to_string());
        socket
            .send_frame(encode_auth(&self.config.user, &self.config.ticket).into_bytes())
            .await
            .map_err(|e| self.fail(e))?;
        self.phase = HandshakePhase::Authenticating;

        if let Err(e) = wait_for_ok(&mut socket, self.timeout).await {
            return Err(self.fail(e));
        }

        self.phase = HandshakePhase::Authenticated;
        info!(user = %self.config.user, "Console authenticated");
        Ok(socket)
    }

    fn fail(&mut self, err: ConsoleError) -> ConsoleError {
        debug!(phase = ?self.phase, error = %err, "Handshake failed");
        self.phase = HandshakePhase::Failed;
        err
    }
}

async fn wait_for_ok<S>(socket: &mut ConsoleSocket<S>, idle: Duration) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::time::timeout(idle, socket.recv())
            .await
            .map_err(|_| ConsoleError::AuthenticationTimeout(idle))?;
        match frame {
            Some(Ok(data)) if data == AUTH_OK => return Ok(()),
            Some(Ok(data)) => {
                debug!(len = data.len(), "Ignoring frame while authenticating");
            }
            Some(Err(e)) => return Err(e),
            None => return Err(ConsoleError::ConnectionClosed),
        }
    }
}
