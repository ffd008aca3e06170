//! Console session lifecycle.
//!
//! A session connects the transport, puts the local terminal into raw
//! mode, authenticates, and runs the I/O loop. Raw mode is held by a
//! [`RawModeGuard`] for the whole bracket, so the terminal is restored
//! exactly once on every exit path, and the stream is dropped (closed)
//! before [`ConsoleSession::run`] returns.

mod config;
mod io_loop;
mod socket;
mod state;

pub use config::{SessionConfig, SessionOptions, KEEPALIVE_INTERVAL};
pub use io_loop::{IoLoop, LocalTerminal};
pub use socket::ConsoleSocket;
pub use state::{Phase, SessionState, StopReason};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::protocol::Handshake;
use crate::terminal::{RawModeGuard, TerminalControl, TerminalEvent};
use crate::transport::ProxyTarget;
use crate::Result;

/// One interactive console session.
#[derive(Debug, Clone)]
pub struct ConsoleSession {
    config: SessionConfig,
    options: SessionOptions,
}

impl ConsoleSession {
    /// Create a session from its inputs.
    pub fn new(config: SessionConfig, options: SessionOptions) -> Self {
        Self { config, options }
    }

    /// Session inputs.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Timing options.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Run a session on the process's own terminal.
    ///
    /// Connection errors are returned before the terminal is touched.
    /// Once connected, the terminal is switched to raw mode and restored
    /// before this returns, whatever the outcome.
    #[cfg(unix)]
    pub async fn open(&self) -> Result<StopReason> {
        use crate::terminal::{self, InputReader, SignalWatcher, UnixTerminal};
        use crate::transport;

        let target = ProxyTarget::parse(&self.config.url)?;
        let stream = transport::connect(&target, self.config.verify_tls).await?;

        let (input_tx, input_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(16);
        let _signals = SignalWatcher::spawn(event_tx)?;
        let mut local = LocalTerminal {
            input: input_rx,
            output: tokio::io::stdout(),
            events: event_rx,
            query_size: terminal::query_size,
        };
        InputReader::stdin(input_tx).spawn()?;

        self.run(&target, stream, UnixTerminal::stdin(), &mut local)
            .await
    }

    /// Run a session over an already-connected stream.
    ///
    /// Enters raw mode through `control`, authenticates, relays until the
    /// loop stops, then restores the terminal. Handshake failures are
    /// returned as errors; every way the loop can end is a normal return.
    pub async fn run<S, W, C>(
        &self,
        target: &ProxyTarget,
        stream: S,
        control: C,
        local: &mut LocalTerminal<W>,
    ) -> Result<StopReason>
    where
        S: AsyncRead + AsyncWrite + Unpin,
        W: AsyncWrite + Unpin,
        C: TerminalControl,
    {
        let guard = RawModeGuard::enter(control)?;
        let result = self.bridge(target, stream, local).await;
        let restored = guard.release();

        let reason = result?;
        restored?;
        info!(?reason, "Console session ended");
        Ok(reason)
    }

    async fn bridge<S, W>(
        &self,
        target: &ProxyTarget,
        stream: S,
        local: &mut LocalTerminal<W>,
    ) -> Result<StopReason>
    where
        S: AsyncRead + AsyncWrite + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut handshake = Handshake::new(&self.config, self.options.handshake_timeout);
        let mut socket = tokio::select! {
            result = handshake.perform(target, stream) => result?,
            () = interrupted(&mut local.events) => {
                info!("Interrupted during handshake");
                return Ok(StopReason::Interrupted);
            }
        };
        debug!(url = socket.url(), "Entering session loop");

        let reason = IoLoop::new(&mut socket, local, self.options.keepalive_interval)
            .run()
            .await;

        socket.close().await;
        Ok(reason)
    }
}

/// Resolves on the first termination request. Resize events are dropped;
/// the loop sends the current size when it starts.
async fn interrupted(events: &mut mpsc::Receiver<TerminalEvent>) {
    while let Some(event) = events.recv().await {
        if event == TerminalEvent::Interrupt {
            return;
        }
    }
    std::future::pending::<()>().await
}
