//! The session I/O loop.
//!
//! One task multiplexes four sources with `tokio::select!`: local input
//! chunks, frames from the proxy, terminal events (resize, termination)
//! and the keepalive deadline. The loop owns the socket and terminal for
//! its whole run, so nothing here needs a lock.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use super::socket::ConsoleSocket;
use super::state::{SessionState, StopReason};
use crate::protocol::{encode_input, encode_ping, encode_resize, is_disconnect};
use crate::terminal::{TermSize, TerminalEvent};

/// The local end of a session.
pub struct LocalTerminal<W> {
    /// Chunks typed by the user; closing means end of input.
    pub input: mpsc::Receiver<Vec<u8>>,
    /// Where remote output is written verbatim.
    pub output: W,
    /// Resize and termination notifications.
    pub events: mpsc::Receiver<TerminalEvent>,
    /// Current terminal dimensions.
    pub query_size: fn() -> TermSize,
}

/// Relays between a [`LocalTerminal`] and an authenticated socket.
pub struct IoLoop<'a, S, W> {
    socket: &'a mut ConsoleSocket<S>,
    local: &'a mut LocalTerminal<W>,
    keepalive: Duration,
    state: SessionState,
}

impl<'a, S, W> IoLoop<'a, S, W>
where
    S: AsyncRead + AsyncWrite + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a loop pinging every `keepalive`.
    pub fn new(
        socket: &'a mut ConsoleSocket<S>,
        local: &'a mut LocalTerminal<W>,
        keepalive: Duration,
    ) -> Self {
        Self {
            socket,
            local,
            keepalive,
            state: SessionState::new(Instant::now()),
        }
    }

    /// Run until the user disconnects, either side closes, or a signal
    /// asks us to stop.
    ///
    /// Sends the current size and an empty input frame first, which makes
    /// the remote shell draw its prompt.
    pub async fn run(mut self) -> StopReason {
        if let Err(e) = self.state.start(Instant::now()) {
            debug!(error = %e, "Session loop already used");
            return StopReason::RemoteError;
        }

        self.send_resize().await;
        self.send(encode_input(b"")).await;

        while self.state.is_running() {
            self.step().await;
            if self.state.is_running() && self.state.ping_due(Instant::now(), self.keepalive) {
                self.ping().await;
            }
        }

        let reason = self.state.stop_reason().unwrap_or(StopReason::RemoteError);
        debug!(?reason, "Session loop stopped");
        reason
    }

    async fn step(&mut self) {
        let deadline = self.state.next_ping(self.keepalive);

        tokio::select! {
            chunk = self.local.input.recv() => match chunk {
                Some(chunk) if is_disconnect(&chunk) => {
                    debug!("Disconnect key pressed");
                    self.state.stop(StopReason::Disconnect);
                }
                Some(chunk) => self.send(encode_input(&chunk)).await,
                None => {
                    debug!("Local input closed");
                    self.state.stop(StopReason::LocalEof);
                }
            },
            inbound = self.socket.recv() => match inbound {
                Some(Ok(data)) => self.display(&data).await,
                Some(Err(e)) => {
                    debug!(error = %e, "Read from console proxy failed");
                    self.state.stop(StopReason::RemoteError);
                }
                None => self.state.stop(StopReason::RemoteClosed),
            },
            Some(event) = self.local.events.recv() => match event {
                TerminalEvent::Resize => self.send_resize().await,
                TerminalEvent::Interrupt => {
                    debug!("Termination signal received");
                    self.state.stop(StopReason::Interrupted);
                }
            },
            _ = sleep_until(deadline) => {}
        }
    }

    async fn display(&mut self, data: &[u8]) {
        trace!(len = data.len(), "Remote output");
        let output = &mut self.local.output;
        let result = match output.write_all(data).await {
            Ok(()) => output.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            debug!(error = %e, "Write to local terminal failed");
            self.state.stop(StopReason::LocalError);
        }
    }

    async fn send_resize(&mut self) {
        let size = (self.local.query_size)();
        debug!(cols = size.cols, rows = size.rows, "Sending terminal size");
        self.send(encode_resize(size.cols, size.rows).into_bytes())
            .await;
    }

    async fn ping(&mut self) {
        trace!("Keepalive");
        self.send(encode_ping().as_bytes().to_vec()).await;
        self.state.record_ping(Instant::now());
    }

    async fn send(&mut self, frame: Vec<u8>) {
        if let Err(e) = self.socket.send_frame(frame).await {
            debug!(error = %e, "Write to console proxy failed");
            self.state.stop(StopReason::RemoteError);
        }
    }
}
