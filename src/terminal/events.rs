//! Signal-driven terminal events.
//!
//! OS signals are turned into messages on a channel that the session loop
//! selects on, the same way it waits on input and the socket. Handlers are
//! registered before the watcher returns, so a resize delivered while the
//! loop is busy is queued rather than lost.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// An asynchronous event affecting the local terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalEvent {
    /// The window size changed (SIGWINCH).
    Resize,
    /// The process was asked to stop (SIGTERM, SIGHUP, SIGINT, SIGQUIT).
    Interrupt,
}

/// Background task forwarding signals as [`TerminalEvent`]s.
///
/// Stops forwarding when dropped.
pub struct SignalWatcher {
    task: JoinHandle<()>,
}

impl SignalWatcher {
    /// Register signal handlers and start forwarding into `tx`.
    ///
    /// Must be called from within a tokio runtime.
    #[cfg(unix)]
    pub fn spawn(tx: mpsc::Sender<TerminalEvent>) -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut winch = signal(SignalKind::window_change())?;
        let mut term = signal(SignalKind::terminate())?;
        let mut hup = signal(SignalKind::hangup())?;
        // Raw mode disables ISIG, so these only arrive from `kill`.
        let mut int = signal(SignalKind::interrupt())?;
        let mut quit = signal(SignalKind::quit())?;

        let task = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    Some(()) = winch.recv() => TerminalEvent::Resize,
                    Some(()) = term.recv() => TerminalEvent::Interrupt,
                    Some(()) = hup.recv() => TerminalEvent::Interrupt,
                    Some(()) = int.recv() => TerminalEvent::Interrupt,
                    Some(()) = quit.recv() => TerminalEvent::Interrupt,
                    else => break,
                };
                debug!(?event, "Terminal signal");
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(Self { task })
    }

    /// Register signal handlers and start forwarding into `tx`.
    #[cfg(not(unix))]
    pub fn spawn(tx: mpsc::Sender<TerminalEvent>) -> std::io::Result<Self> {
        let task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(TerminalEvent::Interrupt).await;
            }
        });
        Ok(Self { task })
    }
}

impl Drop for SignalWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
