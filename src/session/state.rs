//! Session state machine.

use std::time::Duration;

use tokio::time::Instant;

/// Lifecycle of the session loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Loop has not been entered.
    #[default]
    NotStarted,
    /// Relaying between terminal and proxy.
    Running,
    /// Loop has ended; cannot be restarted.
    Stopped,
}

impl Phase {
    /// Check if transition to target phase is valid.
    ///
    /// Valid transitions:
    /// - NotStarted -> Running
    /// - Running -> Stopped
    pub fn can_transition_to(&self, target: Phase) -> bool {
        use Phase::*;
        matches!((*self, target), (NotStarted, Running) | (Running, Stopped))
    }

    /// Attempt to transition to a new phase.
    pub fn transition_to(&mut self, target: Phase) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::ConsoleError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Stopped)
    }
}

/// Why the loop stopped. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The user typed the disconnect key.
    Disconnect,
    /// The proxy closed the WebSocket.
    RemoteClosed,
    /// Reading from or writing to the proxy failed.
    RemoteError,
    /// Local input reached end of file or failed.
    LocalEof,
    /// Writing to the local display failed.
    LocalError,
    /// A termination signal arrived.
    Interrupted,
}

impl StopReason {
    /// Short human-readable description.
    pub fn describe(&self) -> &'static str {
        match self {
            StopReason::Disconnect => "disconnected",
            StopReason::RemoteClosed => "connection closed by remote host",
            StopReason::RemoteError => "connection lost",
            StopReason::LocalEof => "end of local input",
            StopReason::LocalError => "local terminal unavailable",
            StopReason::Interrupted => "interrupted",
        }
    }
}

/// Mutable state threaded through the session loop.
#[derive(Debug, Clone)]
pub struct SessionState {
    phase: Phase,
    last_ping: Instant,
    stop_reason: Option<StopReason>,
}

impl SessionState {
    /// Create a state that has not started.
    pub fn new(now: Instant) -> Self {
        Self {
            phase: Phase::NotStarted,
            last_ping: now,
            stop_reason: None,
        }
    }

    /// Enter the running phase, starting the keepalive clock at `now`.
    pub fn start(&mut self, now: Instant) -> crate::Result<()> {
        self.phase.transition_to(Phase::Running)?;
        self.last_ping = now;
        Ok(())
    }

    /// Stop the loop. The first reason recorded wins.
    pub fn stop(&mut self, reason: StopReason) {
        if self.phase.transition_to(Phase::Stopped).is_ok() {
            self.stop_reason = Some(reason);
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the loop should keep going.
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Reason recorded by [`stop`](Self::stop).
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// When the next keepalive is due.
    pub fn next_ping(&self, interval: Duration) -> Instant {
        self.last_ping + interval
    }

    /// Whether a keepalive is due at `now`.
    pub fn ping_due(&self, now: Instant, interval: Duration) -> bool {
        now >= self.next_ping(interval)
    }

    /// Record that a keepalive went out at `now`.
    pub fn record_ping(&mut self, now: Instant) {
        self.last_ping = now;
    }
}
