//! # console-bridge
//!
//! Interactive terminal bridge to a hypervisor's console proxy.
//!
//! The bridge opens a WebSocket (optionally TLS) to the proxy, logs in with
//! a one-time console ticket, and then relays keystrokes and screen output
//! using the xterm.js text protocol while the local terminal is in raw mode.
//!
//! ## Features
//!
//! - **Ticket login**: `user:ticket\n` over the socket, session starts on `OK`
//! - **Relay**: input frames, window resizes, and a periodic keepalive ping
//! - **Terminal safety**: raw mode is restored exactly once on every exit path
//! - **Escape key**: `Ctrl+]` ends the session locally
//!
//! ## Quick Start
//!
//! ```no_run
//! use console_bridge::{ConsoleSession, SessionConfig, SessionOptions};
//!
//! #[tokio::main]
//! async fn main() -> console_bridge::Result<()> {
//!     console_bridge::logging::try_init(Some("info"), None).ok();
//!
//!     let config = SessionConfig::new(
//!         "wss://pve.example:8006/api2/json/nodes/pve/lxc/101/vncwebsocket?port=5900",
//!         "PVEAuthCookie=...",
//!         "root@pam",
//!         "PVEVNC:...",
//!     );
//!
//!     let reason = ConsoleSession::new(config, SessionOptions::default())
//!         .open()
//!         .await?;
//!     println!("{}", reason.describe());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod terminal;
pub mod transport;

// Re-export commonly used types
pub use error::{ConsoleError, Result};
pub use protocol::{ClientFrame, Handshake, HandshakePhase};
pub use session::{
    ConsoleSession, ConsoleSocket, IoLoop, LocalTerminal, Phase, SessionConfig, SessionOptions,
    SessionState, StopReason,
};
pub use terminal::{RawModeGuard, TermSize, TerminalControl, TerminalEvent};
pub use transport::{ProxyTarget, TransportStream};
