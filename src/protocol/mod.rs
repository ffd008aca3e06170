//! The xterm.js console protocol.
//!
//! [`codec`] holds the pure frame encoders; [`handshake`] opens the
//! WebSocket and performs the ticket login.

pub mod codec;
pub mod handshake;

pub use codec::{
    encode_auth, encode_input, encode_ping, encode_resize, is_disconnect, ClientFrame,
    DISCONNECT_KEY,
};
pub use handshake::{build_request, Handshake, HandshakePhase, HANDSHAKE_TIMEOUT, REFERER_QUERY};
