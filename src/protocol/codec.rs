//! Encoder for the xterm.js console protocol.
//!
//! Outbound frames are colon-delimited ASCII envelopes:
//!
//! | Frame  | Wire form                 |
//! |--------|---------------------------|
//! | Input  | `0:<byte-length>:<bytes>` |
//! | Resize | `1:<cols>:<rows>:`        |
//! | Ping   | `2`                       |
//!
//! Inbound traffic carries no envelope; it is raw terminal output.

/// Ctrl+] terminates the session when typed on its own.
pub const DISCONNECT_KEY: u8 = 0x1d;

const INPUT_TAG: u8 = b'0';
const RESIZE_TAG: u8 = b'1';
const PING_TAG: u8 = b'2';

/// Encode keystroke bytes as an input frame.
///
/// The length field counts bytes, not characters.
pub fn encode_input(data: &[u8]) -> Vec<u8> {
    let len = data.len().to_string();
    let mut frame = Vec::with_capacity(data.len() + len.len() + 3);
    frame.push(INPUT_TAG);
    frame.push(b':');
    frame.extend_from_slice(len.as_bytes());
    frame.push(b':');
    frame.extend_from_slice(data);
    frame
}

/// Encode a terminal size change.
pub fn encode_resize(cols: u16, rows: u16) -> String {
    format!("1:{}:{}:", cols, rows)
}

/// Encode a liveness probe.
pub fn encode_ping() -> &'static str {
    "2"
}

/// Encode the application-level login sent right after the WebSocket opens.
pub fn encode_auth(user: &str, ticket: &str) -> String {
    format!("{}:{}\n", user, ticket)
}

/// Whether a chunk of local input is the disconnect keystroke.
pub fn is_disconnect(chunk: &[u8]) -> bool {
    chunk == [DISCONNECT_KEY]
}

/// A decoded client frame.
///
/// The client never needs to decode its own frames; this exists so that
/// proxies, recorders and tests can inspect what was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientFrame<'a> {
    /// Keystroke bytes.
    Input(&'a [u8]),
    /// Terminal dimensions.
    Resize { cols: u16, rows: u16 },
    /// Keepalive.
    Ping,
}

impl<'a> ClientFrame<'a> {
    /// Parse a frame, returning `None` for anything malformed.
    pub fn parse(frame: &'a [u8]) -> Option<Self> {
        match frame.split_first()? {
            (&PING_TAG, []) => Some(Self::Ping),
            (&INPUT_TAG, rest) => {
                let rest = rest.strip_prefix(b":")?;
                let sep = rest.iter().position(|&b| b == b':')?;
                let len: usize = std::str::from_utf8(&rest[..sep]).ok()?.parse().ok()?;
                let payload = &rest[sep + 1..];
                (payload.len() == len).then_some(Self::Input(payload))
            }
            (&RESIZE_TAG, rest) => {
                let text = std::str::from_utf8(rest.strip_prefix(b":")?).ok()?;
                let mut fields = text.split(':');
                let cols = fields.next()?.parse().ok()?;
                let rows = fields.next()?.parse().ok()?;
                match (fields.next(), fields.next()) {
                    (Some(""), None) => Some(Self::Resize { cols, rows }),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Encode this frame to its wire form.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Self::Input(data) => encode_input(data),
            Self::Resize { cols, rows } => encode_resize(cols, rows).into_bytes(),
            Self::Ping => encode_ping().as_bytes().to_vec(),
        }
    }
}
