//! Narrow adapter over the WebSocket engine.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, trace};

use crate::Result;

/// How long a close frame may take to go out before we give up on it.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// An open console WebSocket.
///
/// Exposes only what the session needs: send one frame, receive the
/// next payload, close. Protocol-level ping/pong is answered by the
/// engine and never surfaces here.
pub struct ConsoleSocket<S> {
    ws: WebSocketStream<S>,
    url: String,
}

impl<S> std::fmt::Debug for ConsoleSocket<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSocket")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl<S> ConsoleSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already-open WebSocket.
    pub fn new(ws: WebSocketStream<S>, url: String) -> Self {
        Self { ws, url }
    }

    /// URL the socket was opened against.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one frame and flush it.
    ///
    /// UTF-8 payloads go out as text frames; anything else (raw keystroke
    /// bytes that are not valid UTF-8) as a binary frame. Each call is a
    /// single WebSocket message, so frames are never split or interleaved.
    pub async fn send_frame(&mut self, frame: Vec<u8>) -> Result<()> {
        let message = match String::from_utf8(frame) {
            Ok(text) => Message::Text(text),
            Err(e) => Message::Binary(e.into_bytes()),
        };
        trace!(len = message.len(), "Sending frame");
        self.ws.send(message).await?;
        Ok(())
    }

    /// Receive the next data payload.
    ///
    /// Returns `None` once the peer has closed the connection or the stream
    /// has ended. Cancel-safe: partially read frames stay buffered in the
    /// engine.
    pub async fn recv(&mut self) -> Option<Result<Vec<u8>>> {
        loop {
            match self.ws.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.into_bytes())),
                Ok(Message::Binary(data)) => return Some(Ok(data)),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Console proxy closed the connection");
                    return None;
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    /// Send a close frame, ignoring failures.
    pub async fn close(&mut self) {
        match tokio::time::timeout(CLOSE_TIMEOUT, self.ws.close(None)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "Close handshake failed"),
            Err(_) => debug!("Close frame timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::DuplexStream;

    async fn pair() -> (ConsoleSocket<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (client, server) = tokio::io::duplex(16 * 1024);
        let (client, server) = tokio::join!(
            tokio_tungstenite::client_async("ws://localhost/term", client),
            tokio_tungstenite::accept_async(server),
        );
        let (ws, _) = client.unwrap();
        (
            ConsoleSocket::new(ws, "ws://localhost/term".to_string()),
            server.unwrap(),
        )
    }

    #[tokio::test]
    async fn test_debug_shows_only_url() {
        let (socket, _server) = pair().await;
        let rendered = format!("{:?}", socket);
        assert_eq!(rendered, "ConsoleSocket { url: \"ws://localhost/term\", .. }");
    }

    #[tokio::test]
    async fn test_text_and_binary_frames() {
        let (mut socket, mut server) = pair().await;
        assert_eq!(socket.url(), "ws://localhost/term");

        socket.send_frame(b"0:2:ok".to_vec()).await.unwrap();
        socket.send_frame(vec![b'0', b':', b'1', b':', 0xff]).await.unwrap();

        let text = server.next().await.unwrap().unwrap();
        assert!(text.is_text());
        assert_eq!(text.into_data(), b"0:2:ok");

        let binary = server.next().await.unwrap().unwrap();
        assert!(binary.is_binary());
        assert_eq!(binary.into_data(), vec![b'0', b':', b'1', b':', 0xff]);
    }

    #[tokio::test]
    async fn test_recv_skips_control_frames() {
        let (mut socket, mut server) = pair().await;

        server.send(Message::Ping(b"p".to_vec())).await.unwrap();
        server.send(Message::Binary(b"\x1b[H".to_vec())).await.unwrap();
        server.send(Message::Text("$ ".into())).await.unwrap();

        assert_eq!(socket.recv().await.unwrap().unwrap(), b"\x1b[H");
        assert_eq!(socket.recv().await.unwrap().unwrap(), b"$ ");
    }

    #[tokio::test]
    async fn test_recv_none_after_close() {
        let (mut socket, mut server) = pair().await;
        tokio::spawn(async move {
            server.close(None).await.unwrap();
            while server.next().await.is_some() {}
        });

        assert!(socket.recv().await.is_none());
    }
}
