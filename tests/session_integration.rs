//! Session integration tests.
//!
//! These tests run a whole console session against an in-process fake
//! proxy over `tokio::io::duplex`, with a fake terminal standing in for
//! termios so raw-mode bracketing can be counted.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, DuplexStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use console_bridge::terminal::TerminalEvent;
use console_bridge::{
    ConsoleError, ConsoleSession, LocalTerminal, ProxyTarget, SessionConfig, SessionOptions,
    StopReason, TermSize, TerminalControl,
};

const URL: &str = "wss://pve.example:8006/api2/json/nodes/pve/lxc/101/vncwebsocket?port=5900";

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Default)]
struct Counts {
    raw: AtomicUsize,
    restored: AtomicUsize,
}

struct FakeTerminal {
    counts: Arc<Counts>,
    fail_capture: bool,
}

impl FakeTerminal {
    fn new(counts: &Arc<Counts>) -> Self {
        Self {
            counts: Arc::clone(counts),
            fail_capture: false,
        }
    }
}

impl TerminalControl for FakeTerminal {
    type Mode = ();

    fn capture(&mut self) -> io::Result<()> {
        if self.fail_capture {
            return Err(io::Error::new(io::ErrorKind::Other, "not a tty"));
        }
        Ok(())
    }

    fn enter_raw(&mut self, _saved: &()) -> io::Result<()> {
        self.counts.raw.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn restore(&mut self, _saved: ()) -> io::Result<()> {
        self.counts.restored.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Local {
    terminal: LocalTerminal<Vec<u8>>,
    input: mpsc::Sender<Vec<u8>>,
    events: mpsc::Sender<TerminalEvent>,
}

fn fixed_size() -> TermSize {
    TermSize::new(120, 40)
}

fn local() -> Local {
    let (input, input_rx) = mpsc::channel(16);
    let (events, events_rx) = mpsc::channel(16);
    Local {
        terminal: LocalTerminal {
            input: input_rx,
            output: Vec::new(),
            events: events_rx,
            query_size: fixed_size,
        },
        input,
        events,
    }
}

fn session(options: SessionOptions) -> ConsoleSession {
    let config = SessionConfig::new(URL, "PVEAuthCookie=abc", "alice", "tickettext");
    ConsoleSession::new(config, options)
}

fn target() -> ProxyTarget {
    ProxyTarget::parse(URL).unwrap()
}

/// Accept the upgrade, reporting the request's Cookie and Referer headers.
async fn accept(
    stream: DuplexStream,
    headers: oneshot::Sender<(String, String)>,
) -> WebSocketStream<DuplexStream> {
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let get = |name: header::HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        let _ = headers.send((get(header::COOKIE), get(header::REFERER)));
        Ok(resp)
    };
    tokio_tungstenite::accept_hdr_async(stream, callback)
        .await
        .unwrap()
}

/// Collect data frames until the client goes away.
async fn drain(ws: &mut WebSocketStream<DuplexStream>) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    while let Some(Ok(msg)) = ws.next().await {
        if msg.is_text() || msg.is_binary() {
            frames.push(msg.into_data());
        }
    }
    frames
}

// ============================================================================
// Session Tests
// ============================================================================

#[tokio::test]
async fn test_session_login_relay_and_disconnect() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (headers_tx, headers_rx) = oneshot::channel();

    let proxy = tokio::spawn(async move {
        let mut ws = accept(server, headers_tx).await;
        let login = ws.next().await.unwrap().unwrap().into_data();
        ws.send(Message::Text("OK".into())).await.unwrap();
        (login, drain(&mut ws).await)
    });

    let counts = Arc::new(Counts::default());
    let mut local = local();
    local.input.send(b"uptime\r".to_vec()).await.unwrap();
    local.input.send(vec![0x1d]).await.unwrap();

    let reason = session(SessionOptions::default())
        .run(&target(), client, FakeTerminal::new(&counts), &mut local.terminal)
        .await
        .unwrap();

    assert_eq!(reason, StopReason::Disconnect);
    assert_eq!(counts.raw.load(Ordering::SeqCst), 1);
    assert_eq!(counts.restored.load(Ordering::SeqCst), 1);

    let (cookie, referer) = headers_rx.await.unwrap();
    assert_eq!(cookie, "PVEAuthCookie=abc");
    assert_eq!(
        referer,
        "https://pve.example:8006/?console=shell&xtermjs=1&vmid=0&vmname=&node=localhost&cmd="
    );

    let (login, frames) = proxy.await.unwrap();
    assert_eq!(login, b"alice:tickettext\n");
    assert_eq!(
        frames,
        vec![
            b"1:120:40:".to_vec(),
            b"0:0:".to_vec(),
            b"0:7:uptime\r".to_vec(),
        ]
    );
}

#[tokio::test]
async fn test_session_writes_output_until_remote_close() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (headers_tx, _headers_rx) = oneshot::channel();

    tokio::spawn(async move {
        let mut ws = accept(server, headers_tx).await;
        let _login = ws.next().await;
        ws.send(Message::Text("OK".into())).await.unwrap();
        ws.send(Message::Text("welcome\r\n".into())).await.unwrap();
        ws.send(Message::Binary(vec![0x1b, b'[', b'H', 0xff]))
            .await
            .unwrap();
        ws.close(None).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let counts = Arc::new(Counts::default());
    let mut local = local();

    let reason = session(SessionOptions::default())
        .run(&target(), client, FakeTerminal::new(&counts), &mut local.terminal)
        .await
        .unwrap();

    assert_eq!(reason, StopReason::RemoteClosed);
    assert_eq!(local.terminal.output, b"welcome\r\n\x1b[H\xff");
    assert_eq!(counts.restored.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_session_pings_while_idle() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (headers_tx, _headers_rx) = oneshot::channel();

    let proxy = tokio::spawn(async move {
        let mut ws = accept(server, headers_tx).await;
        let _login = ws.next().await;
        ws.send(Message::Text("OK".into())).await.unwrap();

        let started = tokio::time::Instant::now();
        while let Some(Ok(msg)) = ws.next().await {
            if msg.into_data() == b"2" {
                let elapsed = started.elapsed();
                ws.close(None).await.unwrap();
                while ws.next().await.is_some() {}
                return elapsed;
            }
        }
        panic!("no keepalive ping before the client went away");
    });

    let counts = Arc::new(Counts::default());
    let mut local = local();
    let options = SessionOptions {
        keepalive_interval: Duration::from_secs(30),
        ..SessionOptions::default()
    };

    let reason = session(options)
        .run(&target(), client, FakeTerminal::new(&counts), &mut local.terminal)
        .await
        .unwrap();

    assert_eq!(reason, StopReason::RemoteClosed);
    let elapsed = proxy.await.unwrap();
    assert!(elapsed >= Duration::from_secs(29), "pinged after {:?}", elapsed);
    assert!(elapsed <= Duration::from_secs(31), "pinged after {:?}", elapsed);
}

// ============================================================================
// Failure Tests
// ============================================================================

#[tokio::test]
async fn test_connection_reset_restores_terminal() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (headers_tx, _headers_rx) = oneshot::channel();

    tokio::spawn(async move {
        let mut ws = accept(server, headers_tx).await;
        let _login = ws.next().await;
        ws.send(Message::Text("OK".into())).await.unwrap();
        // Gone without a close frame.
        drop(ws);
    });

    let counts = Arc::new(Counts::default());
    let mut local = local();

    let reason = session(SessionOptions::default())
        .run(&target(), client, FakeTerminal::new(&counts), &mut local.terminal)
        .await
        .unwrap();

    assert_eq!(reason, StopReason::RemoteError);
    assert_eq!(counts.raw.load(Ordering::SeqCst), 1);
    assert_eq!(counts.restored.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_during_authentication() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (headers_tx, _headers_rx) = oneshot::channel();

    let counts = Arc::new(Counts::default());
    let mut local = local();
    let events = local.events.clone();

    tokio::spawn(async move {
        let mut ws = accept(server, headers_tx).await;
        let _login = ws.next().await;
        // Never acknowledges; a termination signal arrives instead.
        events.send(TerminalEvent::Interrupt).await.unwrap();
        drain(&mut ws).await
    });

    let started = tokio::time::Instant::now();
    let reason = session(SessionOptions::default())
        .run(&target(), client, FakeTerminal::new(&counts), &mut local.terminal)
        .await
        .unwrap();

    assert_eq!(reason, StopReason::Interrupted);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(counts.restored.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_handshake_timeout_restores_terminal() {
    let (client, _server) = tokio::io::duplex(64 * 1024);

    let counts = Arc::new(Counts::default());
    let mut local = local();

    let err = session(SessionOptions::default())
        .run(&target(), client, FakeTerminal::new(&counts), &mut local.terminal)
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::HandshakeTimeout(_)));
    assert_eq!(counts.raw.load(Ordering::SeqCst), 1);
    assert_eq!(counts.restored.load(Ordering::SeqCst), 1);
    assert!(local.terminal.output.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_authentication_timeout_restores_terminal() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (headers_tx, _headers_rx) = oneshot::channel();

    tokio::spawn(async move {
        let mut ws = accept(server, headers_tx).await;
        // Never acknowledges the ticket.
        drain(&mut ws).await
    });

    let counts = Arc::new(Counts::default());
    let mut local = local();

    let err = session(SessionOptions::default())
        .run(&target(), client, FakeTerminal::new(&counts), &mut local.terminal)
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::AuthenticationTimeout(_)));
    assert_eq!(counts.restored.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_terminal_failure_sends_nothing() {
    let (client, mut server) = tokio::io::duplex(64 * 1024);

    let counts = Arc::new(Counts::default());
    let mut terminal = FakeTerminal::new(&counts);
    terminal.fail_capture = true;
    let mut local = local();

    let err = session(SessionOptions::default())
        .run(&target(), client, terminal, &mut local.terminal)
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::Terminal(_)));
    assert_eq!(counts.raw.load(Ordering::SeqCst), 0);
    assert_eq!(counts.restored.load(Ordering::SeqCst), 0);

    let mut sent = Vec::new();
    server.read_to_end(&mut sent).await.unwrap();
    assert!(sent.is_empty());
}
