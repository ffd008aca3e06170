//! Blocking reader for local terminal input.
//!
//! Reads from stdin (or any `Read`) on a dedicated thread and forwards
//! each chunk through a channel, so the session loop can wait on it
//! alongside the socket. The channel closing means end of input.

use std::io::{self, Read};
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Largest chunk forwarded in one message.
const READ_BUFFER_SIZE: usize = 4096;

/// Forwards bytes from a blocking reader into a channel.
pub struct InputReader<R: Read + Send + 'static> {
    reader: R,
    tx: mpsc::Sender<Vec<u8>>,
    buffer_size: usize,
}

impl InputReader<io::Stdin> {
    /// Reader over the process's stdin.
    pub fn stdin(tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self::new(io::stdin(), tx)
    }
}

impl<R: Read + Send + 'static> InputReader<R> {
    /// Create a new InputReader.
    ///
    /// # Arguments
    ///
    /// * `reader` - The blocking source.
    /// * `tx` - Channel sender for input chunks.
    pub fn new(reader: R, tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            reader,
            tx,
            buffer_size: READ_BUFFER_SIZE,
        }
    }

    /// Create with custom buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Start reading on a detached OS thread.
    ///
    /// A plain thread rather than a blocking task: a read parked on stdin
    /// cannot be cancelled, and runtime shutdown must not wait for it.
    /// The thread exits when the source reaches EOF, a read fails, or the
    /// receiver is dropped.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("console-input".into())
            .spawn(move || self.run())
    }

    fn run(self) {
        let Self {
            mut reader,
            tx,
            buffer_size,
        } = self;
        let mut buf = vec![0u8; buffer_size];

        loop {
            match reader.read(&mut buf) {
                Ok(0) => {
                    debug!("Input reader: EOF");
                    break;
                }
                Ok(n) => {
                    trace!("Input reader: read {} bytes", n);
                    if tx.blocking_send(buf[..n].to_vec()).is_err() {
                        debug!("Input reader: channel closed");
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Input reader error: {}", e);
                    break;
                }
            }
        }
    }
}
