//! Local terminal handling.
//!
//! This module owns everything that touches the controlling terminal:
//! size queries, raw-mode bracketing, the blocking stdin reader and the
//! signal-driven event channel (resize, termination).

mod events;
mod input;
mod raw;

pub use events::{SignalWatcher, TerminalEvent};
pub use input::InputReader;
#[cfg(unix)]
pub use raw::UnixTerminal;
pub use raw::{RawModeGuard, TerminalControl};

/// Size of a terminal in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    /// Number of columns (width).
    pub cols: u16,
    /// Number of rows (height).
    pub rows: u16,
}

impl TermSize {
    /// Create a new TermSize with the given dimensions.
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl Default for TermSize {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

/// Query the size of the terminal attached to stdout.
///
/// Falls back to 80x24 when stdout is not a terminal.
#[cfg(unix)]
pub fn query_size() -> TermSize {
    use std::os::unix::io::AsRawFd;

    let fd = std::io::stdout().as_raw_fd();
    let mut winsize = std::mem::MaybeUninit::<libc::winsize>::uninit();
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, winsize.as_mut_ptr()) };
    if result != 0 {
        return TermSize::default();
    }

    let winsize = unsafe { winsize.assume_init() };
    if winsize.ws_col == 0 || winsize.ws_row == 0 {
        return TermSize::default();
    }
    TermSize::new(winsize.ws_col, winsize.ws_row)
}

/// Query the size of the terminal attached to stdout.
#[cfg(not(unix))]
pub fn query_size() -> TermSize {
    TermSize::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_size_default() {
        let size = TermSize::default();
        assert_eq!(size.cols, 80);
        assert_eq!(size.rows, 24);
    }

    #[test]
    fn test_term_size_new() {
        let size = TermSize::new(120, 40);
        assert_eq!(size.cols, 120);
        assert_eq!(size.rows, 40);
        assert_ne!(size, TermSize::default());
    }

    #[test]
    fn test_query_size_never_zero() {
        // CI usually has no terminal; the fallback must still be usable.
        let size = query_size();
        assert!(size.cols > 0);
        assert!(size.rows > 0);
    }
}
