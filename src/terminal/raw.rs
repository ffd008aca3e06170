//! Raw-mode bracketing for the local terminal.

use std::io;

use tracing::{debug, warn};

use crate::error::ConsoleError;
use crate::Result;

/// Primitives for switching a terminal in and out of raw mode.
pub trait TerminalControl {
    /// Opaque snapshot of the terminal's mode.
    type Mode;

    /// Capture the current mode.
    fn capture(&mut self) -> io::Result<Self::Mode>;

    /// Switch to raw mode, starting from the captured mode.
    fn enter_raw(&mut self, saved: &Self::Mode) -> io::Result<()>;

    /// Put back a previously captured mode.
    fn restore(&mut self, saved: Self::Mode) -> io::Result<()>;
}

/// Holds the terminal in raw mode and restores the saved mode on drop.
///
/// The saved mode is consumed by the first restore, so restoration happens
/// exactly once whether the guard is released explicitly, dropped at the
/// end of a scope, or dropped while unwinding.
pub struct RawModeGuard<C: TerminalControl> {
    control: C,
    saved: Option<C::Mode>,
}

impl<C: TerminalControl> RawModeGuard<C> {
    /// Capture the current mode and enter raw mode.
    ///
    /// If either step fails the terminal is left untouched and no restore
    /// will be attempted.
    pub fn enter(mut control: C) -> Result<Self> {
        let saved = control.capture().map_err(ConsoleError::Terminal)?;
        control
            .enter_raw(&saved)
            .map_err(ConsoleError::Terminal)?;
        debug!("Entered raw terminal mode");

        Ok(Self {
            control,
            saved: Some(saved),
        })
    }

    /// Restore the saved mode now, reporting failure.
    pub fn release(mut self) -> Result<()> {
        self.restore_saved().map_err(ConsoleError::Terminal)
    }

    fn restore_saved(&mut self) -> io::Result<()> {
        match self.saved.take() {
            Some(saved) => {
                self.control.restore(saved)?;
                debug!("Restored terminal mode");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl<C: TerminalControl> Drop for RawModeGuard<C> {
    fn drop(&mut self) {
        if let Err(e) = self.restore_saved() {
            warn!(error = %e, "Failed to restore terminal mode");
        }
    }
}

/// termios-backed control of the process's stdin terminal.
#[cfg(unix)]
#[derive(Debug, Clone, Copy)]
pub struct UnixTerminal {
    fd: std::os::unix::io::RawFd,
}

#[cfg(unix)]
impl UnixTerminal {
    /// Control the terminal behind stdin.
    pub fn stdin() -> Self {
        use std::os::unix::io::AsRawFd;
        Self {
            fd: io::stdin().as_raw_fd(),
        }
    }
}

#[cfg(unix)]
impl TerminalControl for UnixTerminal {
    type Mode = libc::termios;

    fn capture(&mut self) -> io::Result<libc::termios> {
        let mut termios = std::mem::MaybeUninit::<libc::termios>::uninit();
        if unsafe { libc::tcgetattr(self.fd, termios.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(unsafe { termios.assume_init() })
    }

    fn enter_raw(&mut self, saved: &libc::termios) -> io::Result<()> {
        let mut raw = *saved;
        // No echo, no line buffering, no signal characters, 8-bit clean.
        unsafe { libc::cfmakeraw(&mut raw) };
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;

        if unsafe { libc::tcsetattr(self.fd, libc::TCSAFLUSH, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn restore(&mut self, saved: libc::termios) -> io::Result<()> {
        if unsafe { libc::tcsetattr(self.fd, libc::TCSAFLUSH, &saved) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
