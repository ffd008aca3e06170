//! Logging initialization and configuration.
//!
//! While a session is running the terminal is in raw mode, so stderr
//! output would be mixed into the remote screen. Pass a log file to keep
//! diagnostics out of the way.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither a level nor `RUST_LOG` is given.
pub const DEFAULT_FILTER: &str = "console_bridge=warn";

/// Build the filter for a configured level.
///
/// A bare level such as `debug` applies to this crate only; anything with
/// a directive (`=` or `,`) is used as-is. Without a level, `RUST_LOG` is
/// consulted, then [`DEFAULT_FILTER`].
pub fn filter_for(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) if level.contains('=') || level.contains(',') => {
            EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
        Some(level) => EnvFilter::try_new(format!("console_bridge={}", level))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        None => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
    }
}

/// Open (or create) a log file for appending.
pub fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Try to initialize the logging system.
///
/// Logs go to `file` when given, otherwise to stderr. Returns `Err` if
/// logging has already been initialized.
pub fn try_init(
    level: Option<&str>,
    file: Option<File>,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let registry = tracing_subscriber::registry().with(filter_for(level));

    match file {
        Some(file) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .try_init(),
        None => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
}
