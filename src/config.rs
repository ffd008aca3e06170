//! Configuration management for console-bridge.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::protocol::HANDSHAKE_TIMEOUT;
use crate::session::{SessionConfig, SessionOptions, KEEPALIVE_INTERVAL};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Console proxy endpoint and credentials.
    pub connection: ConnectionSection,
    /// Session timing.
    pub session: SessionSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Connection configuration section.
///
/// The strings are normally produced by the management API's console
/// ticket call and handed over verbatim.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSection {
    /// Console proxy WebSocket URL.
    pub url: Option<String>,
    /// Cookie header value.
    pub cookie: Option<String>,
    /// User identity for the login frame.
    pub user: Option<String>,
    /// One-time console ticket.
    pub ticket: Option<String>,
    /// Validate the proxy's TLS certificate.
    pub verify_tls: bool,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            url: None,
            cookie: None,
            user: None,
            ticket: None,
            verify_tls: true,
        }
    }
}

impl std::fmt::Debug for ConnectionSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSection")
            .field("url", &self.url)
            .field("cookie", &self.cookie.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .field("ticket", &self.ticket.as_ref().map(|_| "<redacted>"))
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

/// Session timing section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Bound on the WebSocket upgrade and on the login, each.
    pub handshake_timeout_secs: u64,
    /// Seconds between keepalive pings.
    pub keepalive_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            handshake_timeout_secs: HANDSHAKE_TIMEOUT.as_secs(),
            keepalive_secs: KEEPALIVE_INTERVAL.as_secs(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a full filter.
    pub level: String,
    /// Write logs here instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(url) = non_empty("CONSOLE_BRIDGE_URL") {
            self.connection.url = Some(url);
        }
        if let Some(cookie) = non_empty("CONSOLE_BRIDGE_COOKIE") {
            self.connection.cookie = Some(cookie);
        }
        if let Some(user) = non_empty("CONSOLE_BRIDGE_USER") {
            self.connection.user = Some(user);
        }
        if let Some(ticket) = non_empty("CONSOLE_BRIDGE_TICKET") {
            self.connection.ticket = Some(ticket);
        }
        if let Some(insecure) = non_empty("CONSOLE_BRIDGE_INSECURE") {
            if matches!(insecure.as_str(), "1" | "true" | "yes") {
                self.connection.verify_tls = false;
            }
        }

        if let Some(level) = non_empty("CONSOLE_BRIDGE_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = non_empty("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref url) = args.url {
            self.connection.url = Some(url.clone());
        }
        if let Some(ref cookie) = args.cookie {
            self.connection.cookie = Some(cookie.clone());
        }
        if let Some(ref user) = args.user {
            self.connection.user = Some(user.clone());
        }
        if let Some(ref ticket) = args.ticket {
            self.connection.ticket = Some(ticket.clone());
        }
        if args.insecure {
            self.connection.verify_tls = false;
        }

        if let Some(secs) = args.handshake_timeout {
            self.session.handshake_timeout_secs = secs;
        }
        if let Some(secs) = args.keepalive {
            self.session.keepalive_secs = secs;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
        if let Some(ref path) = args.log_file {
            self.logging.file = Some(path.clone());
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Config::default();

        // Load from config file if specified
        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        // Apply environment variable overrides
        config.apply_env();

        // Apply CLI argument overrides (highest priority)
        config.apply_args(args);

        Ok(config)
    }

    /// Build the immutable inputs for a session.
    pub fn to_session_config(&self) -> Result<SessionConfig, ConfigError> {
        fn required(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(ConfigError::Missing(name))
        }

        Ok(SessionConfig {
            url: required(&self.connection.url, "url")?,
            cookie: required(&self.connection.cookie, "cookie")?,
            user: required(&self.connection.user, "user")?,
            ticket: required(&self.connection.ticket, "ticket")?,
            verify_tls: self.connection.verify_tls,
        })
    }

    /// Build the session timing options.
    pub fn to_session_options(&self) -> Result<SessionOptions, ConfigError> {
        if self.session.handshake_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "handshake_timeout_secs",
                "must be at least 1".to_string(),
            ));
        }
        if self.session.keepalive_secs == 0 {
            return Err(ConfigError::Invalid(
                "keepalive_secs",
                "must be at least 1".to_string(),
            ));
        }

        Ok(SessionOptions {
            handshake_timeout: Duration::from_secs(self.session.handshake_timeout_secs),
            keepalive_interval: Duration::from_secs(self.session.keepalive_secs),
        })
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// A required connection field is absent.
    Missing(&'static str),
    /// A field has an unusable value.
    Invalid(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::Missing(field) => write!(f, "missing required setting: {}", field),
            Self::Invalid(field, reason) => write!(f, "invalid {}: {}", field, reason),
        }
    }
}

impl std::error::Error for ConfigError {}
