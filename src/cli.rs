//! Command-line interface for console-bridge.
//!
//! Uses lexopt for minimal binary size overhead (~34KB).

use std::ffi::OsString;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Console proxy WebSocket URL.
    pub url: Option<String>,
    /// Cookie header value.
    pub cookie: Option<String>,
    /// User identity for the login frame.
    pub user: Option<String>,
    /// One-time console ticket.
    pub ticket: Option<String>,
    /// Skip TLS certificate validation.
    pub insecure: bool,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Handshake timeout in seconds.
    pub handshake_timeout: Option<u64>,
    /// Keepalive interval in seconds.
    pub keepalive: Option<u64>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Log file path.
    pub log_file: Option<PathBuf>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('u') | Long("url") => {
                result.url = Some(parser.value()?.parse()?);
            }
            Long("cookie") => {
                result.cookie = Some(parser.value()?.parse()?);
            }
            Short('U') | Long("user") => {
                result.user = Some(parser.value()?.parse()?);
            }
            Short('t') | Long("ticket") => {
                result.ticket = Some(parser.value()?.parse()?);
            }
            Short('k') | Long("insecure") => {
                result.insecure = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Long("handshake-timeout") => {
                result.handshake_timeout = Some(parse_secs(&mut parser, "handshake-timeout")?);
            }
            Long("keepalive") => {
                result.keepalive = Some(parse_secs(&mut parser, "keepalive")?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Long("log-file") => {
                result.log_file = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

fn parse_secs(parser: &mut lexopt::Parser, name: &'static str) -> Result<u64, ArgsError> {
    use lexopt::prelude::*;

    let value: String = parser.value()?.parse()?;
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ArgsError::InvalidValue(name, value)),
    }
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"console-bridge {version}
Interactive terminal bridge to a hypervisor console proxy

USAGE:
    console-bridge [OPTIONS]

OPTIONS:
    -u, --url <URL>             Console proxy WebSocket URL (wss:// or ws://)
        --cookie <VALUE>        Cookie header sent with the upgrade request
    -U, --user <USER>           User identity for the ticket login
    -t, --ticket <TICKET>       One-time console ticket
    -k, --insecure              Skip TLS certificate validation
    -c, --config <FILE>         Path to configuration file (JSON)
        --handshake-timeout <S> Seconds allowed for connect and login [default: 10]
        --keepalive <S>         Seconds between keepalive pings [default: 120]
    -l, --log-level <LVL>       Log level (error, warn, info, debug, trace)
        --log-file <FILE>       Append logs to a file instead of stderr
    -h, --help                  Print help
    -V, --version               Print version

ENVIRONMENT VARIABLES:
    CONSOLE_BRIDGE_URL          Proxy URL (overrides config)
    CONSOLE_BRIDGE_COOKIE       Cookie header (overrides config)
    CONSOLE_BRIDGE_USER         User identity (overrides config)
    CONSOLE_BRIDGE_TICKET       Console ticket (overrides config)
    CONSOLE_BRIDGE_INSECURE     Set to 1 to skip TLS validation
    CONSOLE_BRIDGE_LOG_LEVEL    Log level (overrides config)
    RUST_LOG                    Alternative log level setting

KEYS:
    Ctrl+]                      Disconnect and restore the terminal

EXAMPLES:
    # Attach to a console
    console-bridge -u 'wss://pve:8006/api2/json/nodes/pve/lxc/101/vncwebsocket?port=5900&vncticket=...' \
        --cookie 'PVEAuthCookie=...' -U root@pam -t 'PVEVNC:...'

    # Self-signed lab host, credentials from a file
    console-bridge -k -c ./console.json

    # Debug logging without scribbling over the console
    console-bridge -c ./console.json -l debug --log-file /tmp/console-bridge.log
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("console-bridge {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
