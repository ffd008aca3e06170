//! console-bridge binary entry point.

use std::process::ExitCode;

use console_bridge::cli::{parse_args, print_help, print_version};
use console_bridge::config::Config;
use console_bridge::logging;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run 'console-bridge --help' for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        print_version();
        return ExitCode::SUCCESS;
    }

    // Load configuration (CLI > env > file > defaults)
    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let log_file = match config.logging.file.as_deref().map(logging::open_log_file) {
        Some(Ok(file)) => Some(file),
        Some(Err(e)) => {
            eprintln!("Error: failed to open log file: {}", e);
            return ExitCode::FAILURE;
        }
        None => None,
    };
    logging::try_init(Some(config.log_filter()), log_file).ok();

    info!("console-bridge v{}", env!("CARGO_PKG_VERSION"));

    run(&config).await
}

#[cfg(unix)]
async fn run(config: &Config) -> ExitCode {
    use console_bridge::ConsoleSession;

    let (session_config, options) = match (config.to_session_config(), config.to_session_options())
    {
        (Ok(session_config), Ok(options)) => (session_config, options),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {}", e);
            eprintln!("Run 'console-bridge --help' for usage.");
            return ExitCode::from(2);
        }
    };

    eprintln!("Connecting to console... (press Ctrl+] to disconnect)");

    match ConsoleSession::new(session_config, options).open().await {
        Ok(reason) => {
            eprintln!("\r\n{}", reason.describe());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Console session failed");
            eprintln!("\r\nError: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(unix))]
async fn run(_config: &Config) -> ExitCode {
    eprintln!("Error: console-bridge needs a Unix terminal");
    ExitCode::FAILURE
}
