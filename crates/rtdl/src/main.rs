//! RTDL - Delta-writer ingestion stage
//!
//! # Usage
//!
//! ```bash
//! # Run the stage server (default)
//! rtdl
//! rtdl serve --config configs/config.toml
//!
//! # Validate configuration and routing rules
//! rtdl check --config configs/config.toml
//! ```

mod cmd;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rtdl_config::{Config, LogFormat, LogLevel};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// RTDL - Delta-writer ingestion stage
#[derive(Parser, Debug)]
#[command(name = "rtdl")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error) or a filter expression.
    /// Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the stage server
    Serve,

    /// Load configuration and routing rules, report problems
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = cmd::load_config(cli.config.as_deref())?;
    let log_level = resolve_log_level(cli.log_level.as_deref(), &config);
    init_logging(&log_level, config.log.format)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => cmd::serve::run(config).await,
        Command::Check => cmd::check::run(&config),
    }
}

/// Resolve filter directives: CLI flag > config file > default "info"
///
/// A plain level expands to the stage's directives; anything else on the
/// command line is passed through as a raw `EnvFilter` expression.
fn resolve_log_level(cli_level: Option<&str>, config: &Config) -> String {
    match cli_level {
        Some(flag) => match flag.parse::<LogLevel>() {
            Ok(level) => level.directives(),
            Err(_) => flag.to_string(),
        },
        None => config.log.level.directives(),
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    match format {
        LogFormat::Console => tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .init(),
    }

    Ok(())
}
