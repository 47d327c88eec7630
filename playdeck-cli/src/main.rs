//! Playdeck CLI - Command-line interface
//!
//! Drives a headless playback session against the demo catalog.

mod commands;

use clap::Parser;
use playdeck_core::PlaydeckConfig;
use playdeck_core::tracing_setup::{CliLogLevel, TracingOptions, init_tracing};

#[derive(Parser)]
#[command(name = "playdeck")]
#[command(about = "Search a video catalog and play its chapters")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,

    /// Console log level; RUST_LOG takes precedence when set
    #[arg(long, value_enum, global = true, default_value_t = CliLogLevel::Info)]
    log_level: CliLogLevel,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_tracing(&TracingOptions {
        console_level: cli.log_level.as_tracing_level(),
        ..TracingOptions::default()
    })?;

    let config = PlaydeckConfig::from_env();
    if let Err(e) = commands::handle_command(cli.command, &config).await {
        tracing::error!("{}", e);
        eprintln!("{}", e.user_message());
        return Err(e.into());
    }

    Ok(())
}
