//! Tracing setup for Playdeck
//!
//! Console output follows the level the user picks on the command line,
//! while a per-run log file captures everything at TRACE so a playback
//! session can be reconstructed after the fact.

use std::fs::{File, create_dir_all};
use std::path::PathBuf;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Where and how loudly to log.
#[derive(Debug, Clone)]
pub struct TracingOptions {
    /// Level for console output; `RUST_LOG` overrides it when set
    pub console_level: Level,
    /// Directory receiving the per-run log file
    pub logs_dir: PathBuf,
    /// File name of the per-run log, overwritten on every start
    pub log_file_name: String,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            console_level: Level::INFO,
            logs_dir: PathBuf::from("logs"),
            log_file_name: "playdeck-last-run.log".to_string(),
        }
    }
}

impl TracingOptions {
    /// Full path of the per-run log file.
    pub fn log_file_path(&self) -> PathBuf {
        self.logs_dir.join(&self.log_file_name)
    }
}

/// Installs the global subscriber with a console layer and a trace file layer.
///
/// # Errors
///
/// - `Box<dyn std::error::Error>` - If the logs directory cannot be created,
///   the log file cannot be opened, or a global subscriber is already set
pub fn init_tracing(options: &TracingOptions) -> Result<(), Box<dyn std::error::Error>> {
    create_dir_all(&options.logs_dir)?;
    let log_file_path = options.log_file_path();
    let log_file = File::create(&log_file_path)?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.console_level.to_string()));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(EnvFilter::new("trace"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        "Tracing initialized: console={}, trace_file={}",
        options.console_level,
        log_file_path.display()
    );

    Ok(())
}

/// CLI log levels for user control
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    /// Only error messages
    Error,
    /// Warning and error messages
    Warn,
    /// Informational, warning, and error messages
    #[default]
    Info,
    /// Debug, informational, warning, and error messages
    Debug,
    /// All messages including detailed tracing
    Trace,
}

impl CliLogLevel {
    /// Converts CLI log level to tracing Level enum.
    ///
    /// # Examples
    /// ```
    /// use playdeck_core::tracing_setup::CliLogLevel;
    ///
    /// let level = CliLogLevel::Debug.as_tracing_level();
    /// assert_eq!(level, tracing::Level::DEBUG);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}
