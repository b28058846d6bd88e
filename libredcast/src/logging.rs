//! Logging setup for the Redcast daemon
//!
//! Supports text, JSON and pretty output on stderr, optionally mirrored
//! into an append-only log file so unattended runs leave a trace on disk.
//!
//! # Examples
//!
//! ```no_run
//! use libredcast::logging::{LoggingConfig, LogFormat};
//!
//! let config = LoggingConfig::new(LogFormat::Json, "info".to_string(), None);
//! config.init();
//!
//! // Or use default settings (respects env vars)
//! libredcast::logging::init_default();
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text output (no colors, for piping)
    Text,
    /// Machine-parseable JSON (one JSON object per line)
    Json,
    /// Pretty-printed with colors (for development)
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

/// Configuration for logging initialization
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    pub log_file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Create a new logging configuration
    ///
    /// # Arguments
    ///
    /// * `format` - Log output format (text, json, or pretty)
    /// * `level` - Minimum log level (error, warn, info, debug, trace)
    /// * `log_file` - Optional file that receives a copy of every event
    pub fn new(format: LogFormat, level: String, log_file: Option<PathBuf>) -> Self {
        Self {
            format,
            level,
            log_file,
        }
    }

    /// Initialize logging with the configured settings
    ///
    /// This should be called once at the start of your program.
    ///
    /// # Panics
    ///
    /// Panics if the logging subscriber has already been initialized
    pub fn init(&self) {
        use tracing_subscriber::EnvFilter;

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        let (writer, file_error) = self.make_writer();

        match self.format {
            LogFormat::Json => {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .with_current_span(true)
                    .with_span_list(true)
                    .flatten_event(true)
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::fmt()
                    .pretty()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .with_ansi(self.ansi_enabled())
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .init();
            }
            LogFormat::Text => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .with_ansi(self.ansi_enabled())
                    .with_target(false)
                    .with_level(true)
                    .init();
            }
        }

        if let Some(error) = file_error {
            tracing::warn!("{}; logging to stderr only", error);
        }
    }

    /// File copies must stay free of escape codes
    fn ansi_enabled(&self) -> bool {
        self.log_file.is_none()
    }

    fn make_writer(&self) -> (BoxMakeWriter, Option<String>) {
        let Some(path) = &self.log_file else {
            return (BoxMakeWriter::new(std::io::stderr), None);
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return (
                    BoxMakeWriter::new(std::io::stderr),
                    Some(format!("Could not create {}: {}", parent.display(), e)),
                );
            }
        }

        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => (
                BoxMakeWriter::new(std::io::stderr.and(Mutex::new(file))),
                None,
            ),
            Err(e) => (
                BoxMakeWriter::new(std::io::stderr),
                Some(format!("Could not open log file {}: {}", path.display(), e)),
            ),
        }
    }
}

/// Initialize logging with default settings
///
/// Respects `REDCAST_LOG_FORMAT`, `REDCAST_LOG_LEVEL` and `REDCAST_LOG_FILE`.
/// Falls back to text format with info level on stderr if not set.
///
/// # Examples
///
/// ```bash
/// export REDCAST_LOG_FORMAT=json
/// export REDCAST_LOG_FILE=logs/bot.log
/// redcast-send --run-once
/// ```
pub fn init_default() {
    let format = std::env::var("REDCAST_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(LogFormat::Text);

    let level = std::env::var("REDCAST_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let log_file = std::env::var("REDCAST_LOG_FILE")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(|s| PathBuf::from(shellexpand::tilde(&s).to_string()));

    LoggingConfig::new(format, level, log_file).init();
}
