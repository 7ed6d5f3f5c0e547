//! Tracing setup for the `hp5316` binary.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the application. This module provides the subscriber the CLI uses:
//! a `tracing-subscriber` fmt layer in one of three formats, filtered by
//! `RUST_LOG` when set and by the configured level otherwise.
//!
//! ```no_run
//! use hp5316::logging::{self, LogFormat, LoggingOptions};
//! use tracing::Level;
//!
//! logging::init(LoggingOptions::new(Level::DEBUG).with_format(LogFormat::Json))?;
//! tracing::info!("Counter session starting");
//! # Ok::<(), String>(())
//! ```

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, colored (for development)
    #[default]
    Pretty,
    /// Single line, no colors
    Compact,
    /// One JSON object per event (for log aggregation)
    Json,
}

/// Subscriber options
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Log level (used when `RUST_LOG` is unset)
    pub level: Level,
    /// Output format
    pub format: LogFormat,
    /// Whether to include file and line numbers
    pub with_file_and_line: bool,
    /// Whether to enable ANSI colors (only for Pretty format)
    pub with_ansi: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            with_file_and_line: false,
            with_ansi: true,
        }
    }
}

impl LoggingOptions {
    /// Options with the given level and default formatting.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Options from the `[logging]` config section.
    pub fn from_config(config: &LoggingConfig) -> Result<Self, String> {
        Ok(Self {
            level: parse_log_level(&config.level)?,
            format: config.format,
            ..Default::default()
        })
    }

    /// Set output format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable ANSI colors
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }
}

/// Install the global subscriber.
///
/// Idempotent: if a subscriber is already installed this returns `Ok(())`.
/// Log lines go to stderr so stdout stays free for readings.
pub fn init(options: LoggingOptions) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.level.as_str().to_ascii_lowercase()));

    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(options.with_file_and_line)
        .with_line_number(options.with_file_and_line);

    let layer = match options.format {
        LogFormat::Pretty => base.pretty().with_ansi(options.with_ansi).boxed(),
        LogFormat::Compact => base.compact().with_ansi(false).boxed(),
        LogFormat::Json => base.json().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(env_filter))
        .try_init()
        .or_else(|e| {
            // Tests and embedding applications may have installed one already
            if e
                .to_string()
                .contains("a global default trace dispatcher has already been set")
            {
                Ok(())
            } else {
                Err(format!("Failed to initialize tracing: {}", e))
            }
        })
}

/// Parse log level string into tracing Level
pub fn parse_log_level(level: &str) -> Result<Level, String> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(format!(
            "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
            level
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("trace"), Ok(Level::TRACE)));
        assert!(matches!(parse_log_level("warn"), Ok(Level::WARN)));
        assert!(matches!(parse_log_level("Debug"), Ok(Level::DEBUG)));
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn test_options_from_config() {
        let config = LoggingConfig {
            level: "error".to_string(),
            format: LogFormat::Json,
        };
        let options = LoggingOptions::from_config(&config).unwrap();
        assert_eq!(options.level, Level::ERROR);
        assert_eq!(options.format, LogFormat::Json);

        let bad = LoggingConfig {
            level: "loud".to_string(),
            format: LogFormat::Compact,
        };
        assert!(LoggingOptions::from_config(&bad).is_err());
    }
}
