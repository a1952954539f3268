//! Logging System
//!
//! Structured logging via the `tracing` crate. The daemon logs to stdout or
//! to an append-only file, in text or JSON format, with the filter taken
//! from the `ETCGEN_LOG` environment variable when set.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path (if output is "file")
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Enable colored output (text format, stdout only)
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stdout".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
        }
    }
}

impl LoggingConfig {
    /// Validate format and output values before installing the subscriber.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.format != "text" && self.format != "json" {
            return Err(ConfigError::Invalid(format!(
                "invalid log format: {} (must be 'text' or 'json')",
                self.format
            )));
        }
        match self.output.as_str() {
            "stdout" => Ok(()),
            "file" => {
                if self.file.is_none() {
                    return Err(ConfigError::Invalid(
                        "log output is 'file' but no log file path is set".to_string(),
                    ));
                }
                Ok(())
            }
            other => Err(ConfigError::Invalid(format!(
                "invalid log output: {} (must be 'stdout' or 'file')",
                other
            ))),
        }
    }
}

/// Initialize the logging system.
///
/// Priority order (highest to lowest):
/// 1. `ETCGEN_LOG` environment variable
/// 2. Configuration file
/// 3. Defaults
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    config.validate()?;

    let filter = build_env_filter(config)?;
    let base = Registry::default().with(filter);

    let file_writer = if config.output == "file" {
        // validate() guarantees the path is set here
        let path = config.file.clone().unwrap_or_default();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Invalid(format!("failed to create log directory: {}", e))
            })?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                ConfigError::Invalid(format!("failed to open log file {:?}: {}", path, e))
            })?;
        Some(file)
    } else {
        None
    };

    match (config.format.as_str(), file_writer) {
        ("json", Some(file)) => base
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(file),
            )
            .init(),
        ("json", None) => base
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stdout),
            )
            .init(),
        (_, Some(file)) => base
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_writer(file),
            )
            .init(),
        (_, None) => base
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(config.color)
                    .with_writer(std::io::stdout),
            )
            .init(),
    }

    Ok(())
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_env("ETCGEN_LOG") {
        return Ok(filter);
    }

    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    config
        .level
        .parse()
        .map(|directive| EnvFilter::default().add_directive(directive))
        .map_err(|e| ConfigError::Invalid(format!("invalid log level directive: {}", e)))
}
