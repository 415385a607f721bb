//! Structured logging setup
//!
//! Provides JSON-formatted and human-readable logging with optional file
//! output. Logs go to STDERR so message dumps on STDOUT stay clean.
//! librdkafka's own log records reach the subscriber through the `log`
//! bridge that `tracing-subscriber` installs.

use crate::config::LoggingConfig;
use anyhow::Result;
use std::fs::{File, OpenOptions};
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Builds the filter: `RUST_LOG` first, then the configured level.
///
/// # Errors
///
/// Returns error if the configured level is not a valid filter directive
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?)
}

fn open_log_file(config: &LoggingConfig) -> Result<Option<Arc<File>>> {
    let Some(path) = &config.file_path else {
        return Ok(None);
    };
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Some(Arc::new(file)))
}

/// Initialize logging based on configuration.
///
/// # Errors
///
/// Returns error if the filter is invalid, the log file cannot be opened,
/// or a global subscriber is already installed
///
/// # Examples
///
/// ```no_run
/// use kafkabridge::config::LoggingConfig;
/// use kafkabridge::logging::init_logging;
///
/// let config = LoggingConfig {
///     level: "debug".to_string(),
///     json_format: true,
///     file_path: None,
/// };
///
/// init_logging(&config).unwrap();
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config)?;
    let log_file = open_log_file(config)?;
    let registry = tracing_subscriber::registry().with(env_filter);

    if config.json_format {
        let stderr_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr);
        let file_layer = log_file.map(|file| {
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(file)
        });
        registry.with(stderr_layer).with(file_layer).try_init()?;
    } else {
        let stderr_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr);
        let file_layer = log_file.map(|file| {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .with_writer(file)
        });
        registry.with(stderr_layer).with(file_layer).try_init()?;
    }

    tracing::debug!(
        level = %config.level,
        json = config.json_format,
        file = ?config.file_path,
        "Logging initialized"
    );
    Ok(())
}
