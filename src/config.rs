//! Configuration management for kafkabridge
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! Environment variables use the `KAFKA_` prefix and win over the file;
//! CLI flags win over both.

use crate::consumer::ConsumerOptions;
use crate::error::{BridgeError, Result};
use crate::producer::ProducerOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Log levels accepted in configuration
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Upper bound for the producer HTTP timeout
const MAX_HTTP_TIMEOUT_SECS: u64 = 3600;

/// Main configuration structure for kafkabridge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// REST proxy producer settings
    #[serde(default)]
    pub producer: ProducerOptions,
    /// Kafka consumer settings
    #[serde(default)]
    pub consumer: ConsumerOptions,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Problems found while loading, emitted once logging is up
    #[serde(skip)]
    pub load_warnings: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON-formatted logs
    #[serde(default)]
    pub json_format: bool,

    /// Log file path (if None, STDERR only)
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

/// Default log level
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

/// Reads an environment variable through `parse`, recording invalid values.
fn env_with<T>(
    name: &str,
    warnings: &mut Vec<String>,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warnings.push(format!("Invalid value for {}: {}", name, raw));
    }
    parsed
}

fn env_parsed<T: FromStr>(name: &str, warnings: &mut Vec<String>) -> Option<T> {
    env_with(name, warnings, |raw| raw.parse().ok())
}

/// Parses a timeout in seconds.
///
/// Accepts a bare number of seconds or a single-unit duration such as
/// `10s`, `2m` or `1h`.
pub fn parse_timeout_secs(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let (digits, scale) = match raw.char_indices().last()? {
        (i, 's') => (&raw[..i], 1),
        (i, 'm') => (&raw[..i], 60),
        (i, 'h') => (&raw[..i], 3600),
        _ => (raw, 1),
    };
    digits.parse::<u64>().ok()?.checked_mul(scale)
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            let mut config = Self::default();
            config
                .load_warnings
                .push(format!("Config file not found at {}, using defaults", path));
            config
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    /// Logs the warnings collected by [`Config::load`]
    ///
    /// Loading happens before the subscriber is installed, so call this
    /// right after logging is initialized.
    pub fn emit_load_warnings(&self) {
        for warning in &self.load_warnings {
            tracing::warn!("{}", warning);
        }
    }

    /// Parses a YAML configuration file without applying overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| BridgeError::Config(format!("Failed to parse config: {}", e)).into())
    }

    /// Applies `KAFKA_*` environment overrides
    ///
    /// Values that fail to parse are ignored and recorded in
    /// `load_warnings`.
    pub fn apply_env_vars(&mut self) {
        let warnings = &mut self.load_warnings;

        // Producer overrides
        if let Ok(endpoint) = std::env::var("KAFKA_REST_ENDPOINT") {
            self.producer.rest_endpoint = endpoint;
        }

        if let Ok(cluster_id) = std::env::var("KAFKA_CLUSTER_ID") {
            self.producer.cluster_id = cluster_id;
        }

        if let Ok(api_key) = std::env::var("KAFKA_PRODUCER_API_KEY") {
            self.producer.api_key = api_key;
        }

        if let Ok(api_secret) = std::env::var("KAFKA_PRODUCER_API_SECRET") {
            self.producer.api_secret = api_secret;
        }

        if let Some(topic_url) = env_parsed::<url::Url>("KAFKA_PRODUCER_TOPIC_URL", warnings) {
            self.producer.topic_url = Some(topic_url);
        }

        if let Some(timeout) = env_with("KAFKA_HTTP_TIMEOUT", warnings, parse_timeout_secs) {
            self.producer.http_timeout_secs = timeout;
        }

        if let Some(dump) = env_parsed("KAFKA_DUMP_MESSAGES", warnings) {
            self.producer.dump_messages = dump;
        }

        // Consumer overrides
        if let Ok(servers) = std::env::var("KAFKA_BOOTSTRAP_SERVERS") {
            self.consumer.bootstrap_servers = servers;
        }

        if let Ok(api_key) = std::env::var("KAFKA_CONSUMER_API_KEY") {
            self.consumer.api_key = api_key;
        }

        if let Ok(api_secret) = std::env::var("KAFKA_CONSUMER_API_SECRET") {
            self.consumer.api_secret = api_secret;
        }

        if let Ok(group_id) = std::env::var("KAFKA_CONSUMER_GROUP_ID") {
            self.consumer.group_id = group_id;
        }

        if let Some(max_receive) = env_parsed("KAFKA_CONSUMER_MAX_RECEIVE", warnings) {
            self.consumer.max_receive = max_receive;
        }

        if let Some(start_last) = env_parsed("KAFKA_CONSUMER_START_LAST", warnings) {
            self.consumer.start_last = start_last;
        }

        // Logging overrides
        if let Ok(level) = std::env::var("KAFKA_LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(level) = &cli.verbosity {
            self.logging.level = level.to_lowercase();
        }
        if cli.json_logs {
            self.logging.json_format = true;
        }
    }

    /// Validate the configuration
    ///
    /// Checks value ranges that apply to every command.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(BridgeError::Config(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                VALID_LOG_LEVELS.join(", ")
            ))
            .into());
        }

        if self.producer.http_timeout_secs > MAX_HTTP_TIMEOUT_SECS {
            return Err(BridgeError::Config(format!(
                "producer.http_timeout_secs must be less than or equal to {}",
                MAX_HTTP_TIMEOUT_SECS
            ))
            .into());
        }

        if self.consumer.bootstrap_servers.trim().is_empty() {
            return Err(BridgeError::Config(
                "consumer.bootstrap_servers cannot be empty".to_string(),
            )
            .into());
        }

        if self.consumer.group_id.trim().is_empty() {
            return Err(
                BridgeError::Config("consumer.group_id cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }

    /// Validate the settings the `produce` command needs
    ///
    /// Either a topic URL or both REST endpoint and cluster ID must be set.
    ///
    /// # Errors
    ///
    /// Returns error if the producer cannot build a record URL
    pub fn validate_producer(&self) -> Result<()> {
        if self.producer.topic_url.is_some() {
            return Ok(());
        }

        if self.producer.rest_endpoint.is_empty() {
            return Err(BridgeError::Config(
                "producer.rest_endpoint (KAFKA_REST_ENDPOINT) or producer.topic_url is required"
                    .to_string(),
            )
            .into());
        }

        if url::Url::parse(&self.producer.rest_endpoint).is_err() {
            return Err(BridgeError::Config(format!(
                "Invalid producer.rest_endpoint: {}",
                self.producer.rest_endpoint
            ))
            .into());
        }

        if self.producer.cluster_id.is_empty() {
            return Err(BridgeError::Config(
                "producer.cluster_id (KAFKA_CLUSTER_ID) is required".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
