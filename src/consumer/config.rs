//! Consumer configuration.
//!
//! [`ConsumerOptions`] holds the long-lived connection settings loaded from
//! the configuration file and environment. [`ConsumeConfig`] describes a
//! single `poll` invocation; every field left unset is filled in from the
//! options and built-in defaults by [`ConsumeConfig::apply_defaults`].
//!
//! # Example
//!
//! ```rust
//! use kafkabridge::consumer::config::{ConsumeConfig, ConsumerOptions, StartOffset};
//!
//! let options = ConsumerOptions::default();
//! let mut config = ConsumeConfig::new("public.hello");
//! config.apply_defaults(&options);
//!
//! assert_eq!(config.start_offset, Some(StartOffset::First));
//! assert_eq!(config.min_bytes, Some(10));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Minimum number of bytes the broker should return per fetch.
pub const DEFAULT_MIN_BYTES: usize = 10;

/// Maximum number of bytes the broker should return per fetch (10 MB).
pub const DEFAULT_MAX_BYTES: usize = 10_000_000;

/// Timeout for establishing broker connections.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// How long the broker keeps the consumer group's offsets.
pub const DEFAULT_RETENTION_TIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Interval for flushing offset commits.
pub const DEFAULT_COMMIT_INTERVAL: Duration = Duration::from_secs(1);

/// Security protocol for Kafka connection.
///
/// Determines how the client connects to Kafka brokers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SecurityProtocol {
    /// No encryption or authentication.
    #[default]
    Plaintext,
    /// TLS encryption without SASL.
    Ssl,
    /// SASL authentication without TLS.
    SaslPlaintext,
    /// SASL authentication with TLS encryption.
    SaslSsl,
}

impl SecurityProtocol {
    /// Returns the Kafka configuration string for this protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plaintext => "PLAINTEXT",
            Self::Ssl => "SSL",
            Self::SaslPlaintext => "SASL_PLAINTEXT",
            Self::SaslSsl => "SASL_SSL",
        }
    }

    /// Whether the protocol encrypts the connection.
    pub fn uses_tls(&self) -> bool {
        matches!(self, Self::Ssl | Self::SaslSsl)
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SaslMechanism {
    /// PLAIN mechanism (API key and secret).
    #[default]
    Plain,
    /// SCRAM-SHA-256 mechanism.
    ScramSha256,
    /// SCRAM-SHA-512 mechanism.
    ScramSha512,
}

impl SaslMechanism {
    /// Returns the Kafka configuration string for this mechanism.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::ScramSha256 => "SCRAM-SHA-256",
            Self::ScramSha512 => "SCRAM-SHA-512",
        }
    }
}

/// SASL authentication configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslConfig {
    /// Authentication mechanism to use.
    pub mechanism: SaslMechanism,
    /// SASL username.
    pub username: String,
    /// SASL password.
    pub password: String,
}

/// Minimum accepted TLS protocol version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsVersion {
    /// TLS 1.2
    #[default]
    V1_2,
    /// TLS 1.3
    V1_3,
}

impl TlsVersion {
    /// Returns the protocol name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1_2 => "TLSv1.2",
            Self::V1_3 => "TLSv1.3",
        }
    }
}

/// SSL/TLS configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SslConfig {
    /// Minimum TLS version.
    pub min_version: TlsVersion,
    /// Path to CA certificate file.
    pub ca_location: Option<String>,
    /// Path to client certificate file (for mTLS).
    pub certificate_location: Option<String>,
    /// Path to client key file (for mTLS).
    pub key_location: Option<String>,
}

/// Where a new consumer group starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOffset {
    /// Oldest available offset.
    First,
    /// Most recent offset.
    Last,
}

impl StartOffset {
    /// Returns the `auto.offset.reset` value for this policy.
    pub fn as_reset_policy(&self) -> &'static str {
        match self {
            Self::First => "earliest",
            Self::Last => "latest",
        }
    }
}

/// Long-lived consumer connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsumerOptions {
    /// Kafka bootstrap server(s), comma-separated.
    #[serde(default = "default_bootstrap_servers")]
    pub bootstrap_servers: String,

    /// API key used as SASL username.
    #[serde(default)]
    pub api_key: String,

    /// API secret used as SASL password.
    #[serde(default)]
    pub api_secret: String,

    /// Default consumer group ID.
    #[serde(default = "default_group_id")]
    pub group_id: String,

    /// Maximum number of messages to receive, negative for unlimited.
    #[serde(default = "default_max_receive")]
    pub max_receive: i64,

    /// Start at the last offset instead of the first.
    #[serde(default)]
    pub start_last: bool,
}

fn default_bootstrap_servers() -> String {
    "localhost:9092".to_string()
}

fn default_group_id() -> String {
    "kafkabridge.local".to_string()
}

fn default_max_receive() -> i64 {
    -1
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            bootstrap_servers: default_bootstrap_servers(),
            api_key: String::new(),
            api_secret: String::new(),
            group_id: default_group_id(),
            max_receive: default_max_receive(),
            start_last: false,
        }
    }
}

impl ConsumerOptions {
    /// Start offset derived from `start_last`.
    pub fn start_offset(&self) -> StartOffset {
        if self.start_last {
            StartOffset::Last
        } else {
            StartOffset::First
        }
    }
}

impl std::fmt::Display for ConsumerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{} group={} hasSecret={}",
            self.api_key,
            self.bootstrap_servers,
            self.group_id,
            !self.api_secret.is_empty()
        )
    }
}

/// Settings for one `poll` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumeConfig {
    /// Topics to subscribe to.
    pub topics: Vec<String>,

    /// Broker addresses.
    pub brokers: Vec<String>,

    /// Consumer group ID.
    pub group_id: Option<String>,

    /// Minimum fetch size in bytes.
    pub min_bytes: Option<usize>,

    /// Maximum fetch size in bytes.
    pub max_bytes: Option<usize>,

    /// Start offset policy for new groups.
    pub start_offset: Option<StartOffset>,

    /// Maximum number of messages to receive, negative for unlimited.
    pub max_receive: Option<i64>,

    /// Offset commit interval.
    pub commit_interval: Option<Duration>,

    /// Consumer group retention on the broker.
    pub retention_time: Option<Duration>,

    /// Broker connection timeout.
    pub dial_timeout: Option<Duration>,

    /// Security protocol for the connection.
    pub security_protocol: Option<SecurityProtocol>,

    /// TLS settings.
    pub ssl: Option<SslConfig>,

    /// SASL credentials.
    pub sasl: Option<SaslConfig>,
}

impl ConsumeConfig {
    /// Creates a configuration for a single topic with everything else unset.
    pub fn new(topic: &str) -> Self {
        Self {
            topics: vec![topic.to_string()],
            ..Default::default()
        }
    }

    /// Creates a configuration for a set of topics.
    pub fn for_topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: topics.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Sets a custom consumer group ID.
    pub fn with_group_id(mut self, group_id: &str) -> Self {
        self.group_id = Some(group_id.to_string());
        self
    }

    /// Sets the maximum number of messages to receive.
    pub fn with_max_receive(mut self, max_receive: i64) -> Self {
        self.max_receive = Some(max_receive);
        self
    }

    /// Sets the start offset policy.
    pub fn with_start_offset(mut self, start_offset: StartOffset) -> Self {
        self.start_offset = Some(start_offset);
        self
    }

    /// Sets the consumer group retention.
    pub fn with_retention_time(mut self, retention: Duration) -> Self {
        self.retention_time = Some(retention);
        self
    }

    /// Configures SASL/SCRAM-SHA-256 authentication over TLS.
    pub fn with_sasl_scram_sha256(mut self, username: &str, password: &str) -> Self {
        self.security_protocol = Some(SecurityProtocol::SaslSsl);
        self.sasl = Some(SaslConfig {
            mechanism: SaslMechanism::ScramSha256,
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }

    /// Configures TLS with a CA certificate.
    pub fn with_ssl(mut self, ca_location: &str) -> Self {
        self.ssl = Some(SslConfig {
            ca_location: Some(ca_location.to_string()),
            ..Default::default()
        });
        self
    }

    /// Fills every unset field from `options` and the built-in defaults.
    ///
    /// SASL/PLAIN credentials are derived from the options' API key and
    /// secret when the caller did not configure SASL explicitly. A config
    /// with SASL credentials defaults to `SASL_SSL`.
    pub fn apply_defaults(&mut self, options: &ConsumerOptions) {
        if self.brokers.is_empty() {
            self.brokers = options
                .bootstrap_servers
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if self.group_id.is_none() {
            self.group_id = Some(options.group_id.clone());
        }
        self.min_bytes.get_or_insert(DEFAULT_MIN_BYTES);
        self.max_bytes.get_or_insert(DEFAULT_MAX_BYTES);
        self.dial_timeout.get_or_insert(DEFAULT_DIAL_TIMEOUT);
        self.retention_time.get_or_insert(DEFAULT_RETENTION_TIME);
        self.commit_interval.get_or_insert(DEFAULT_COMMIT_INTERVAL);
        self.start_offset.get_or_insert(options.start_offset());
        self.max_receive.get_or_insert(options.max_receive);

        if self.sasl.is_none() && !options.api_key.is_empty() {
            self.sasl = Some(SaslConfig {
                mechanism: SaslMechanism::Plain,
                username: options.api_key.clone(),
                password: options.api_secret.clone(),
            });
        }

        if self.security_protocol.is_none() {
            self.security_protocol = Some(if self.sasl.is_some() {
                SecurityProtocol::SaslSsl
            } else {
                SecurityProtocol::Plaintext
            });
        }

        self.ssl.get_or_insert_with(SslConfig::default);
    }

    /// Returns the client properties for this configuration.
    ///
    /// Call after [`ConsumeConfig::apply_defaults`]; unset fields are
    /// skipped.
    pub fn client_settings(&self) -> Vec<(String, String)> {
        let mut settings = vec![
            ("bootstrap.servers".to_string(), self.brokers.join(",")),
            ("enable.auto.commit".to_string(), "true".to_string()),
            ("enable.partition.eof".to_string(), "false".to_string()),
        ];

        if let Some(group_id) = &self.group_id {
            settings.push(("group.id".to_string(), group_id.clone()));
        }
        if let Some(min_bytes) = self.min_bytes {
            settings.push(("fetch.min.bytes".to_string(), min_bytes.to_string()));
        }
        if let Some(max_bytes) = self.max_bytes {
            settings.push(("fetch.max.bytes".to_string(), max_bytes.to_string()));
        }
        if let Some(dial_timeout) = self.dial_timeout {
            settings.push((
                "socket.connection.setup.timeout.ms".to_string(),
                dial_timeout.as_millis().to_string(),
            ));
        }
        if let Some(start_offset) = self.start_offset {
            settings.push((
                "auto.offset.reset".to_string(),
                start_offset.as_reset_policy().to_string(),
            ));
        }
        if let Some(interval) = self.commit_interval {
            settings.push((
                "auto.commit.interval.ms".to_string(),
                interval.as_millis().to_string(),
            ));
        }

        let protocol = self.security_protocol.unwrap_or_default();
        settings.push((
            "security.protocol".to_string(),
            protocol.as_str().to_string(),
        ));

        if let Some(sasl) = &self.sasl {
            settings.push((
                "sasl.mechanism".to_string(),
                sasl.mechanism.as_str().to_string(),
            ));
            settings.push(("sasl.username".to_string(), sasl.username.clone()));
            settings.push(("sasl.password".to_string(), sasl.password.clone()));
        }

        if protocol.uses_tls() {
            if let Some(ssl) = &self.ssl {
                if let Some(ca) = &ssl.ca_location {
                    settings.push(("ssl.ca.location".to_string(), ca.clone()));
                }
                if let Some(cert) = &ssl.certificate_location {
                    settings.push(("ssl.certificate.location".to_string(), cert.clone()));
                }
                if let Some(key) = &ssl.key_location {
                    settings.push(("ssl.key.location".to_string(), key.clone()));
                }
            }
        }

        settings
    }
}
