//! Broker read capability used by the consumer loop.
//!
//! The poll loop only needs "read next message" and "close". Keeping this
//! behind [`MessageReader`] lets tests drive the loop with an in-memory
//! sequence instead of a broker.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{Headers, Message as KafkaMessage};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::config::ConsumeConfig;
use super::message::{Header, Message};

/// Errors returned by a [`MessageReader`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// Reader has been closed.
    #[error("reader closed")]
    Closed,

    /// Read was cancelled.
    #[error("read cancelled")]
    Cancelled,

    /// Read deadline passed.
    #[error("read deadline exceeded")]
    DeadlineExceeded,

    /// Error from the Kafka client.
    #[error("Kafka error: {0}")]
    Kafka(String),

    /// Transport error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl ReadError {
    /// Whether the error means the reader shut down normally.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Source of messages for the poll loop.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageReader: Send {
    /// Reads the next message, waiting until one is available.
    ///
    /// Implementations must return promptly with [`ReadError::Cancelled`]
    /// (or another benign error) once `cancel` fires.
    async fn read_message(&mut self, cancel: &CancellationToken) -> Result<Message, ReadError>;

    /// Closes the reader. Calling it more than once is harmless.
    ///
    /// This is the graceful path. Dropping a reader without closing it
    /// must still release its broker resources.
    async fn close(&mut self) -> Result<(), ReadError>;
}

/// [`MessageReader`] backed by an rdkafka `StreamConsumer`.
///
/// Dropping it drops the `StreamConsumer`, which closes the consumer and
/// leaves the group.
pub struct KafkaMessageReader {
    consumer: StreamConsumer,
    closed: bool,
}

impl KafkaMessageReader {
    /// Creates a consumer from `config` and subscribes to its topics.
    ///
    /// # Errors
    ///
    /// Returns `ReadError::Kafka` if the client cannot be created or the
    /// subscription fails.
    pub fn new(config: &ConsumeConfig) -> Result<Self, ReadError> {
        let mut client_config = ClientConfig::new();
        for (key, value) in config.client_settings() {
            client_config.set(key, value);
        }

        if let Some(retention) = config.retention_time {
            debug!(
                retention_secs = retention.as_secs(),
                "Consumer group retention is managed by the broker"
            );
        }
        if let Some(ssl) = &config.ssl {
            debug!(min_tls = ssl.min_version.as_str(), "TLS policy");
        }

        let consumer: StreamConsumer = client_config
            .create()
            .map_err(|e| ReadError::Kafka(format!("Failed to create consumer: {}", e)))?;

        let topics: Vec<&str> = config.topics.iter().map(String::as_str).collect();
        consumer
            .subscribe(&topics)
            .map_err(|e| ReadError::Kafka(format!("Failed to subscribe: {}", e)))?;

        debug!(topics = ?config.topics, "Subscribed to topics");

        Ok(Self {
            consumer,
            closed: false,
        })
    }
}

#[async_trait]
impl MessageReader for KafkaMessageReader {
    async fn read_message(&mut self, cancel: &CancellationToken) -> Result<Message, ReadError> {
        if self.closed {
            return Err(ReadError::Closed);
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(ReadError::Cancelled),
            received = self.consumer.recv() => {
                let borrowed = received.map_err(|e| ReadError::Kafka(e.to_string()))?;
                Ok(to_message(&borrowed))
            }
        }
    }

    async fn close(&mut self) -> Result<(), ReadError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.consumer.unsubscribe();
        Ok(())
    }
}

fn to_message<M: KafkaMessage>(record: &M) -> Message {
    let headers = record
        .headers()
        .map(|headers| {
            headers
                .iter()
                .map(|h| Header::new(h.key, h.value.map(<[u8]>::to_vec).unwrap_or_default()))
                .collect()
        })
        .unwrap_or_default();

    let timestamp = record
        .timestamp()
        .to_millis()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

    Message {
        topic: record.topic().to_string(),
        partition: record.partition(),
        offset: record.offset(),
        key: record.key().map(<[u8]>::to_vec).unwrap_or_default(),
        value: record.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        headers,
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign_errors() {
        assert!(ReadError::Closed.is_benign());
        assert!(ReadError::Cancelled.is_benign());
        assert!(ReadError::DeadlineExceeded.is_benign());
        assert!(!ReadError::Kafka("broker down".to_string()).is_benign());
        assert!(!ReadError::Io("reset".to_string()).is_benign());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ReadError::Kafka("broker down".to_string()).to_string(),
            "Kafka error: broker down"
        );
    }

    #[test]
    fn test_to_message_maps_record() {
        use rdkafka::message::{Header as KafkaHeader, OwnedHeaders, OwnedMessage, Timestamp};

        let headers = OwnedHeaders::new()
            .insert(KafkaHeader {
                key: "content-type",
                value: Some("application/cloudevents+json".as_bytes()),
            })
            .insert(KafkaHeader {
                key: "empty",
                value: None::<&[u8]>,
            });
        let record = OwnedMessage::new(
            Some(b"Hello Hase!".to_vec()),
            Some(b"k1".to_vec()),
            "public.hello".to_string(),
            Timestamp::CreateTime(1_714_559_400_000),
            3,
            42,
            Some(headers),
        );

        let message = to_message(&record);
        assert_eq!(message.topic, "public.hello");
        assert_eq!(message.partition, 3);
        assert_eq!(message.offset, 42);
        assert_eq!(message.key, b"k1");
        assert_eq!(message.value_str(), "Hello Hase!");
        assert_eq!(
            message.header("content-type"),
            Some(&b"application/cloudevents+json"[..])
        );
        assert_eq!(message.header("empty"), Some(&b""[..]));
        assert_eq!(
            message.timestamp.map(|t| t.timestamp_millis()),
            Some(1_714_559_400_000)
        );
    }

    #[test]
    fn test_to_message_without_optional_parts() {
        use rdkafka::message::{OwnedMessage, Timestamp};

        let record = OwnedMessage::new(
            None,
            None,
            "events".to_string(),
            Timestamp::NotAvailable,
            0,
            7,
            None,
        );

        let message = to_message(&record);
        assert!(message.key.is_empty());
        assert!(message.value.is_empty());
        assert!(message.headers.is_empty());
        assert!(message.timestamp.is_none());
    }
}
