//! Error types for kafkabridge
//!
//! Each module defines its own `thiserror` enum; [`BridgeError`] wraps them
//! for the command layer, which works with `anyhow`.

use thiserror::Error;

use crate::cloudevents::CloudEventError;
use crate::consumer::ConsumerError;
use crate::payload::PayloadError;
use crate::producer::ProducerError;

/// Main error type for kafkabridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid command-line input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Producer errors
    #[error("Producer error: {0}")]
    Producer(#[from] ProducerError),

    /// Consumer errors
    #[error("Consumer error: {0}")]
    Consumer(#[from] ConsumerError),

    /// CloudEvent errors
    #[error("CloudEvent error: {0}")]
    CloudEvent(#[from] CloudEventError),

    /// Payload errors
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for kafkabridge operations
///
/// Uses `anyhow::Error` so commands can attach context.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = BridgeError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_invalid_argument_display() {
        let error = BridgeError::InvalidArgument("record must not be empty".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid argument: record must not be empty"
        );
    }

    #[test]
    fn test_producer_error_conversion() {
        let error: BridgeError = ProducerError::Rejected {
            error_code: 40403,
            body: "{}".to_string(),
        }
        .into();
        assert!(error.to_string().starts_with("Producer error: Record rejected"));
    }

    #[test]
    fn test_consumer_error_conversion() {
        let error: BridgeError = ConsumerError::Config("no topic".to_string()).into();
        assert_eq!(
            error.to_string(),
            "Consumer error: Configuration error: no topic"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let error: BridgeError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(error.to_string().contains("missing"));
    }

    #[test]
    fn test_result_with_anyhow() {
        fn failing() -> Result<()> {
            Err(BridgeError::Config("boom".to_string()).into())
        }
        let err = failing().unwrap_err();
        assert!(err.downcast_ref::<BridgeError>().is_some());
    }
}
