//! HTTP client for the Kafka REST proxy (records API v3).
//!
//! # Example
//!
//! ```rust,no_run
//! use kafkabridge::producer::{ProducerClient, ProducerOptions, RecordRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ProducerOptions::new("https://localhost:8443", "abc-r2d2")
//!         .with_credentials("key", "secret");
//!     let client = ProducerClient::new(options)?;
//!
//!     let response = client
//!         .produce(RecordRequest::new("public.hello", "Hello Hase!").with_key("k1"))
//!         .await?;
//!     println!("offset {}", response.offset);
//!     Ok(())
//! }
//! ```

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, error, info};

use super::options::ProducerOptions;
use super::request::{ProduceResponse, RecordRequest};
use crate::cloudevents::CloudEventError;
use crate::payload::PayloadError;

/// Errors that can occur while producing a record.
#[derive(Error, Debug)]
pub enum ProducerError {
    /// Request could not be sent or the response not read.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// REST proxy answered with a status other than 200.
    #[error("Unexpected status code {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Response body is not a delivery report.
    #[error("Unexpected topic API response: {body}")]
    InvalidResponse {
        /// Response body.
        body: String,
    },

    /// Delivery report carries an error code other than 200.
    #[error("Record rejected with error code {error_code}: {body}")]
    Rejected {
        /// Embedded error code.
        error_code: i32,
        /// Response body.
        body: String,
    },

    /// Record value could not be prepared.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// CloudEvent envelope could not be built.
    #[error(transparent)]
    CloudEvent(#[from] CloudEventError),

    /// Request body could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(reqwest::Error),
}

impl ProducerError {
    /// Whether the error came from the produce call itself: the proxy was
    /// unreachable, or it answered with a failure.
    pub fn is_client_response(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::UnexpectedStatus { .. }
                | Self::InvalidResponse { .. }
                | Self::Rejected { .. }
        )
    }

    /// Status carried by a client response error.
    ///
    /// This is the HTTP status, or the embedded error code when the HTTP
    /// status was 200.
    pub fn status_code(&self) -> Option<i32> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(i32::from(*status)),
            Self::InvalidResponse { .. } => Some(i32::from(StatusCode::OK.as_u16())),
            Self::Rejected { error_code, .. } => Some(*error_code),
            _ => None,
        }
    }
}

/// Producer for the Kafka REST proxy.
///
/// Holds one pooled HTTP client and can be shared between tasks.
#[derive(Debug, Clone)]
pub struct ProducerClient {
    client: Client,
    options: ProducerOptions,
}

impl ProducerClient {
    /// Creates a new producer.
    ///
    /// # Errors
    ///
    /// Returns `ProducerError::Client` if the HTTP client cannot be created.
    pub fn new(options: ProducerOptions) -> Result<Self, ProducerError> {
        let client = Client::builder()
            .timeout(options.effective_timeout())
            .build()
            .map_err(ProducerError::Client)?;

        info!(options = %options, "Producer configured");

        Ok(Self { client, options })
    }

    /// Returns the producer options.
    pub fn options(&self) -> &ProducerOptions {
        &self.options
    }

    /// Produces one record and returns its delivery report.
    ///
    /// # Errors
    ///
    /// Returns `ProducerError::Transport` if the proxy cannot be reached,
    /// `UnexpectedStatus`, `InvalidResponse` or `Rejected` if it answers
    /// with a failure, and `CloudEvent` or `Payload` if the record cannot
    /// be encoded.
    pub async fn produce(&self, request: RecordRequest) -> Result<ProduceResponse, ProducerError> {
        let url = self.options.record_endpoint(&request.topic);
        let body = serde_json::to_string(&request.to_body()?)?;

        info!(
            url = %url,
            topic = %request.topic,
            cloud_event = request.as_cloud_event,
            "Producing record"
        );
        if self.options.dump_messages {
            info!(body = %body, "Request body");
        }

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(
                AUTHORIZATION,
                format!("Basic {}", self.options.basic_auth()),
            )
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if self.options.dump_messages {
            info!(status = status.as_u16(), body = %body, "Response body");
        }

        if status != StatusCode::OK {
            error!(status = status.as_u16(), url = %url, "Unexpected status code");
            return Err(ProducerError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let report: ProduceResponse = match serde_json::from_str(&body) {
            Ok(report) => report,
            Err(e) => {
                debug!(error = %e, "Response is not a delivery report");
                return Err(ProducerError::InvalidResponse { body });
            }
        };

        if report.error_code != i32::from(StatusCode::OK.as_u16()) {
            error!(error_code = report.error_code, "Record rejected");
            return Err(ProducerError::Rejected {
                error_code: report.error_code,
                body,
            });
        }

        info!(
            topic = %report.topic_name,
            partition = report.partition_id,
            offset = report.offset,
            "Record produced"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_response_errors() {
        let status = ProducerError::UnexpectedStatus {
            status: 403,
            body: "forbidden".to_string(),
        };
        assert!(status.is_client_response());
        assert_eq!(status.status_code(), Some(403));

        let invalid = ProducerError::InvalidResponse {
            body: "<html>".to_string(),
        };
        assert!(invalid.is_client_response());
        assert_eq!(invalid.status_code(), Some(200));

        let rejected = ProducerError::Rejected {
            error_code: 40403,
            body: "{}".to_string(),
        };
        assert!(rejected.is_client_response());
        assert_eq!(rejected.status_code(), Some(40403));
    }

    #[test]
    fn test_other_errors_are_not_client_responses() {
        let err = ProducerError::CloudEvent(CloudEventError::MissingAttribute("source"));
        assert!(!err.is_client_response());
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_error_display() {
        let err = ProducerError::UnexpectedStatus {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Unexpected status code 500: boom");
    }

    #[test]
    fn test_new_client() {
        let client = ProducerClient::new(ProducerOptions::new("https://localhost:8443", "abc"))
            .unwrap();
        assert_eq!(client.options().cluster_id, "abc");
    }
}
