//! REST Proxy Producer Module
//!
//! Pushes single records to a topic through the Kafka REST proxy records
//! API (v3), optionally wrapped in a CloudEvents envelope.
//!
//! Authentication is HTTP Basic with an API key and secret, either
//! configured on [`ProducerOptions`] or embedded in a topic URL override.

pub mod client;
pub mod options;
pub mod request;

pub use client::{ProducerClient, ProducerError};
pub use options::{ProducerOptions, DEFAULT_HTTP_TIMEOUT};
pub use request::{
    HeaderData, KeyData, ProduceResponse, RecordBody, RecordRequest, CLOUDEVENTS_CONTENT_TYPE,
};
