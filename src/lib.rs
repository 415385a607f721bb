//! kafkabridge - Kafka consumer and REST proxy producer library
//!
//! This library bridges applications to a Kafka-compatible event bus in
//! two directions: a cancellable consumer loop that hands messages to a
//! handler, and a producer that pushes single records through the Kafka
//! REST proxy, optionally wrapped as CloudEvents.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `payload`: classification of record values as `STRING` or `JSON`
//! - `cloudevents`: CloudEvents 1.0 envelopes
//! - `producer`: REST proxy client, record URLs, and Basic auth
//! - `consumer`: poll loop, reader abstraction, shutdown barrier, handlers
//! - `config`: Configuration management and validation
//! - `logging`: tracing subscriber setup
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use kafkabridge::producer::{ProducerClient, RecordRequest};
//! use kafkabridge::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file("config/kafkabridge.yaml")?;
//!     config.validate()?;
//!
//!     let client = ProducerClient::new(config.producer)?;
//!     client
//!         .produce(RecordRequest::new("public.hello", "Hello Hase!"))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod cloudevents;
pub mod commands;
pub mod config;
pub mod consumer;
pub mod error;
pub mod logging;
pub mod payload;
pub mod producer;

// Re-export commonly used types
pub use cloudevents::{CloudEvent, CloudEventError};
pub use config::Config;
pub use consumer::{ConsumeConfig, Consumer, ConsumerOptions, Message, MessageHandler};
pub use error::{BridgeError, Result};
pub use payload::{Payload, ValueType};
pub use producer::{ProduceResponse, ProducerClient, ProducerOptions, RecordRequest};
