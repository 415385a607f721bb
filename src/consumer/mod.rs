//! Kafka Consumer Module
//!
//! Reads records from Kafka topics and hands them to a [`MessageHandler`].
//!
//! # Overview
//!
//! - **Consumer**: cancellable poll loop with an optional receive limit
//! - **Reader**: broker access behind the [`MessageReader`] trait
//! - **Shutdown**: a barrier that lets the process wait for all loops to
//!   release their readers
//! - **Handlers**: stock handlers for dumping messages, dumping CloudEvents
//!   and piping values into an external command
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kafkabridge::consumer::{ConsumeConfig, Consumer, ConsumerOptions, DumpHandler};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let consumer = Consumer::new(ConsumerOptions::default());
//!     let cancel = CancellationToken::new();
//!
//!     let task = {
//!         let consumer = consumer.clone();
//!         let cancel = cancel.clone();
//!         tokio::spawn(async move {
//!             consumer
//!                 .poll(cancel, ConsumeConfig::new("public.hello"), Arc::new(DumpHandler))
//!                 .await
//!         })
//!     };
//!
//!     tokio::signal::ctrl_c().await?;
//!     cancel.cancel();
//!     consumer.wait_for_close().await;
//!     task.await??;
//!     Ok(())
//! }
//! ```
//!
//! # Authentication
//!
//! When an API key is configured the consumer authenticates with
//! SASL/PLAIN over TLS. SCRAM-SHA-256/512 can be selected per call with
//! [`ConsumeConfig::with_sasl_scram_sha256`] or an explicit [`SaslConfig`].

pub mod client;
pub mod config;
pub mod handlers;
pub mod message;
pub mod reader;
pub mod shutdown;

pub use client::{
    Consumer, ConsumerError, HandlerError, MessageHandler, ReaderFactory, DEFAULT_CLOSE_TIMEOUT,
};
pub use config::{
    ConsumeConfig, ConsumerOptions, SaslConfig, SaslMechanism, SecurityProtocol, SslConfig,
    StartOffset, TlsVersion,
};
pub use handlers::{CloudEventDumpHandler, CommandHandler, DumpHandler};
pub use message::{Header, Message};
pub use reader::{KafkaMessageReader, MessageReader, ReadError};
pub use shutdown::{ShutdownGuard, ShutdownTracker};
