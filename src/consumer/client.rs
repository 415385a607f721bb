//! Kafka consumer loop.
//!
//! A [`Consumer`] reads messages from one or more topics and hands each one
//! to a [`MessageHandler`]. Any number of `poll` calls may run at the same
//! time on clones of the same consumer; all of them share one shutdown
//! barrier, so [`Consumer::wait_for_close`] returns once every loop has
//! released its reader.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kafkabridge::consumer::{ConsumeConfig, Consumer, ConsumerOptions, Message, MessageHandler};
//! use tokio_util::sync::CancellationToken;
//!
//! struct PrintHandler;
//!
//! #[async_trait::async_trait]
//! impl MessageHandler for PrintHandler {
//!     async fn handle(
//!         &self,
//!         message: Message,
//!     ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!         println!("{}: {}", message.offset, message.value_str());
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let consumer = Consumer::new(ConsumerOptions::default());
//!     let cancel = CancellationToken::new();
//!     consumer
//!         .poll(cancel, ConsumeConfig::new("public.hello"), Arc::new(PrintHandler))
//!         .await?;
//!     consumer.wait_for_close().await;
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::{ConsumeConfig, ConsumerOptions};
use super::message::Message;
use super::reader::{KafkaMessageReader, MessageReader, ReadError};
use super::shutdown::{ShutdownGuard, ShutdownTracker};

/// Default bound for [`Consumer::wait_for_close`].
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type returned by message handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Builds a reader for one `poll` call.
pub type ReaderFactory =
    Arc<dyn Fn(&ConsumeConfig) -> Result<Box<dyn MessageReader>, ReadError> + Send + Sync>;

/// Errors that can occur during consumer operations.
#[derive(Error, Debug)]
pub enum ConsumerError {
    /// Reading from the broker failed with a non-benign error.
    #[error("Error on message read: {0}")]
    Read(ReadError),

    /// Reader could not be created.
    #[error("Failed to create reader: {0}")]
    Reader(ReadError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Handler trait for processing consumed messages.
///
/// Handlers are invoked one message at a time per `poll` call, in read
/// order. Returning `Err` logs the failure; the loop keeps going.
#[async_trait::async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process one message.
    async fn handle(&self, message: Message) -> Result<(), HandlerError>;
}

/// Caps how many reads a single `poll` call may attempt.
#[derive(Debug)]
struct ReceiveLimit {
    max: i64,
    taken: AtomicI64,
}

impl ReceiveLimit {
    fn new(max: i64) -> Self {
        Self {
            max,
            taken: AtomicI64::new(0),
        }
    }

    /// Claims the next read slot. A negative maximum never runs out.
    fn try_acquire(&self) -> bool {
        self.max < 0 || self.taken.fetch_add(1, Ordering::SeqCst) < self.max
    }
}

/// Kafka consumer.
///
/// Cloning is cheap and clones share the shutdown barrier.
#[derive(Clone)]
pub struct Consumer {
    options: ConsumerOptions,
    reader_factory: ReaderFactory,
    shutdown: ShutdownTracker,
    close_timeout: Duration,
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("options", &self.options.to_string())
            .field("active", &self.shutdown.active())
            .field("close_timeout", &self.close_timeout)
            .finish()
    }
}

impl Consumer {
    /// Creates a consumer that reads through rdkafka.
    pub fn new(options: ConsumerOptions) -> Self {
        info!(options = %options, "Creating consumer");
        Self {
            options,
            reader_factory: Arc::new(|config: &ConsumeConfig| {
                let reader = KafkaMessageReader::new(config)?;
                Ok(Box::new(reader) as Box<dyn MessageReader>)
            }),
            shutdown: ShutdownTracker::new(),
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Replaces the reader factory.
    pub fn with_reader_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ConsumeConfig) -> Result<Box<dyn MessageReader>, ReadError> + Send + Sync + 'static,
    {
        self.reader_factory = Arc::new(factory);
        self
    }

    /// Sets the bound used by [`Consumer::wait_for_close`].
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Returns the connection options.
    pub fn options(&self) -> &ConsumerOptions {
        &self.options
    }

    /// Number of `poll` calls currently holding a reader.
    pub fn active_consumers(&self) -> usize {
        self.shutdown.active()
    }

    /// Reads messages and hands each to `handler` until the token is
    /// cancelled, the reader closes, or `max_receive` reads have been made.
    ///
    /// Unset fields of `config` are filled from the consumer options.
    ///
    /// # Errors
    ///
    /// Returns `ConsumerError::Config` without touching the broker if no
    /// topic is given, `ConsumerError::Reader` if the reader cannot be
    /// created, and `ConsumerError::Read` on a non-benign read failure.
    pub async fn poll<H>(
        &self,
        cancel: CancellationToken,
        mut config: ConsumeConfig,
        handler: Arc<H>,
    ) -> Result<(), ConsumerError>
    where
        H: MessageHandler + ?Sized,
    {
        if config.topics.iter().all(|t| t.trim().is_empty()) {
            return Err(ConsumerError::Config(
                "at least one topic is required".to_string(),
            ));
        }

        config.apply_defaults(&self.options);
        let max_receive = config.max_receive.unwrap_or(-1);

        info!(
            topics = ?config.topics,
            group_id = ?config.group_id,
            max_receive,
            "Let's consume some messages"
        );

        let reader = (self.reader_factory)(&config).map_err(ConsumerError::Reader)?;
        let mut active = ActiveReader {
            reader,
            _guard: self.shutdown.register(),
        };

        let result = read_loop(
            active.reader.as_mut(),
            &cancel,
            max_receive,
            handler.as_ref(),
        )
        .await;

        debug!("Closing reader");
        if let Err(e) = active.reader.close().await {
            warn!(error = %e, "Failed to close reader");
        }
        drop(active);
        debug!("Ready for shutdown");

        result
    }

    /// Waits up to the configured close timeout (10 seconds by default)
    /// for every running `poll` to release its reader.
    ///
    /// Returns `true` if all consumers closed in time.
    pub async fn wait_for_close(&self) -> bool {
        self.wait_for_close_timeout(self.close_timeout).await
    }

    /// Waits up to `timeout` for every running `poll` to release its reader.
    pub async fn wait_for_close_timeout(&self, timeout: Duration) -> bool {
        info!(
            active = self.shutdown.active(),
            timeout_ms = timeout.as_millis() as u64,
            "Waiting for consumers to close"
        );
        let closed = self.shutdown.wait(timeout).await;
        if closed {
            info!("All consumers closed");
        } else {
            warn!(
                active = self.shutdown.active(),
                "Timed out waiting for consumers to close"
            );
        }
        closed
    }
}

/// Reader registered with the shutdown barrier.
///
/// Fields drop in declaration order: when a handler panics or the poll
/// future is dropped, the reader is released before the consumer
/// deregisters.
struct ActiveReader {
    reader: Box<dyn MessageReader>,
    _guard: ShutdownGuard,
}

async fn read_loop<H>(
    reader: &mut dyn MessageReader,
    cancel: &CancellationToken,
    max_receive: i64,
    handler: &H,
) -> Result<(), ConsumerError>
where
    H: MessageHandler + ?Sized,
{
    let limit = ReceiveLimit::new(max_receive);

    while limit.try_acquire() {
        match reader.read_message(cancel).await {
            Ok(message) => {
                let (topic, partition, offset) =
                    (message.topic.clone(), message.partition, message.offset);
                debug!(topic = %topic, partition, offset, "Received message");

                if let Err(e) = handler.handle(message).await {
                    warn!(
                        topic = %topic,
                        partition,
                        offset,
                        error = %e,
                        "Message handler failed"
                    );
                }
            }
            Err(e) if e.is_benign() => {
                debug!(
                    reason = %e,
                    cancelled = cancel.is_cancelled(),
                    "Reader stopped"
                );
                return Ok(());
            }
            Err(e) => {
                error!(error = %e, "Error on message read");
                return Err(ConsumerError::Read(e));
            }
        }
    }

    info!(max_receive, "Receive limit reached");
    Ok(())
}
