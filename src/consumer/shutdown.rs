//! Shutdown barrier shared by concurrently running consumers.
//!
//! Every running `poll` holds a [`ShutdownGuard`]. Dropping the guard
//! deregisters the consumer, so the count is decremented on every exit
//! path, including when the poll future itself is dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Counts live consumers and lets one waiter block until all are gone.
#[derive(Debug, Clone)]
pub struct ShutdownTracker {
    active: Arc<watch::Sender<usize>>,
}

impl Default for ShutdownTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownTracker {
    /// Creates a tracker with no registered consumers.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0usize);
        Self {
            active: Arc::new(tx),
        }
    }

    /// Registers a consumer; the returned guard deregisters it on drop.
    pub fn register(&self) -> ShutdownGuard {
        self.active.send_modify(|count| *count += 1);
        ShutdownGuard {
            active: Arc::clone(&self.active),
        }
    }

    /// Number of consumers currently registered.
    pub fn active(&self) -> usize {
        *self.active.borrow()
    }

    /// Waits until no consumer is registered or `timeout` elapses.
    ///
    /// Returns `true` if all consumers went down in time.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut rx = self.active.subscribe();
        let all_closed = async move { rx.wait_for(|count| *count == 0).await.is_ok() };
        tokio::time::timeout(timeout, all_closed)
            .await
            .unwrap_or(false)
    }
}

/// Registration handle held by a running consumer.
#[derive(Debug)]
pub struct ShutdownGuard {
    active: Arc<watch::Sender<usize>>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.active
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}
