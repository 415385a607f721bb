//! `consume` command: poll a topic until timeout or interrupt.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::consumer::{
    CloudEventDumpHandler, CommandHandler, ConsumeConfig, Consumer, DumpHandler, MessageHandler,
};
use crate::error::{BridgeError, Result};

/// Arguments of the `consume` command
#[derive(Debug, Clone, Default)]
pub struct ConsumeArgs {
    /// Topic to consume from
    pub topic: String,
    /// Print messages as CloudEvents
    pub ce: bool,
    /// External handler command
    pub handler: Option<String>,
    /// Seconds to run, 0 means until interrupted
    pub timeout_secs: u64,
}

/// Picks the handler: external command first, then CloudEvent dump,
/// then plain dump.
///
/// # Errors
///
/// Returns error if the handler command is blank
pub fn select_handler(handler: Option<&str>, ce: bool) -> Result<Arc<dyn MessageHandler>> {
    match handler {
        Some(command) => {
            info!(command = %command, "Registering external handler command");
            let handler = CommandHandler::new(command).map_err(BridgeError::from)?;
            Ok(Arc::new(handler))
        }
        None if ce => Ok(Arc::new(CloudEventDumpHandler)),
        None => Ok(Arc::new(DumpHandler)),
    }
}

/// Runs the consumer until the timeout elapses or the process is
/// interrupted
///
/// # Errors
///
/// Returns error if the consumer fails before shutdown was requested
pub async fn run_consume(config: Config, args: ConsumeArgs) -> Result<()> {
    let consumer = Consumer::new(config.consumer);
    run_consume_with(consumer, args, shutdown_signal()).await
}

/// Runs `consumer` until the timeout, `interrupt`, or a consumer error
///
/// The consumer is always cancelled and awaited through its shutdown
/// barrier before returning.
///
/// # Errors
///
/// Returns error if the handler is invalid or polling fails
pub async fn run_consume_with<F>(consumer: Consumer, args: ConsumeArgs, interrupt: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    if args.topic.trim().is_empty() {
        return Err(BridgeError::InvalidArgument("topic must not be empty".to_string()).into());
    }

    let handler = select_handler(args.handler.as_deref(), args.ce)?;
    let cancel = CancellationToken::new();

    let mut poll_task = {
        let consumer = consumer.clone();
        let cancel = cancel.clone();
        let config = ConsumeConfig::new(&args.topic);
        tokio::spawn(async move { consumer.poll(cancel, config, handler).await })
    };

    let timeout = async {
        if args.timeout_secs > 0 {
            info!(
                timeout_secs = args.timeout_secs,
                "Timeout is set, consumer will terminate afterwards"
            );
            tokio::time::sleep(Duration::from_secs(args.timeout_secs)).await;
        } else {
            info!("No timeout set, running consumer until interrupted");
            std::future::pending::<()>().await;
        }
    };

    let finished = tokio::select! {
        joined = &mut poll_task => Some(joined),
        _ = timeout => {
            info!(timeout_secs = args.timeout_secs, "Timeout period exceeded, shutting down consumer");
            None
        }
        _ = interrupt => {
            info!("Interrupted, waiting for consumer shutdown");
            None
        }
    };

    cancel.cancel();
    let closed = consumer.wait_for_close().await;

    let joined = match finished {
        Some(joined) => joined,
        None if closed => poll_task.await,
        None => {
            poll_task.abort();
            return Ok(());
        }
    };

    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            warn!(error = %e, "Consumer stopped with error");
            Err(BridgeError::from(e).into())
        }
        Err(e) => Err(anyhow!("Consumer task failed: {}", e)),
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
