//! kafkabridge - Kafka consumer and REST proxy producer CLI
//!
//! Main entry point: parses arguments, loads the optional env file and the
//! configuration, initializes logging, and dispatches to the command
//! handlers.

use anyhow::Result;

use kafkabridge::cli::{Cli, Commands};
use kafkabridge::commands::{self, ConsumeArgs, ProduceArgs};
use kafkabridge::config::Config;
use kafkabridge::error::BridgeError;
use kafkabridge::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Dotenv values fill in KAFKA_* variables that are not already set
    if let Some(env_file) = &cli.env_file {
        dotenvy::from_path(env_file).map_err(|e| {
            BridgeError::Config(format!(
                "Failed to load env file {}: {}",
                env_file.display(),
                e
            ))
        })?;
    }

    // Load configuration
    let config = Config::load(&cli.config, &cli)?;

    // The configured level is only known after loading, so warnings found
    // while loading are replayed here
    logging::init_logging(&config.logging)?;
    config.emit_load_warnings();

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Produce {
            topic,
            record,
            key,
            headers,
            ce,
            source,
            event_type,
            subject,
        } => {
            tracing::info!(topic = %topic, cloud_event = ce, "Starting produce command");
            let args = ProduceArgs {
                topic,
                record,
                key,
                headers,
                ce,
                source,
                event_type,
                subject,
            };
            commands::run_produce(config, args).await?;
            Ok(())
        }
        Commands::Consume {
            topic,
            ce,
            handler,
            timeout,
        } => {
            tracing::info!(topic = %topic, "Starting consume command");
            let args = ConsumeArgs {
                topic,
                ce,
                handler,
                timeout_secs: timeout,
            };
            commands::run_consume(config, args).await?;
            Ok(())
        }
    }
}
