//! Command-line interface definition for kafkabridge
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to produce a record and to consume a topic.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default CloudEvent source for records produced from the CLI
pub const DEFAULT_SOURCE: &str = "kafkabridge/cli";

/// Default CloudEvent type for records produced from the CLI
pub const DEFAULT_EVENT_TYPE: &str = "event.Event";

/// kafkabridge - Kafka consumer and REST proxy producer
///
/// Produce single records through a Kafka REST proxy or consume a topic,
/// with optional CloudEvents envelopes.
#[derive(Parser, Debug, Clone)]
#[command(name = "kafkabridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/kafkabridge.yaml")]
    pub config: String,

    /// Dotenv file loaded before `KAFKA_*` variables are read
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Log level, one of trace, debug, info, warn, error
    #[arg(short = 'v', long)]
    pub verbosity: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for kafkabridge
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Produce one record through the REST proxy
    Produce {
        /// Name of the target topic
        #[arg(short, long, default_value = "")]
        topic: String,

        /// Record payload to send
        #[arg(short, long)]
        record: String,

        /// Record key (a UUID is generated when omitted)
        #[arg(short, long)]
        key: Option<String>,

        /// Header formatted as key=value, can be used multiple times
        #[arg(long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// Wrap the payload in a CloudEvent
        #[arg(long)]
        ce: bool,

        /// CloudEvent source
        #[arg(long, default_value = DEFAULT_SOURCE)]
        source: String,

        /// CloudEvent type
        #[arg(long = "type", default_value = DEFAULT_EVENT_TYPE)]
        event_type: String,

        /// CloudEvent subject
        #[arg(long)]
        subject: Option<String>,
    },

    /// Consume messages from a topic
    Consume {
        /// Topic to consume from
        #[arg(short, long)]
        topic: String,

        /// Expect CloudEvents and print them
        #[arg(long)]
        ce: bool,

        /// External command receiving each payload on STDIN
        #[arg(long)]
        handler: Option<String>,

        /// Seconds to run before shutting down, 0 runs until interrupted
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
}

/// Parses a `key=value` header argument.
///
/// The value may itself contain `=`.
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("invalid header '{}', expected key=value", raw)),
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("origin=cli").unwrap(),
            ("origin".to_string(), "cli".to_string())
        );
        assert_eq!(
            parse_header("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(parse_header("novalue").is_err());
        assert!(parse_header("=value").is_err());
    }

    #[test]
    fn test_cli_parse_produce() {
        let cli = Cli::try_parse_from([
            "kafkabridge",
            "produce",
            "--topic",
            "public.hello",
            "--record",
            "Hello Hase!",
            "--header",
            "a=1",
            "--header",
            "b=2",
        ])
        .unwrap();

        if let Commands::Produce {
            topic,
            record,
            key,
            headers,
            ce,
            source,
            event_type,
            subject,
        } = cli.command
        {
            assert_eq!(topic, "public.hello");
            assert_eq!(record, "Hello Hase!");
            assert!(key.is_none());
            assert_eq!(headers.len(), 2);
            assert!(!ce);
            assert_eq!(source, DEFAULT_SOURCE);
            assert_eq!(event_type, DEFAULT_EVENT_TYPE);
            assert!(subject.is_none());
        } else {
            panic!("Expected Produce command");
        }
    }

    #[test]
    fn test_cli_parse_produce_cloud_event() {
        let cli = Cli::try_parse_from([
            "kafkabridge",
            "produce",
            "-t",
            "events",
            "-r",
            "{}",
            "--ce",
            "--source",
            "//my/app",
            "--type",
            "app.created",
            "--subject",
            "order-1",
        ])
        .unwrap();

        if let Commands::Produce {
            ce,
            source,
            event_type,
            subject,
            ..
        } = cli.command
        {
            assert!(ce);
            assert_eq!(source, "//my/app");
            assert_eq!(event_type, "app.created");
            assert_eq!(subject.as_deref(), Some("order-1"));
        } else {
            panic!("Expected Produce command");
        }
    }

    #[test]
    fn test_cli_parse_produce_invalid_header() {
        let result = Cli::try_parse_from([
            "kafkabridge",
            "produce",
            "--record",
            "x",
            "--header",
            "broken",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_consume_defaults() {
        let cli = Cli::try_parse_from(["kafkabridge", "consume", "--topic", "public.hello"]).unwrap();

        if let Commands::Consume {
            topic,
            ce,
            handler,
            timeout,
        } = cli.command
        {
            assert_eq!(topic, "public.hello");
            assert!(!ce);
            assert!(handler.is_none());
            assert_eq!(timeout, 30);
        } else {
            panic!("Expected Consume command");
        }
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "kafkabridge",
            "--config",
            "/tmp/bridge.yaml",
            "-v",
            "debug",
            "--json-logs",
            "consume",
            "--topic",
            "t",
            "--timeout",
            "0",
        ])
        .unwrap();

        assert_eq!(cli.config, "/tmp/bridge.yaml");
        assert_eq!(cli.verbosity.as_deref(), Some("debug"));
        assert!(cli.json_logs);
        assert!(cli.env_file.is_none());
    }

    #[test]
    fn test_cli_parse_defaults_and_env_file() {
        let cli = Cli::try_parse_from([
            "kafkabridge",
            "--env-file",
            "local.env",
            "consume",
            "--topic",
            "t",
        ])
        .unwrap();

        assert_eq!(cli.config, "config/kafkabridge.yaml");
        assert_eq!(cli.env_file, Some(PathBuf::from("local.env")));
    }

    #[test]
    fn test_cli_parse_missing_command() {
        assert!(Cli::try_parse_from(["kafkabridge"]).is_err());
    }
}
