//! `produce` command: send one record through the REST proxy.

use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::producer::{ProducerClient, RecordRequest};

/// Arguments of the `produce` command
#[derive(Debug, Clone, Default)]
pub struct ProduceArgs {
    /// Target topic
    pub topic: String,
    /// Record payload
    pub record: String,
    /// Record key
    pub key: Option<String>,
    /// Record headers
    pub headers: Vec<(String, String)>,
    /// Wrap the payload in a CloudEvent
    pub ce: bool,
    /// CloudEvent source
    pub source: String,
    /// CloudEvent type
    pub event_type: String,
    /// CloudEvent subject
    pub subject: Option<String>,
}

/// Builds the record request for the given arguments.
///
/// # Errors
///
/// Returns `BridgeError::InvalidArgument` if the record is blank
pub fn build_request(args: &ProduceArgs) -> Result<RecordRequest> {
    if args.record.trim().is_empty() {
        return Err(
            BridgeError::InvalidArgument("message record must not be empty".to_string()).into(),
        );
    }

    let mut request = RecordRequest::new(&args.topic, args.record.as_str());
    if let Some(key) = &args.key {
        request = request.with_key(key);
    }
    for (name, value) in &args.headers {
        request = request.with_header(name, value);
    }
    if args.ce {
        request = request.as_cloud_event(&args.source, &args.event_type);
        if let Some(subject) = &args.subject {
            request = request.with_subject(subject);
        }
    }
    Ok(request)
}

/// Produces one record and prints the delivery report as JSON
///
/// # Errors
///
/// Returns error if the arguments are invalid, the producer settings are
/// incomplete, or the REST proxy rejects the record
pub async fn run_produce(config: Config, args: ProduceArgs) -> Result<()> {
    let request = build_request(&args)?;
    config.validate_producer()?;

    let client = ProducerClient::new(config.producer).map_err(BridgeError::from)?;
    let response = client.produce(request).await.map_err(BridgeError::from)?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
