//! Produce requests and the REST proxy records wire format.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::client::ProducerError;
use crate::cloudevents::{CloudEvent, CONTENT_TYPE_HEADER};
use crate::payload::{self, Payload, Transformed};

/// Header value announcing a structured CloudEvent.
pub const CLOUDEVENTS_CONTENT_TYPE: &str = "application/cloudevents+json; charset=UTF-8";

/// Key type used for record keys on the wire.
const BINARY_KEY_TYPE: &str = "BINARY";

/// A single record to produce.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRequest {
    /// Target topic. May be empty when the topic URL override names it.
    pub topic: String,
    /// Record key; a UUID is generated when empty.
    pub key: String,
    /// Record value.
    pub data: Payload,
    /// Record headers.
    pub headers: BTreeMap<String, String>,
    /// Wrap `data` in a CloudEvent.
    pub as_cloud_event: bool,
    /// CloudEvent source.
    pub source: String,
    /// CloudEvent type.
    pub event_type: String,
    /// CloudEvent subject.
    pub subject: String,
}

impl RecordRequest {
    /// Creates a plain request for `topic`.
    pub fn new(topic: &str, data: impl Into<Payload>) -> Self {
        Self {
            topic: topic.to_string(),
            key: String::new(),
            data: data.into(),
            headers: BTreeMap::new(),
            as_cloud_event: false,
            source: String::new(),
            event_type: String::new(),
            subject: String::new(),
        }
    }

    /// Sets the record key.
    pub fn with_key(mut self, key: &str) -> Self {
        self.key = key.to_string();
        self
    }

    /// Adds a header, replacing any previous value for `name`.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Wraps the data in a CloudEvent with the given source and type.
    pub fn as_cloud_event(mut self, source: &str, event_type: &str) -> Self {
        self.as_cloud_event = true;
        self.source = source.to_string();
        self.event_type = event_type.to_string();
        self
    }

    /// Sets the CloudEvent subject.
    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }

    /// Builds the wire body for this request.
    ///
    /// # Errors
    ///
    /// Returns `ProducerError::CloudEvent` if the envelope cannot be built.
    pub fn to_body(&self) -> Result<RecordBody, ProducerError> {
        let mut headers = self.headers.clone();

        let value = if self.as_cloud_event {
            let subject = Some(self.subject.as_str()).filter(|s| !s.is_empty());
            let event = CloudEvent::new(&self.source, &self.event_type, subject, Some(&self.data))?;
            headers.insert(
                CONTENT_TYPE_HEADER.to_string(),
                CLOUDEVENTS_CONTENT_TYPE.to_string(),
            );
            payload::transform_value(&event)?
        } else {
            payload::transform(&self.data)
        };

        let key = if self.key.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            self.key.clone()
        };

        Ok(RecordBody {
            key: KeyData {
                key_type: BINARY_KEY_TYPE.to_string(),
                data: STANDARD.encode(key.as_bytes()),
            },
            value,
            headers: headers
                .into_iter()
                .map(|(name, value)| HeaderData {
                    name,
                    value: STANDARD.encode(value.as_bytes()),
                })
                .collect(),
            timestamp: Utc::now(),
        })
    }
}

/// Record key on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyData {
    /// Always `BINARY`.
    #[serde(rename = "type")]
    pub key_type: String,
    /// Base64 encoded key.
    pub data: String,
}

/// Record header on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderData {
    /// Header name.
    pub name: String,
    /// Base64 encoded header value.
    pub value: String,
}

/// Request body for `POST .../records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordBody {
    /// Record key.
    pub key: KeyData,
    /// Record value.
    pub value: Transformed,
    /// Record headers.
    #[serde(default)]
    pub headers: Vec<HeaderData>,
    /// Client side timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Delivery report returned by the REST proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProduceResponse {
    /// Embedded status; 200 on success.
    #[serde(default)]
    pub error_code: i32,
    /// Cluster the record was written to.
    #[serde(default)]
    pub cluster_id: String,
    /// Topic the record was written to.
    #[serde(default)]
    pub topic_name: String,
    /// Partition the record was written to.
    #[serde(default)]
    pub partition_id: i32,
    /// Offset of the record.
    #[serde(default)]
    pub offset: i64,
    /// Broker timestamp as reported.
    #[serde(default)]
    pub timestamp: Option<String>,
}
