//! CloudEvents 1.0 envelopes.
//!
//! Producers wrap record payloads in a [`CloudEvent`] before sending them
//! through the REST proxy; consumers unwrap them from Kafka messages that
//! carry an `application/cloudevents+json` content type.
//!
//! # Example
//!
//! ```rust
//! use kafkabridge::cloudevents::{CloudEvent, TEXT_PLAIN};
//! use kafkabridge::payload::Payload;
//!
//! let event = CloudEvent::new("//test/src", "demo.created", None, Some(&Payload::from("hi")))
//!     .unwrap();
//! assert_eq!(event.datacontenttype.as_deref(), Some(TEXT_PLAIN));
//! assert!(!event.id.is_empty());
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::consumer::Message;
use crate::payload::{self, Payload, PayloadError, ValueType};

/// CloudEvents specification version written by this crate.
pub const SPEC_VERSION: &str = "1.0";

/// Media type for structured-mode CloudEvents in JSON.
pub const APPLICATION_CLOUDEVENTS_JSON: &str = "application/cloudevents+json";

/// Content type for JSON event data.
pub const APPLICATION_JSON: &str = "application/json";

/// Content type for text event data.
pub const TEXT_PLAIN: &str = "text/plain";

/// Name of the Kafka header carrying the content type.
pub const CONTENT_TYPE_HEADER: &str = "content-type";

/// Errors that can occur while building or extracting CloudEvents.
#[derive(Error, Debug)]
pub enum CloudEventError {
    /// Message carries no CloudEvents content type.
    #[error("Invalid content-type: value '{found}' not supported, expected application/cloudevents+json")]
    InvalidContentType {
        /// Content type found on the message (empty when missing).
        found: String,
    },

    /// Required attribute is empty.
    #[error("Missing required CloudEvent attribute: {0}")]
    MissingAttribute(&'static str),

    /// Event data could not be prepared.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// Envelope or data could not be decoded.
    #[error("CloudEvent decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// CloudEvents 1.0 envelope in structured JSON mode.
///
/// Unknown attributes are kept in `extensions` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent {
    /// Specification version.
    pub specversion: String,

    /// Unique event identifier.
    pub id: String,

    /// Context in which the event happened (URI-reference).
    pub source: String,

    /// Event type, e.g. `com.example.object.created`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Subject of the event in the context of the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// When the occurrence happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,

    /// Content type of `data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacontenttype: Option<String>,

    /// Event payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,

    /// Binary event payload, base64 encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_base64: Option<String>,

    /// Extension attributes.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, JsonValue>,
}

impl CloudEvent {
    /// Builds a new event around `data`.
    ///
    /// The id is a fresh UUID and the time is now, rounded to whole seconds.
    /// `datacontenttype` is `text/plain` for `STRING` payloads and
    /// `application/json` otherwise; without data both stay unset.
    ///
    /// # Errors
    ///
    /// Returns `CloudEventError::MissingAttribute` if `source` or
    /// `event_type` is empty.
    pub fn new(
        source: &str,
        event_type: &str,
        subject: Option<&str>,
        data: Option<&Payload>,
    ) -> Result<Self, CloudEventError> {
        if source.is_empty() {
            return Err(CloudEventError::MissingAttribute("source"));
        }
        if event_type.is_empty() {
            return Err(CloudEventError::MissingAttribute("type"));
        }

        let (datacontenttype, data) = match data {
            Some(payload) => {
                let transformed = payload::transform(payload);
                let content_type = match transformed.value_type {
                    ValueType::String => TEXT_PLAIN,
                    ValueType::Json => APPLICATION_JSON,
                };
                (Some(content_type.to_string()), Some(transformed.data))
            }
            None => (None, None),
        };

        Ok(Self {
            specversion: SPEC_VERSION.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            source: source.to_string(),
            event_type: event_type.to_string(),
            subject: subject.filter(|s| !s.is_empty()).map(str::to_string),
            time: Some(Utc::now().round_subsecs(0)),
            datacontenttype,
            data,
            data_base64: None,
            extensions: BTreeMap::new(),
        })
    }

    /// Builds a new event around any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CloudEventError::Payload` if the value cannot be converted
    /// to JSON, or `CloudEventError::MissingAttribute` as [`CloudEvent::new`].
    pub fn with_value<T: Serialize + ?Sized>(
        source: &str,
        event_type: &str,
        subject: Option<&str>,
        data: &T,
    ) -> Result<Self, CloudEventError> {
        let payload = Payload::from_serialize(data)?;
        Self::new(source, event_type, subject, Some(&payload))
    }

    /// Extracts an event from a Kafka message.
    ///
    /// # Errors
    ///
    /// Returns `CloudEventError::InvalidContentType` if the message has no
    /// `content-type` header starting with `application/cloudevents+json`,
    /// or `CloudEventError::Decode` if the value is not a valid envelope.
    pub fn from_message(message: &Message) -> Result<Self, CloudEventError> {
        let content_type = message
            .header(CONTENT_TYPE_HEADER)
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .unwrap_or_default();

        if !content_type.starts_with(APPLICATION_CLOUDEVENTS_JSON) {
            return Err(CloudEventError::InvalidContentType {
                found: content_type,
            });
        }

        Ok(serde_json::from_slice(&message.value)?)
    }

    /// Decodes `data` into a typed value.
    ///
    /// # Errors
    ///
    /// Returns `CloudEventError::Decode` if the data does not match `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, CloudEventError> {
        let data = self.data.clone().unwrap_or(JsonValue::Null);
        Ok(serde_json::from_value(data)?)
    }
}
