//! Payload classification for REST proxy records.
//!
//! Every record value sent through the REST proxy is tagged either `STRING`
//! or `JSON`. This module resolves an arbitrary payload into exactly one of
//! those two forms.
//!
//! # Example
//!
//! ```rust
//! use kafkabridge::payload::{transform, Payload, ValueType};
//!
//! let transformed = transform(&Payload::from(r#"{"a":1}"#));
//! assert_eq!(transformed.value_type, ValueType::Json);
//! assert_eq!(transformed.data, serde_json::json!({"a": 1}));
//!
//! let transformed = transform(&Payload::from("hello"));
//! assert_eq!(transformed.value_type, ValueType::String);
//! ```

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Errors that can occur while preparing a payload.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// The value cannot be represented as JSON.
    #[error("Payload cannot be serialized as JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Record payload before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Text, possibly containing a JSON document.
    Text(String),
    /// Raw bytes.
    Raw(Vec<u8>),
    /// Already structured JSON value.
    Structured(JsonValue),
}

impl Payload {
    /// Builds a payload from any serializable value.
    ///
    /// Strings end up as [`Payload::Text`] so that JSON text is detected
    /// the same way regardless of how the caller passed it in.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::Serialize` if the value cannot be converted
    /// to JSON (for example a map with non-string keys).
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, PayloadError> {
        match serde_json::to_value(value)? {
            JsonValue::String(text) => Ok(Self::Text(text)),
            other => Ok(Self::Structured(other)),
        }
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self::Raw(value)
    }
}

impl From<JsonValue> for Payload {
    fn from(value: JsonValue) -> Self {
        Self::Structured(value)
    }
}

/// Value type tag understood by the REST proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValueType {
    /// Plain string value.
    String,
    /// Native JSON value.
    Json,
}

impl ValueType {
    /// Returns the wire name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Json => "JSON",
        }
    }
}

/// Classified payload, serializes as `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformed {
    /// Value type tag.
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Wire-ready data.
    pub data: JsonValue,
}

/// Classifies a payload as `STRING` or `JSON`.
///
/// Text that parses as JSON is returned as the parsed structure so it is
/// re-serialized natively instead of as a quoted string. Raw bytes are
/// encoded the way a JSON encoder writes byte buffers (standard base64).
pub fn transform(payload: &Payload) -> Transformed {
    match payload {
        Payload::Text(text) => match serde_json::from_str::<JsonValue>(text) {
            Ok(parsed) => Transformed {
                value_type: ValueType::Json,
                data: parsed,
            },
            Err(_) => Transformed {
                value_type: ValueType::String,
                data: JsonValue::String(text.clone()),
            },
        },
        Payload::Raw(bytes) => Transformed {
            value_type: ValueType::Json,
            data: JsonValue::String(base64::engine::general_purpose::STANDARD.encode(bytes)),
        },
        Payload::Structured(value) => Transformed {
            value_type: ValueType::Json,
            data: value.clone(),
        },
    }
}

/// Classifies any serializable value.
///
/// # Errors
///
/// Returns `PayloadError::Serialize` if the value cannot be converted to JSON.
pub fn transform_value<T: Serialize + ?Sized>(value: &T) -> Result<Transformed, PayloadError> {
    Ok(transform(&Payload::from_serialize(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct Sample {
        a: i32,
    }

    #[test]
    fn test_json_text_is_parsed() {
        let result = transform(&Payload::from(r#"{"a":1}"#));
        assert_eq!(result.value_type, ValueType::Json);
        assert_eq!(result.data, serde_json::json!({"a": 1}));
    }

    #[test]
    fn test_plain_text_stays_string() {
        let result = transform(&Payload::from("hello"));
        assert_eq!(result.value_type, ValueType::String);
        assert_eq!(result.data, JsonValue::String("hello".to_string()));
    }

    #[test]
    fn test_struct_is_json() {
        let result = transform_value(&Sample { a: 5 }).unwrap();
        assert_eq!(result.value_type, ValueType::Json);
        assert_eq!(
            serde_json::to_string(&result.data).unwrap(),
            serde_json::to_string(&Sample { a: 5 }).unwrap()
        );
    }

    #[test]
    fn test_string_value_routes_through_text() {
        let result = transform_value("Hello Hase!").unwrap();
        assert_eq!(result.value_type, ValueType::String);

        let result = transform_value(&r#"{"message":"Hello Franz!"}"#.to_string()).unwrap();
        assert_eq!(result.value_type, ValueType::Json);
        assert_eq!(result.data["message"], "Hello Franz!");
    }

    #[test]
    fn test_raw_bytes_are_base64() {
        let result = transform(&Payload::Raw(b"foobar".to_vec()));
        assert_eq!(result.value_type, ValueType::Json);
        assert_eq!(result.data, JsonValue::String("Zm9vYmFy".to_string()));
    }

    #[test]
    fn test_transform_is_deterministic_and_pure() {
        let payload = Payload::from("not { json");
        let first = transform(&payload);
        let second = transform(&payload);
        assert_eq!(first, second);
        assert_eq!(payload, Payload::from("not { json"));
    }

    #[test]
    fn test_non_string_map_keys_fail() {
        let mut map = HashMap::new();
        map.insert(vec![1u8], "value");
        assert!(matches!(
            transform_value(&map),
            Err(PayloadError::Serialize(_))
        ));
    }

    #[test]
    fn test_transformed_wire_shape() {
        let result = transform(&Payload::from("hi"));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"type": "STRING", "data": "hi"}));
    }
}
