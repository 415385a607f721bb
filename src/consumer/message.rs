//! Kafka records as handed to message handlers.

use chrono::{DateTime, Utc};

/// A single record header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Header name.
    pub key: String,
    /// Raw header value.
    pub value: Vec<u8>,
}

impl Header {
    /// Creates a header from a name and value.
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A record read from a topic partition.
///
/// Messages are immutable once read and are moved into the handler that
/// processes them.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Topic the record was read from.
    pub topic: String,
    /// Partition within the topic.
    pub partition: i32,
    /// Offset within the partition.
    pub offset: i64,
    /// Record key, empty when the record has none.
    pub key: Vec<u8>,
    /// Record value.
    pub value: Vec<u8>,
    /// Headers in broker order.
    pub headers: Vec<Header>,
    /// Broker or producer timestamp, if present.
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// Creates a message with the given coordinates and value.
    ///
    /// # Example
    ///
    /// ```rust
    /// use kafkabridge::consumer::Message;
    ///
    /// let msg = Message::new("public.hello", 0, 42, "payload")
    ///     .with_header("content-type", "text/plain");
    /// assert_eq!(msg.header("content-type"), Some(&b"text/plain"[..]));
    /// ```
    pub fn new(topic: &str, partition: i32, offset: i64, value: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.to_string(),
            partition,
            offset,
            key: Vec::new(),
            value: value.into(),
            headers: Vec::new(),
            timestamp: None,
        }
    }

    /// Sets the record key.
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = key.into();
        self
    }

    /// Appends a header.
    pub fn with_header(mut self, key: &str, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push(Header::new(key, value));
        self
    }

    /// Returns the value of the last header named `key`.
    pub fn header(&self, key: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .rev()
            .find(|h| h.key == key)
            .map(|h| h.value.as_slice())
    }

    /// Returns the value as lossy UTF-8 text.
    pub fn value_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_prefers_last() {
        let msg = Message::new("t", 0, 1, "v")
            .with_header("content-type", "a")
            .with_header("other", "x")
            .with_header("content-type", "b");

        assert_eq!(msg.header("content-type"), Some(&b"b"[..]));
        assert_eq!(msg.header("missing"), None);
    }

    #[test]
    fn test_value_str() {
        let msg = Message::new("t", 3, 7, "Hello Hase!").with_key("k1");
        assert_eq!(msg.value_str(), "Hello Hase!");
        assert_eq!(msg.key, b"k1".to_vec());
        assert_eq!(msg.partition, 3);
        assert_eq!(msg.offset, 7);
    }
}
