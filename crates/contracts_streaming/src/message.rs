//! Stream messages and poll outcomes.

use serde_json::{Map, Value};

/// A message read from a stream.
///
/// The value is decoded once on arrival. A value that is not a UTF-8 JSON
/// object leaves `payload` empty; such a message still belongs to its window
/// and is dead-lettered with it, but contributes no row to validation.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMessage {
    /// Message key
    pub key: Option<Vec<u8>>,
    /// Raw message value
    pub value: Option<Vec<u8>>,
    /// Message headers
    pub headers: Vec<(String, Vec<u8>)>,
    /// Event time in epoch milliseconds
    pub timestamp_ms: i64,
    /// Decoded JSON object, if the value is one
    pub payload: Option<Map<String, Value>>,
}

impl StreamMessage {
    /// Builds a message from raw bytes, decoding the value as a JSON object.
    pub fn from_bytes(key: Option<Vec<u8>>, value: Option<Vec<u8>>, timestamp_ms: i64) -> Self {
        let payload = value.as_deref().and_then(decode_payload);
        Self {
            key,
            value,
            headers: Vec::new(),
            timestamp_ms,
            payload,
        }
    }

    /// Builds a message whose value is the serialized `value`.
    pub fn from_json(value: Value, timestamp_ms: i64) -> Self {
        let bytes = value.to_string().into_bytes();
        let payload = match value {
            Value::Object(map) => Some(map),
            _ => None,
        };
        Self {
            key: None,
            value: Some(bytes),
            headers: Vec::new(),
            timestamp_ms,
            payload,
        }
    }

    /// Sets the message key.
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The raw value as text, replacing invalid UTF-8.
    pub fn value_lossy(&self) -> String {
        self.value
            .as_deref()
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .unwrap_or_default()
    }
}

fn decode_payload(bytes: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Outcome of one poll of a streaming engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Poll {
    /// A message arrived
    Message(StreamMessage),
    /// The transport reported an error; the stream is still usable
    TransportError(String),
    /// Nothing arrived within the poll timeout
    Idle,
    /// The stream has ended
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_bytes_decodes_objects_only() {
        let msg = StreamMessage::from_bytes(None, Some(br#"{"id": 1}"#.to_vec()), 10);
        assert_eq!(msg.payload.unwrap()["id"], json!(1));

        let msg = StreamMessage::from_bytes(None, Some(b"[1, 2]".to_vec()), 10);
        assert!(msg.payload.is_none());

        let msg = StreamMessage::from_bytes(None, Some(vec![0xff, 0xfe]), 10);
        assert!(msg.payload.is_none());
        assert_eq!(msg.value_lossy(), "\u{fffd}\u{fffd}");

        let msg = StreamMessage::from_bytes(Some(b"k".to_vec()), None, 10);
        assert!(msg.payload.is_none());
        assert_eq!(msg.value_lossy(), "");
    }

    #[test]
    fn test_from_json() {
        let msg = StreamMessage::from_json(json!({"id": 7}), 5)
            .with_key("user-7")
            .with_header("source", "web");
        assert_eq!(msg.timestamp_ms, 5);
        assert_eq!(msg.key.as_deref(), Some(b"user-7".as_slice()));
        assert_eq!(msg.headers.len(), 1);
        assert_eq!(msg.value_lossy(), r#"{"id":7}"#);
        assert!(msg.payload.is_some());
    }
}
