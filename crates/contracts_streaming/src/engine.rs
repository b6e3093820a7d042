//! The streaming engine boundary and an in-process engine.
//!
//! A [`StreamingEngine`] hides the broker: it hands out messages one poll at a
//! time, accepts dead-letter records and releases its resources on close.
//! Delivery retries are the engine's own business.

use crate::{Poll, Result, StreamMessage, StreamingError};
use contracts_core::DeadLetterConfig;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use tracing::debug;

/// Boundary between the validator and a message broker.
pub trait StreamingEngine {
    /// Returns the next message, a transport error, an idle tick or the end
    /// of the stream.
    fn poll_next(&mut self) -> Poll;

    /// Forwards `message` to the dead-letter sink with the violations of
    /// its window.
    fn send_dead_letter(&mut self, message: &StreamMessage, violations: &[String]) -> Result<()>;

    /// Releases the engine. Further polls return [`Poll::Closed`].
    fn close(&mut self) -> Result<()>;
}

/// Builds the dead-letter payload for `message`.
///
/// The decoded payload is kept as is (a raw value is wrapped as
/// `{"raw_value": ...}`) and `reason_field` is set to
/// `{"violations": [...]}`.
///
/// ```rust
/// use contracts_streaming::{dead_letter_payload, StreamMessage};
/// use serde_json::json;
///
/// let msg = StreamMessage::from_json(json!({"id": null}), 0);
/// let payload = dead_letter_payload(&msg, &["ERROR: bad".to_string()], "_why");
/// assert_eq!(payload, json!({"id": null, "_why": {"violations": ["ERROR: bad"]}}));
/// ```
pub fn dead_letter_payload(message: &StreamMessage, violations: &[String], reason_field: &str) -> Value {
    let mut payload = match &message.payload {
        Some(map) => map.clone(),
        None => {
            let mut map = Map::new();
            map.insert("raw_value".to_string(), Value::String(message.value_lossy()));
            map
        }
    };
    payload.insert(
        reason_field.to_string(),
        json!({ "violations": violations }),
    );
    Value::Object(payload)
}

/// A dead-letter record captured by [`MemoryEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetterRecord {
    /// Dead-letter topic
    pub topic: String,
    /// Key of the original message
    pub key: Option<Vec<u8>>,
    /// Payload with the reason field
    pub payload: Value,
}

/// In-process engine fed from a script of poll outcomes.
///
/// Once the script runs out the engine reports [`Poll::Closed`], or
/// [`Poll::Idle`] when built with [`MemoryEngine::idle_when_drained`].
/// Dead-letter records are kept in memory.
///
/// ```rust
/// use contracts_core::DeadLetterConfig;
/// use contracts_streaming::{MemoryEngine, Poll, StreamingEngine};
/// use serde_json::json;
///
/// let mut engine = MemoryEngine::new(DeadLetterConfig::default());
/// engine.push_json(json!({"id": 1}), 1_000);
/// assert!(matches!(engine.poll_next(), Poll::Message(_)));
/// assert_eq!(engine.poll_next(), Poll::Closed);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryEngine {
    script: VecDeque<Poll>,
    dead_letter: DeadLetterConfig,
    dead_letters: Vec<DeadLetterRecord>,
    idle_when_drained: bool,
    closed: bool,
}

impl MemoryEngine {
    /// Creates an engine routing dead letters per `dead_letter`.
    pub fn new(dead_letter: DeadLetterConfig) -> Self {
        Self {
            script: VecDeque::new(),
            dead_letter,
            dead_letters: Vec::new(),
            idle_when_drained: false,
            closed: false,
        }
    }

    /// Reports idle instead of closed once the script is exhausted.
    pub fn idle_when_drained(mut self) -> Self {
        self.idle_when_drained = true;
        self
    }

    /// Appends a poll outcome to the script.
    pub fn push(&mut self, poll: Poll) {
        self.script.push_back(poll);
    }

    /// Appends a message.
    pub fn push_message(&mut self, message: StreamMessage) {
        self.push(Poll::Message(message));
    }

    /// Appends a JSON message with event time `timestamp_ms`.
    pub fn push_json(&mut self, value: Value, timestamp_ms: i64) {
        self.push_message(StreamMessage::from_json(value, timestamp_ms));
    }

    /// Appends a transport error.
    pub fn push_transport_error(&mut self, detail: impl Into<String>) {
        self.push(Poll::TransportError(detail.into()));
    }

    /// Appends an idle tick.
    pub fn push_idle(&mut self) {
        self.push(Poll::Idle);
    }

    /// Number of script entries not yet polled.
    pub fn pending(&self) -> usize {
        self.script.len()
    }

    /// Dead-letter records delivered so far.
    pub fn dead_letters(&self) -> &[DeadLetterRecord] {
        &self.dead_letters
    }

    /// Returns true once the engine has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl StreamingEngine for MemoryEngine {
    fn poll_next(&mut self) -> Poll {
        if self.closed {
            return Poll::Closed;
        }
        match self.script.pop_front() {
            Some(poll) => poll,
            None if self.idle_when_drained => Poll::Idle,
            None => Poll::Closed,
        }
    }

    fn send_dead_letter(&mut self, message: &StreamMessage, violations: &[String]) -> Result<()> {
        if self.closed {
            return Err(StreamingError::Closed);
        }
        let topic = self
            .dead_letter
            .topic
            .clone()
            .ok_or_else(|| StreamingError::dead_letter("no dead-letter topic configured"))?;
        let payload = dead_letter_payload(message, violations, &self.dead_letter.reason_field);
        debug!("Dead-lettering message at {} to '{}'", message.timestamp_ms, topic);
        self.dead_letters.push(DeadLetterRecord {
            topic,
            key: message.key.clone(),
            payload,
        });
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
