//! Scoreboard message envelope.
//!
//! A message is a JSON object with a `type` discriminant and an
//! application-owned payload. The transport never interprets the payload, so
//! the envelope keeps every field it was given and round-trips losslessly.
//!
//! # Format
//!
//! ```json
//! { "type": "state", "data": { "a": 12, "b": 9 } }
//! { "type": "hello", "from": "pwa" }
//! { "type": "text", "data": "raw payload" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, from_str, to_string, to_vec};

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

const TYPE_FIELD: &str = "type";
const DATA_FIELD: &str = "data";
const FROM_FIELD: &str = "from";

// ============================================================================
// MessageKind
// ============================================================================

/// Known values of the `type` discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Full or partial scoreboard snapshot.
    State,
    /// Controller accepted a command.
    Ack,
    /// Session handshake.
    Hello,
    /// Payload that was not a JSON object.
    Text,
    /// Controller rejected a command.
    Error,
    /// Any other discriminant.
    Other(String),
}

impl MessageKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::State => "state",
            Self::Ack => "ack",
            Self::Hello => "hello",
            Self::Text => "text",
            Self::Error => "error",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for MessageKind {
    fn from(name: &str) -> Self {
        match name {
            "state" => Self::State,
            "ack" => Self::Ack,
            "hello" => Self::Hello,
            "text" => Self::Text,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Message
// ============================================================================

/// An opaque JSON message exchanged with the controller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Map<String, Value>);

// ============================================================================
// Message - Constructors
// ============================================================================

impl Message {
    /// Creates a message with only a `type` field.
    #[must_use]
    pub fn new(kind: impl Into<MessageKind>) -> Self {
        let mut fields = Map::new();
        fields.insert(
            TYPE_FIELD.to_string(),
            Value::String(kind.into().as_str().to_string()),
        );
        Self(fields)
    }

    /// Creates the session handshake `{type: "hello", from}`.
    #[inline]
    #[must_use]
    pub fn hello(from: impl Into<String>) -> Self {
        Self::new(MessageKind::Hello).with_field(FROM_FIELD, Value::String(from.into()))
    }

    /// Creates a `state` message carrying a snapshot.
    #[inline]
    #[must_use]
    pub fn state(data: Value) -> Self {
        Self::new(MessageKind::State).with_data(data)
    }

    /// Wraps a raw payload as `{type: "text", data: raw}`.
    #[inline]
    #[must_use]
    pub fn text(raw: impl Into<String>) -> Self {
        Self::new(MessageKind::Text).with_data(Value::String(raw.into()))
    }

    /// Sets the `data` field.
    #[inline]
    #[must_use]
    pub fn with_data(self, data: Value) -> Self {
        self.with_field(DATA_FIELD, data)
    }

    /// Sets an arbitrary field.
    #[inline]
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Builds a message from a JSON object.
    #[inline]
    #[must_use]
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

// ============================================================================
// Message - Accessors
// ============================================================================

impl Message {
    /// Returns the raw `type` discriminant, if present.
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.0.get(TYPE_FIELD).and_then(Value::as_str)
    }

    /// Returns the typed discriminant, if present.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<MessageKind> {
        self.type_name().map(MessageKind::from)
    }

    /// Returns `true` if the discriminant equals `kind`.
    #[inline]
    #[must_use]
    pub fn is(&self, kind: &MessageKind) -> bool {
        self.type_name() == Some(kind.as_str())
    }

    /// Returns the `data` payload.
    #[inline]
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.0.get(DATA_FIELD)
    }

    /// Returns any field.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the snapshot carried by a `state` message.
    #[must_use]
    pub fn state_snapshot(&self) -> Option<&Value> {
        if self.is(&MessageKind::State) {
            self.data()
        } else {
            None
        }
    }

    /// Returns the underlying JSON object.
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the message, returning the JSON object.
    #[inline]
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

// ============================================================================
// Message - Encoding
// ============================================================================

impl Message {
    /// Serializes to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn encode(&self) -> Result<String> {
        Ok(to_string(self)?)
    }

    /// Serializes to UTF-8 JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn encode_bytes(&self) -> Result<Vec<u8>> {
        Ok(to_vec(self)?)
    }

    /// Parses a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the text is not a JSON object.
    pub fn decode(text: &str) -> Result<Self> {
        Ok(from_str(text)?)
    }

    /// Parses inbound text, wrapping anything that is not a JSON object as a
    /// `text` message so no payload is dropped.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        match from_str::<Value>(text) {
            Ok(Value::Object(fields)) => Self(fields),
            _ => Self::text(text),
        }
    }

    /// Decodes an inbound byte payload as UTF-8 (lossy) and parses it with
    /// [`Message::from_text`].
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_text(&String::from_utf8_lossy(bytes))
    }
}

impl From<Map<String, Value>> for Message {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl From<Message> for Value {
    fn from(message: Message) -> Self {
        Value::Object(message.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
