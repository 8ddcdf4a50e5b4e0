//! Ingest envelopes
//!
//! The front door wraps every inbound message before publishing it to the
//! ingest topic:
//!
//! ```text
//! {"writeKey": "k", "type": "page", ...}
//!     ──► {"stream_alt_id": "k", "message_type": "page", "payload": {"writeKey": "k", ...}}
//! ```
//!
//! `writeKey` takes the place of `stream_id` when both are present. Empty
//! header fields are left out. The control message asking every stage to
//! reload its rules is an envelope too.

use bytes::Bytes;
use rtdl_routing::field_str;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::EnvelopeError;

/// Envelope around one ingested message
///
/// Header fields serialize in declaration order and are omitted when unset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_alt_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    pub payload: Value,
}

impl Envelope {
    /// Parse `body` and wrap it
    ///
    /// # Errors
    ///
    /// Fails when `body` is not a JSON object.
    pub fn from_slice(body: &[u8]) -> Result<Self, EnvelopeError> {
        let message: Value = serde_json::from_slice(body).map_err(EnvelopeError::Parse)?;
        Self::wrap(message)
    }

    /// Wrap an already parsed message
    ///
    /// # Errors
    ///
    /// Fails when `message` is not a JSON object.
    pub fn wrap(message: Value) -> Result<Self, EnvelopeError> {
        if !message.is_object() {
            return Err(EnvelopeError::NotAnObject(json_kind(&message)));
        }

        let (stream_id, stream_alt_id) = match field_str(&message, "writeKey") {
            Some(write_key) => (None, Some(write_key.to_string())),
            None => (field_str(&message, "stream_id").map(str::to_string), None),
        };
        let message_type = field_str(&message, "type").map(str::to_string);

        Ok(Self {
            stream_id,
            stream_alt_id,
            message_type,
            payload: message,
        })
    }

    /// Control message carrying `code`
    ///
    /// Serializes as `{"stream_id":"","message_type":"<code>","payload":{}}`.
    pub fn control(code: &str) -> Self {
        Self {
            stream_id: Some(String::new()),
            stream_alt_id: None,
            message_type: Some(code.to_string()),
            payload: Value::Object(Map::new()),
        }
    }

    /// Serialized envelope, ready to publish
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Encode`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Bytes, EnvelopeError> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(EnvelopeError::Encode)
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
