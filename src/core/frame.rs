//! Inbound frame parser for dashboard socket messages
//!
//! Every server frame is a JSON object whose `type` field is the dispatch key.
//! The whole object is kept as the payload so handlers see every field.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use crate::error::FrameError;

/// A parsed server frame
#[derive(Clone, Debug, PartialEq)]
pub struct InboundFrame {
    kind: String,
    payload: Value,
}

impl InboundFrame {
    /// Value of the frame's `type` field
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The full parsed object, `type` included
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }

    /// Decode the frame into a typed message, e.g. [`ServerMessage`](super::ServerMessage).
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

/// Parse a text frame into an [`InboundFrame`].
pub fn parse_frame(text: &str) -> Result<InboundFrame, FrameError> {
    trace!(len = text.len(), "Parsing frame");

    let payload: Value = serde_json::from_str(text)?;
    let object = payload.as_object().ok_or(FrameError::NotObject)?;
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(FrameError::MissingType)?
        .to_string();

    Ok(InboundFrame { kind, payload })
}
