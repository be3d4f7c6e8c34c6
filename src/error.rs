//! Error types for the fallible seams of the client.
//!
//! None of these cross the public client API: the client logs them and
//! turns them into events or reconnect attempts.

use crate::core::SocketId;

/// Failure reported by a [`Transport`](crate::core::Transport)
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("socket {0} is not open")]
    NotOpen(SocketId),

    #[error("send failed: {0}")]
    Send(String),
}

/// Why an inbound text frame could not be dispatched
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotObject,

    #[error("frame has no string `type` field")]
    MissingType,
}
