//! Typed messages exchanged with the dashboard server

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages the client sends
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Liveness probe, answered with `pong`
    Ping,
    /// Ask for specific update kinds, answered with `subscription_confirmed`
    Subscribe { updates: Vec<String> },
}

/// Server frames the dashboard knows about.
///
/// Frames of other kinds are still dispatched, just not decodable into this enum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionEstablished {
        #[serde(default)]
        user_id: Option<i64>,
        #[serde(default)]
        message: Option<String>,
    },
    Pong {
        #[serde(default)]
        timestamp: Option<String>,
    },
    SubscriptionConfirmed {
        #[serde(default)]
        updates: Vec<String>,
    },
    GcodeUpdate {
        #[serde(default)]
        data: Value,
    },
}

/// Dispatch key of `gcode_update` frames
pub const GCODE_UPDATE: &str = "gcode_update";
/// Dispatch key of the server's connection confirmation
pub const CONNECTION_ESTABLISHED: &str = "connection_established";
