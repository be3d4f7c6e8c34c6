//! gcode-live - real-time update client for the G-Code dashboard
//!
//! Keeps one WebSocket open to the dashboard server, dispatches typed
//! events to registered handlers and reconnects with linear backoff:
//! - `core`: platform-agnostic state machine, listener registry, frame codec
//! - `websocket_native`: tokio-tungstenite driver (feature `cli`)
//! - `websocket_wasm`: browser driver (feature `wasm`, wasm32 only)
//! - `dashboard`: wiring to the status indicator, charts and score widget

pub mod config;
pub mod core;
pub mod dashboard;
pub mod error;
pub mod status;
pub mod time;

#[cfg(all(feature = "cli", not(target_arch = "wasm32")))]
pub mod websocket_native;

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub mod websocket_wasm;

pub use config::ClientConfig;
pub use core::{Event, EventKind, InboundFrame, Listeners, RealtimeClient};
pub use error::{FrameError, TransportError};
pub use status::ConnectionStatus;
