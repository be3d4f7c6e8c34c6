//! Platform-agnostic core - shared between the browser and native drivers

pub mod client;
pub mod endpoint;
pub mod frame;
pub mod io;
pub mod listeners;
pub mod messages;

pub use client::RealtimeClient;
pub use endpoint::{derive_endpoint, resolve_endpoint, DASHBOARD_WS_PATH};
pub use frame::{parse_frame, InboundFrame};
pub use io::{ClientInput, Scheduler, SocketEvent, SocketId, TimerId, Transport};
pub use listeners::{handler, ConnectionCallback, Event, EventKind, Handler, Listeners};
pub use messages::{ClientMessage, ServerMessage, CONNECTION_ESTABLISHED, GCODE_UPDATE};
