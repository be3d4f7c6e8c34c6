//! I/O seams between the client core and a platform driver
//!
//! The core never touches sockets or timers directly. A driver implements
//! [`Transport`] and [`Scheduler`], and feeds everything that happens back
//! in as [`ClientInput`] values, one at a time.

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::error::TransportError;

/// Generation number of a socket opened by the client
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SocketId(pub u64);

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a one-shot reconnect timer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Something the transport or scheduler observed
#[derive(Clone, Debug, PartialEq)]
pub enum SocketEvent {
    Opened(SocketId),
    Frame(SocketId, String),
    Error(SocketId, String),
    Closed(SocketId),
    TimerFired(TimerId),
}

/// Everything a driver can apply to the client
#[derive(Clone, Debug, PartialEq)]
pub enum ClientInput {
    Socket(SocketEvent),
    Connect(Option<String>),
    Disconnect,
    Send(Value),
}

impl From<SocketEvent> for ClientInput {
    fn from(event: SocketEvent) -> Self {
        ClientInput::Socket(event)
    }
}

/// Opens, writes to and closes duplex sockets.
///
/// `open` must not block: the outcome of the handshake is reported later
/// as [`SocketEvent::Opened`] or [`SocketEvent::Error`] + [`SocketEvent::Closed`].
/// An `Err` from `open` means no socket was created at all.
pub trait Transport {
    fn open(&mut self, id: SocketId, url: &str) -> Result<(), TransportError>;

    fn send(&mut self, id: SocketId, text: String) -> Result<(), TransportError>;

    /// Close and forget the socket. Later events for `id` may still arrive.
    fn close(&mut self, id: SocketId);
}

/// Arms and cancels one-shot timers that report back as [`SocketEvent::TimerFired`].
pub trait Scheduler {
    fn schedule(&mut self, id: TimerId, delay: Duration);

    fn cancel(&mut self, id: TimerId);
}
