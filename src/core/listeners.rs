//! Typed publish/subscribe registry for client events
//!
//! Handlers are registered per [`EventKind`] and run in insertion order.
//! The same handler may be registered more than once; it then runs once per
//! registration. Dispatch iterates over a snapshot of the list, so a handler
//! that calls `on`/`off` affects only later dispatches.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use super::InboundFrame;

/// Dispatch key of an [`Event`]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    Error,
    ReconnectFailed,
    /// Server frame with the given `type`
    Message(String),
}

impl EventKind {
    pub fn message(kind: impl Into<String>) -> Self {
        EventKind::Message(kind.into())
    }
}

/// Event delivered to handlers
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Connected { at_ms: u64 },
    Disconnected { at_ms: u64 },
    Error { message: String },
    ReconnectFailed { attempts: u32 },
    Message(InboundFrame),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Connected { .. } => EventKind::Connected,
            Event::Disconnected { .. } => EventKind::Disconnected,
            Event::Error { .. } => EventKind::Error,
            Event::ReconnectFailed { .. } => EventKind::ReconnectFailed,
            Event::Message(frame) => EventKind::message(frame.kind()),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync + 'static>;
#[cfg(target_arch = "wasm32")]
pub type Handler = Arc<dyn Fn(&Event) + 'static>;

#[cfg(not(target_arch = "wasm32"))]
pub type ConnectionCallback = Arc<dyn Fn(bool) + Send + Sync + 'static>;
#[cfg(target_arch = "wasm32")]
pub type ConnectionCallback = Arc<dyn Fn(bool) + 'static>;

/// Wrap a closure as a [`Handler`]. Keep the returned value to `off` it later.
#[cfg(not(target_arch = "wasm32"))]
pub fn handler(f: impl Fn(&Event) + Send + Sync + 'static) -> Handler {
    Arc::new(f)
}

#[cfg(target_arch = "wasm32")]
pub fn handler(f: impl Fn(&Event) + 'static) -> Handler {
    Arc::new(f)
}

fn same_handler(a: &Handler, b: &Handler) -> bool {
    // Compare data pointers only; vtable addresses are not stable across codegen units.
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Shared handler registry. Clones refer to the same registry.
#[derive(Clone, Default)]
pub struct Listeners {
    inner: Arc<Mutex<HashMap<EventKind, Vec<Handler>>>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list for `kind`.
    pub fn on(&self, kind: EventKind, handler: Handler) {
        self.inner.lock().entry(kind).or_default().push(handler);
    }

    /// Remove every registration of `handler` for `kind`.
    pub fn off(&self, kind: &EventKind, handler: &Handler) {
        let mut map = self.inner.lock();
        if let Some(list) = map.get_mut(kind) {
            list.retain(|h| !same_handler(h, handler));
            if list.is_empty() {
                map.remove(kind);
            }
        }
    }

    /// Number of registrations for `kind`
    pub fn count(&self, kind: &EventKind) -> usize {
        self.inner.lock().get(kind).map_or(0, Vec::len)
    }

    /// Run every handler registered for the event's kind.
    ///
    /// A panicking handler is logged and skipped. Returns how many handlers ran
    /// to completion.
    pub fn dispatch(&self, event: &Event) -> usize {
        let kind = event.kind();
        let snapshot: Vec<Handler> = match self.inner.lock().get(&kind) {
            Some(list) => list.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for h in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| h(event))) {
                Ok(()) => delivered += 1,
                Err(cause) => {
                    error!(kind = ?kind, cause = panic_message(&*cause), "Event handler panicked");
                }
            }
        }
        delivered
    }
}

pub(crate) fn panic_message(cause: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = cause.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
