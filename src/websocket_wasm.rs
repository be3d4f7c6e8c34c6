//! Browser driver for the dashboard client
//!
//! Sockets are `web_sys::WebSocket`s and reconnect timers are `setTimeout`
//! handles. Callbacks push into an inbox that is drained by whichever call
//! is not already inside the client, so a handler that calls back into the
//! client is queued rather than nested.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, Event as DomEvent, MessageEvent, WebSocket};

use crate::config::ClientConfig;
use crate::core::{
    ClientInput, ClientMessage, ConnectionCallback, Listeners, RealtimeClient, Scheduler,
    SocketEvent, SocketId, TimerId, Transport,
};
use crate::error::TransportError;
use crate::status::ConnectionStatus;

/// Install panic and tracing output for the browser console.
pub fn init_browser_logging() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}

/// Origin of the current page, if there is a window
pub fn page_origin() -> Option<String> {
    web_sys::window().and_then(|w| w.location().origin().ok())
}

struct Inner {
    client: RefCell<RealtimeClient<WasmTransport, WasmScheduler>>,
    inbox: RefCell<VecDeque<ClientInput>>,
}

impl Inner {
    fn pump(&self) {
        // Already inside the client: the outer call drains the inbox.
        let Ok(mut client) = self.client.try_borrow_mut() else {
            return;
        };
        loop {
            let next = self.inbox.borrow_mut().pop_front();
            match next {
                Some(input) => client.apply(input),
                None => break,
            }
        }
    }
}

fn deliver(inner: &Weak<Inner>, input: ClientInput) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    inner.inbox.borrow_mut().push_back(input);
    inner.pump();
}

/// Browser realtime client
#[derive(Clone)]
pub struct WasmWsClient {
    inner: Rc<Inner>,
    listeners: Listeners,
}

impl WasmWsClient {
    /// Create an idle client. Without an explicit URL the endpoint is derived
    /// from the page origin.
    pub fn new(mut config: ClientConfig, on_connection_change: Option<ConnectionCallback>) -> Self {
        if config.url.is_none() {
            if let Some(origin) = page_origin() {
                config.origin = origin;
            }
        }

        let listeners = Listeners::new();
        let shared = listeners.clone();
        let inner = Rc::new_cyclic(|weak: &Weak<Inner>| {
            let mut client = RealtimeClient::new(
                config,
                WasmTransport { inner: weak.clone(), sockets: HashMap::new() },
                WasmScheduler { inner: weak.clone(), timers: HashMap::new() },
            )
            .with_listeners(shared);
            if let Some(callback) = on_connection_change {
                client = client.with_connection_callback(callback);
            }
            Inner {
                client: RefCell::new(client),
                inbox: RefCell::new(VecDeque::new()),
            }
        });

        Self { inner, listeners }
    }

    pub fn connect(&self, endpoint: Option<&str>) {
        self.submit(ClientInput::Connect(endpoint.map(str::to_string)));
    }

    pub fn disconnect(&self) {
        self.submit(ClientInput::Disconnect);
    }

    pub fn send<M: Serialize + ?Sized>(&self, message: &M) {
        match serde_json::to_value(message) {
            Ok(value) => self.submit(ClientInput::Send(value)),
            Err(e) => warn!(error = %e, "Failed to serialize outbound message"),
        }
    }

    /// Ask the server for specific update kinds.
    pub fn subscribe(&self, updates: &[&str]) {
        let updates = updates.iter().map(|u| u.to_string()).collect();
        self.send(&ClientMessage::Subscribe { updates });
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    /// Current status, or `None` while called from inside a handler
    pub fn status(&self) -> Option<ConnectionStatus> {
        self.inner.client.try_borrow().ok().map(|c| c.status())
    }

    fn submit(&self, input: ClientInput) {
        self.inner.inbox.borrow_mut().push_back(input);
        self.inner.pump();
    }
}

/// A browser socket and the callbacks wired into it. Dropping the entry
/// detaches and frees the callbacks, then closes the socket.
struct SocketEntry {
    ws: WebSocket,
    _on_open: Closure<dyn FnMut(DomEvent)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_error: Closure<dyn FnMut(DomEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
}

impl Drop for SocketEntry {
    fn drop(&mut self) {
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onerror(None);
        self.ws.set_onclose(None);
        if let Err(e) = self.ws.close() {
            warn!(error = ?e, "Failed to close WebSocket");
        }
    }
}

struct WasmTransport {
    inner: Weak<Inner>,
    sockets: HashMap<SocketId, SocketEntry>,
}

impl Transport for WasmTransport {
    fn open(&mut self, id: SocketId, url: &str) -> Result<(), TransportError> {
        let ws = WebSocket::new(url).map_err(|e| TransportError::InvalidEndpoint {
            url: url.to_string(),
            reason: format!("{e:?}"),
        })?;

        let weak = self.inner.clone();
        let on_open = Closure::wrap(Box::new(move |_: DomEvent| {
            deliver(&weak, SocketEvent::Opened(id).into());
        }) as Box<dyn FnMut(DomEvent)>);
        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));

        let weak = self.inner.clone();
        let on_message = Closure::wrap(Box::new(move |e: MessageEvent| {
            // Binary frames are not part of the protocol.
            if let Ok(txt) = e.data().dyn_into::<js_sys::JsString>() {
                deliver(&weak, SocketEvent::Frame(id, txt.into()).into());
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        // Browsers hand onerror a plain Event with no detail.
        let weak = self.inner.clone();
        let on_error = Closure::wrap(Box::new(move |e: DomEvent| {
            deliver(&weak, SocketEvent::Error(id, format!("{} event", e.type_())).into());
        }) as Box<dyn FnMut(DomEvent)>);
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        let weak = self.inner.clone();
        let on_close = Closure::wrap(Box::new(move |e: CloseEvent| {
            info!(code = e.code(), reason = %e.reason(), "WebSocket closed");
            deliver(&weak, SocketEvent::Closed(id).into());
        }) as Box<dyn FnMut(CloseEvent)>);
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        self.sockets.insert(
            id,
            SocketEntry {
                ws,
                _on_open: on_open,
                _on_message: on_message,
                _on_error: on_error,
                _on_close: on_close,
            },
        );
        Ok(())
    }

    fn send(&mut self, id: SocketId, text: String) -> Result<(), TransportError> {
        let entry = self.sockets.get(&id).ok_or(TransportError::NotOpen(id))?;
        entry
            .ws
            .send_with_str(&text)
            .map_err(|e| TransportError::Send(format!("{e:?}")))
    }

    fn close(&mut self, id: SocketId) {
        // Usually runs inside this socket's own onclose; wasm-bindgen defers
        // freeing a closure until its running invocation returns.
        if self.sockets.remove(&id).is_some() {
            debug!(socket = %id, "Released WebSocket");
        }
    }
}

/// A pending `setTimeout` and the callback it will run
struct TimerEntry {
    handle: i32,
    _callback: Closure<dyn FnMut()>,
}

struct WasmScheduler {
    inner: Weak<Inner>,
    timers: HashMap<TimerId, TimerEntry>,
}

impl WasmScheduler {
    fn clear(&mut self, id: TimerId) {
        let Some(entry) = self.timers.remove(&id) else {
            return;
        };
        if let Some(window) = web_sys::window() {
            window.clear_timeout_with_handle(entry.handle);
        }
    }
}

impl Scheduler for WasmScheduler {
    fn schedule(&mut self, id: TimerId, delay: Duration) {
        // At most one reconnect is pending; earlier entries have fired or
        // been cancelled and only hold their callbacks alive.
        let stale: Vec<TimerId> = self.timers.keys().copied().collect();
        for old in stale {
            self.clear(old);
        }

        let Some(window) = web_sys::window() else {
            error!("No window, cannot schedule reconnect");
            return;
        };

        let weak = self.inner.clone();
        let callback = Closure::wrap(Box::new(move || {
            deliver(&weak, SocketEvent::TimerFired(id).into());
        }) as Box<dyn FnMut()>);
        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        match window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            millis,
        ) {
            Ok(handle) => {
                self.timers.insert(id, TimerEntry { handle, _callback: callback });
            }
            Err(e) => error!(error = ?e, "Failed to schedule reconnect"),
        }
    }

    fn cancel(&mut self, id: TimerId) {
        self.clear(id);
    }
}
