//! Realtime dashboard client state machine
//!
//! Owns the connection status, the reconnect counter and the listener
//! registry. It never blocks and never performs I/O itself: sockets go
//! through a [`Transport`], reconnect timers through a [`Scheduler`], and a
//! driver feeds the resulting [`SocketEvent`]s back in via [`RealtimeClient::handle`].
//!
//! Reconnect backoff is linear: after the `n`-th unplanned close the client
//! waits `n * reconnect_delay` and tries again, up to `max_reconnect_attempts`.

use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::endpoint::resolve_endpoint;
use super::frame::parse_frame;
use super::io::{ClientInput, Scheduler, SocketEvent, SocketId, TimerId, Transport};
use super::listeners::{panic_message, ConnectionCallback, Event, Listeners};
use super::messages::ClientMessage;
use crate::config::ClientConfig;
use crate::status::ConnectionStatus;
use crate::time::now_millis;

pub struct RealtimeClient<T: Transport, S: Scheduler> {
    config: ClientConfig,
    transport: T,
    scheduler: S,
    listeners: Listeners,
    on_connection_change: Option<ConnectionCallback>,

    endpoint: Option<String>,
    socket: Option<SocketId>,
    status: ConnectionStatus,
    reconnect_attempts: u32,
    pending_timer: Option<TimerId>,
    next_socket: u64,
    next_timer: u64,
}

impl<T: Transport, S: Scheduler> RealtimeClient<T, S> {
    /// Create an idle client. Nothing is opened until [`connect`](Self::connect).
    pub fn new(config: ClientConfig, transport: T, scheduler: S) -> Self {
        let endpoint = config.url.clone();
        Self {
            config,
            transport,
            scheduler,
            listeners: Listeners::new(),
            on_connection_change: None,
            endpoint,
            socket: None,
            status: ConnectionStatus::Disconnected,
            reconnect_attempts: 0,
            pending_timer: None,
            next_socket: 0,
            next_timer: 0,
        }
    }

    /// Invoke `callback` with the new connectivity on every connect/disconnect.
    pub fn with_connection_callback(mut self, callback: ConnectionCallback) -> Self {
        self.on_connection_change = Some(callback);
        self
    }

    /// Share an existing registry instead of the client's own.
    pub fn with_listeners(mut self, listeners: Listeners) -> Self {
        self.listeners = listeners;
        self
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Endpoint of the current or last connection attempt
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Open the socket, unless one is already opening or open.
    ///
    /// `endpoint` overrides and replaces the configured URL. Open failures are
    /// not returned; they go down the reconnect path.
    pub fn connect(&mut self, endpoint: Option<&str>) {
        if self.status.is_active() {
            warn!(status = %self.status, "Already connected, ignoring connect");
            return;
        }

        if let Some(timer) = self.pending_timer.take() {
            self.scheduler.cancel(timer);
        }

        let url = resolve_endpoint(endpoint, self.endpoint.as_deref(), &self.config.origin);
        self.endpoint = Some(url.clone());

        let id = SocketId(self.next_socket);
        self.next_socket += 1;

        info!(url = %url, socket = %id, "Connecting to dashboard socket");
        self.status = ConnectionStatus::Connecting;

        match self.transport.open(id, &url) {
            Ok(()) => self.socket = Some(id),
            Err(e) => {
                error!(error = %e, url = %url, "Failed to open socket");
                self.status = ConnectionStatus::Disconnected;
                self.schedule_reconnect();
            }
        }
    }

    /// Close the socket and stop reconnecting. Safe to call repeatedly.
    ///
    /// A deliberate disconnect is not a failure: the close of the released
    /// socket is ignored, so no `reconnect_failed` event follows.
    pub fn disconnect(&mut self) {
        self.reconnect_attempts = self.config.max_reconnect_attempts;

        if let Some(timer) = self.pending_timer.take() {
            debug!(timer = %timer, "Cancelling pending reconnect");
            self.scheduler.cancel(timer);
        }

        let Some(id) = self.socket.take() else {
            return;
        };

        info!(socket = %id, "Disconnecting");
        self.transport.close(id);
        self.status = ConnectionStatus::Disconnected;
        self.notify_connection(false);
        self.listeners.dispatch(&Event::Disconnected { at_ms: now_millis() });
    }

    /// Serialize and send `message` if connected; otherwise drop it.
    pub fn send<M: Serialize + ?Sized>(&mut self, message: &M) {
        let id = match (self.status, self.socket) {
            (ConnectionStatus::Connected, Some(id)) => id,
            _ => {
                warn!(status = %self.status, "Socket not connected, message dropped");
                return;
            }
        };

        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to serialize outbound message");
                return;
            }
        };

        debug!(socket = %id, len = text.len(), "Sending message");
        if let Err(e) = self.transport.send(id, text) {
            warn!(error = %e, socket = %id, "Failed to send message");
        }
    }

    /// Ask the server for specific update kinds.
    pub fn subscribe(&mut self, updates: &[&str]) {
        let updates = updates.iter().map(|u| u.to_string()).collect();
        self.send(&ClientMessage::Subscribe { updates });
    }

    /// Apply a driver input.
    pub fn apply(&mut self, input: ClientInput) {
        match input {
            ClientInput::Socket(event) => self.handle(event),
            ClientInput::Connect(url) => self.connect(url.as_deref()),
            ClientInput::Disconnect => self.disconnect(),
            ClientInput::Send(value) => self.send(&value),
        }
    }

    /// Feed a socket or timer event into the state machine.
    pub fn handle(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::TimerFired(timer) => self.handle_timer(timer),
            SocketEvent::Opened(id) if self.is_current(id) => self.handle_open(id),
            SocketEvent::Frame(id, text) if self.is_current(id) => self.handle_frame(id, &text),
            SocketEvent::Error(id, message) if self.is_current(id) => {
                self.handle_error(id, message)
            }
            SocketEvent::Closed(id) if self.is_current(id) => self.handle_close(id),
            stale => debug!(event = ?stale, "Ignoring event from released socket"),
        }
    }

    fn is_current(&self, id: SocketId) -> bool {
        self.socket == Some(id)
    }

    fn handle_open(&mut self, id: SocketId) {
        if self.status != ConnectionStatus::Connecting {
            debug!(socket = %id, status = %self.status, "Duplicate open ignored");
            return;
        }

        info!(socket = %id, "Dashboard socket connected");
        self.status = ConnectionStatus::Connected;
        self.reconnect_attempts = 0;

        self.notify_connection(true);
        self.listeners.dispatch(&Event::Connected { at_ms: now_millis() });

        self.send(&ClientMessage::Ping);
    }

    fn handle_frame(&mut self, id: SocketId, text: &str) {
        if self.status != ConnectionStatus::Connected {
            debug!(socket = %id, status = %self.status, "Frame before open dropped");
            return;
        }

        match parse_frame(text) {
            Ok(frame) => {
                debug!(socket = %id, kind = frame.kind(), "Frame received");
                self.listeners.dispatch(&Event::Message(frame));
            }
            Err(e) => warn!(error = %e, socket = %id, "Dropping malformed frame"),
        }
    }

    fn handle_error(&mut self, id: SocketId, message: String) {
        error!(socket = %id, error = %message, "Socket error");
        self.listeners.dispatch(&Event::Error { message });
    }

    fn handle_close(&mut self, id: SocketId) {
        info!(socket = %id, "Dashboard socket disconnected");
        self.socket = None;
        self.transport.close(id);
        self.status = ConnectionStatus::Disconnected;

        self.notify_connection(false);
        self.listeners.dispatch(&Event::Disconnected { at_ms: now_millis() });

        self.schedule_reconnect();
    }

    fn handle_timer(&mut self, timer: TimerId) {
        if self.pending_timer != Some(timer) {
            debug!(timer = %timer, "Ignoring stale reconnect timer");
            return;
        }
        self.pending_timer = None;
        self.connect(None);
    }

    fn schedule_reconnect(&mut self) {
        let max = self.config.max_reconnect_attempts;
        if self.reconnect_attempts >= max {
            error!(attempts = self.reconnect_attempts, "Max reconnection attempts reached");
            self.listeners.dispatch(&Event::ReconnectFailed { attempts: self.reconnect_attempts });
            return;
        }

        self.reconnect_attempts += 1;
        let delay = self.config.reconnect_delay() * self.reconnect_attempts;

        let timer = TimerId(self.next_timer);
        self.next_timer += 1;

        info!(
            delay_ms = delay.as_millis() as u64,
            attempt = self.reconnect_attempts,
            max,
            "Scheduling reconnect"
        );
        if let Some(previous) = self.pending_timer.replace(timer) {
            self.scheduler.cancel(previous);
        }
        self.scheduler.schedule(timer, delay);
    }

    fn notify_connection(&self, connected: bool) {
        let Some(callback) = &self.on_connection_change else {
            return;
        };
        if let Err(cause) = panic::catch_unwind(AssertUnwindSafe(|| callback(connected))) {
            error!(connected, cause = panic_message(&*cause), "Connection callback panicked");
        }
    }
}

impl<T: Transport, S: Scheduler> Drop for RealtimeClient<T, S> {
    fn drop(&mut self) {
        if let Some(timer) = self.pending_timer.take() {
            self.scheduler.cancel(timer);
        }
        if let Some(id) = self.socket.take() {
            self.transport.close(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{handler, EventKind};
    use crate::error::TransportError;
    use parking_lot::Mutex;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct Wire {
        opened: Vec<(SocketId, String)>,
        sent: Vec<(SocketId, String)>,
        closed: Vec<SocketId>,
        refuse_open: bool,
        scheduled: Vec<(TimerId, Duration)>,
        cancelled: Vec<TimerId>,
    }

    #[derive(Clone, Default)]
    struct MockIo(Rc<RefCell<Wire>>);

    impl Transport for MockIo {
        fn open(&mut self, id: SocketId, url: &str) -> Result<(), TransportError> {
            let mut wire = self.0.borrow_mut();
            if wire.refuse_open {
                return Err(TransportError::InvalidEndpoint {
                    url: url.to_string(),
                    reason: "refused".into(),
                });
            }
            wire.opened.push((id, url.to_string()));
            Ok(())
        }

        fn send(&mut self, id: SocketId, text: String) -> Result<(), TransportError> {
            self.0.borrow_mut().sent.push((id, text));
            Ok(())
        }

        fn close(&mut self, id: SocketId) {
            self.0.borrow_mut().closed.push(id);
        }
    }

    impl Scheduler for MockIo {
        fn schedule(&mut self, id: TimerId, delay: Duration) {
            self.0.borrow_mut().scheduled.push((id, delay));
        }

        fn cancel(&mut self, id: TimerId) {
            self.0.borrow_mut().cancelled.push(id);
        }
    }

    type TestClient = RealtimeClient<MockIo, MockIo>;

    fn client(config: ClientConfig) -> (TestClient, MockIo) {
        let io = MockIo::default();
        (RealtimeClient::new(config, io.clone(), io.clone()), io)
    }

    fn fast_config() -> ClientConfig {
        ClientConfig::default()
            .with_max_reconnect_attempts(3)
            .with_reconnect_delay_ms(1000)
            .with_origin("https://gcode.example")
    }

    fn last_socket(io: &MockIo) -> SocketId {
        io.0.borrow().opened.last().expect("no socket opened").0
    }

    fn last_timer(io: &MockIo) -> TimerId {
        io.0.borrow().scheduled.last().expect("no timer scheduled").0
    }

    fn delays(io: &MockIo) -> Vec<u128> {
        io.0.borrow().scheduled.iter().map(|(_, d)| d.as_millis()).collect()
    }

    fn counter(client: &TestClient, kind: EventKind) -> Arc<Mutex<Vec<Event>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        client.listeners().on(kind, handler(move |e| sink.lock().push(e.clone())));
        seen
    }

    /// Connect and open, returning the open socket
    fn open(client: &mut TestClient, io: &MockIo) -> SocketId {
        client.connect(None);
        let id = last_socket(io);
        client.handle(SocketEvent::Opened(id));
        id
    }

    /// Fire the most recent reconnect timer and let the socket fail
    fn fail_next_attempt(client: &mut TestClient, io: &MockIo) {
        client.handle(SocketEvent::TimerFired(last_timer(io)));
        let id = last_socket(io);
        client.handle(SocketEvent::Error(id, "connection refused".into()));
        client.handle(SocketEvent::Closed(id));
    }

    #[test]
    fn test_new_has_no_side_effects() {
        let (client, io) = client(fast_config());
        assert_eq!(client.status(), ConnectionStatus::Disconnected);
        assert_eq!(client.endpoint(), None);
        let wire = io.0.borrow();
        assert!(wire.opened.is_empty());
        assert!(wire.scheduled.is_empty());
    }

    #[test]
    fn test_connect_derives_endpoint_from_origin() {
        let (mut client, io) = client(fast_config());
        client.connect(None);
        assert_eq!(client.status(), ConnectionStatus::Connecting);
        assert_eq!(client.endpoint(), Some("wss://gcode.example/ws/dashboard/"));
        assert_eq!(io.0.borrow().opened[0].1, "wss://gcode.example/ws/dashboard/");
    }

    #[test]
    fn test_explicit_endpoint_is_remembered_for_reconnects() {
        let (mut client, io) = client(fast_config());
        client.connect(Some("ws://override:9000/ws/dashboard/"));
        client.handle(SocketEvent::Closed(last_socket(&io)));
        client.handle(SocketEvent::TimerFired(last_timer(&io)));

        let wire = io.0.borrow();
        assert_eq!(wire.opened.len(), 2);
        assert_eq!(wire.opened[1].1, "ws://override:9000/ws/dashboard/");
    }

    #[test]
    fn test_connect_while_active_is_noop() {
        let (mut client, io) = client(fast_config());
        client.connect(None);
        client.connect(None);
        assert_eq!(io.0.borrow().opened.len(), 1);

        client.handle(SocketEvent::Opened(last_socket(&io)));
        client.connect(Some("ws://elsewhere/"));
        assert_eq!(io.0.borrow().opened.len(), 1);
        assert_eq!(client.endpoint(), Some("wss://gcode.example/ws/dashboard/"));
    }

    #[test]
    fn test_open_sends_ping_and_notifies_callback_first() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let order_cb = order.clone();
        let (client, io) = client(fast_config());
        let mut client = client.with_connection_callback(Arc::new(move |connected: bool| {
            order_cb.lock().push(format!("callback:{connected}"));
        }));
        let order_ev = order.clone();
        client.listeners().on(
            EventKind::Connected,
            handler(move |_| order_ev.lock().push("event:connected".to_string())),
        );

        let id = open(&mut client, &io);

        assert!(client.is_connected());
        assert_eq!(*order.lock(), vec!["callback:true", "event:connected"]);
        assert_eq!(io.0.borrow().sent, vec![(id, r#"{"type":"ping"}"#.to_string())]);
    }

    #[test]
    fn test_linear_backoff_then_reconnect_failed() {
        let (mut client, io) = client(fast_config());
        let failed = counter(&client, EventKind::ReconnectFailed);

        let id = open(&mut client, &io);
        client.handle(SocketEvent::Closed(id));
        fail_next_attempt(&mut client, &io);
        fail_next_attempt(&mut client, &io);
        assert_eq!(delays(&io), vec![1000, 2000, 3000]);
        assert!(failed.lock().is_empty());

        fail_next_attempt(&mut client, &io);
        assert_eq!(delays(&io), vec![1000, 2000, 3000]);
        assert_eq!(*failed.lock(), vec![Event::ReconnectFailed { attempts: 3 }]);
        assert_eq!(client.reconnect_attempts(), 3);
        assert_eq!(client.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_attempts_track_consecutive_closes_up_to_ceiling() {
        let (mut client, io) = client(fast_config());
        let id = open(&mut client, &io);
        client.handle(SocketEvent::Closed(id));
        assert_eq!(client.reconnect_attempts(), 1);

        for expected in [2, 3, 3, 3] {
            client.handle(SocketEvent::TimerFired(last_timer(&io)));
            client.handle(SocketEvent::Closed(last_socket(&io)));
            assert_eq!(client.reconnect_attempts(), expected);
        }
    }

    #[test]
    fn test_disconnect_cancels_pending_timer() {
        let (mut client, io) = client(fast_config());
        let id = open(&mut client, &io);
        client.handle(SocketEvent::Closed(id));
        let timer = last_timer(&io);

        client.disconnect();
        assert_eq!(io.0.borrow().cancelled, vec![timer]);
        assert_eq!(client.reconnect_attempts(), 3);

        // A fire that raced the cancellation must not reconnect.
        client.handle(SocketEvent::TimerFired(timer));
        assert_eq!(io.0.borrow().opened.len(), 1);
        assert_eq!(client.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_disconnect_releases_socket_and_ignores_its_close() {
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        let (client, io) = client(fast_config());
        let mut client =
            client.with_connection_callback(Arc::new(move |c: bool| sink.lock().push(c)));
        let failed = counter(&client, EventKind::ReconnectFailed);
        let disconnected = counter(&client, EventKind::Disconnected);

        let id = open(&mut client, &io);
        client.disconnect();
        client.disconnect();
        client.handle(SocketEvent::Closed(id));

        assert_eq!(io.0.borrow().closed, vec![id]);
        assert_eq!(*changes.lock(), vec![true, false]);
        assert_eq!(disconnected.lock().len(), 1);
        assert!(io.0.borrow().scheduled.is_empty());
        // Attempts sit at the ceiling, yet a deliberate disconnect does not report exhaustion.
        assert_eq!(client.reconnect_attempts(), 3);
        assert!(failed.lock().is_empty(), "disconnect must not emit reconnect_failed");
    }

    #[test]
    fn test_every_released_socket_is_closed_through_transport() {
        let (mut client, io) = client(fast_config());
        let mut released = Vec::new();
        let mut id = open(&mut client, &io);

        // Each reopen resets the budget, so this could go on forever.
        for _ in 0..6 {
            client.handle(SocketEvent::Closed(id));
            released.push(id);
            client.handle(SocketEvent::TimerFired(last_timer(&io)));
            id = last_socket(&io);
            client.handle(SocketEvent::Opened(id));
            assert_eq!(client.reconnect_attempts(), 0);
        }
        assert_eq!(io.0.borrow().closed, released);

        client.disconnect();
        released.push(id);
        assert_eq!(io.0.borrow().closed, released);
    }

    #[test]
    fn test_send_while_disconnected_writes_nothing() {
        let (mut client, io) = client(fast_config());
        client.send(&serde_json::json!({"type": "subscribe"}));
        client.connect(None);
        client.send(&ClientMessage::Ping);
        assert!(io.0.borrow().sent.is_empty());
    }

    #[test]
    fn test_subscribe_when_connected() {
        let (mut client, io) = client(fast_config());
        let id = open(&mut client, &io);
        client.subscribe(&["gcode_update"]);
        assert_eq!(
            io.0.borrow().sent.last(),
            Some(&(id, r#"{"type":"subscribe","updates":["gcode_update"]}"#.to_string()))
        );
    }

    #[test]
    fn test_duplicate_handler_fires_twice_in_order() {
        let (mut client, io) = client(fast_config());
        let order = Arc::new(Mutex::new(Vec::new()));
        let first = {
            let order = order.clone();
            handler(move |_| order.lock().push("first"))
        };
        let second = {
            let order = order.clone();
            handler(move |_| order.lock().push("second"))
        };
        let kind = EventKind::message("gcode_update");
        client.listeners().on(kind.clone(), first.clone());
        client.listeners().on(kind.clone(), second);
        client.listeners().on(kind, first);

        let id = open(&mut client, &io);
        client.handle(SocketEvent::Frame(id, r#"{"type":"gcode_update","data":{}}"#.into()));
        assert_eq!(*order.lock(), vec!["first", "second", "first"]);
    }

    #[test]
    fn test_panicking_handler_does_not_block_later_handler() {
        let (mut client, io) = client(fast_config());
        let kind = EventKind::message("gcode_update");
        client.listeners().on(kind.clone(), handler(|_| panic!("broken chart")));
        let seen = counter(&client, kind);

        let id = open(&mut client, &io);
        client.handle(SocketEvent::Frame(id, r#"{"type":"gcode_update","g_code_score":81}"#.into()));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        match &seen[0] {
            Event::Message(frame) => assert_eq!(frame.get("g_code_score"), Some(&serde_json::json!(81))),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_frame_dispatches_only_to_its_type() {
        let (mut client, io) = client(fast_config());
        let ack = counter(&client, EventKind::message("connected_ack"));
        let other = counter(&client, EventKind::message("gcode_update"));
        let connected = counter(&client, EventKind::Connected);

        let id = open(&mut client, &io);
        client.handle(SocketEvent::Frame(id, r#"{"type":"connected_ack","x":1}"#.into()));

        assert_eq!(ack.lock().len(), 1);
        assert!(other.lock().is_empty());
        assert_eq!(connected.lock().len(), 1);
    }

    #[test]
    fn test_malformed_frame_is_dropped() {
        let (mut client, io) = client(fast_config());
        let seen = counter(&client, EventKind::message("gcode_update"));
        let id = open(&mut client, &io);

        client.handle(SocketEvent::Frame(id, "{\"type\":\"gcode_update\"".into()));
        client.handle(SocketEvent::Frame(id, r#"{"kind":"gcode_update"}"#.into()));

        assert!(seen.lock().is_empty());
        assert!(client.is_connected());
        assert!(io.0.borrow().closed.is_empty());
    }

    #[test]
    fn test_error_event_does_not_change_state() {
        let (mut client, io) = client(fast_config());
        let errors = counter(&client, EventKind::Error);
        let id = open(&mut client, &io);

        client.handle(SocketEvent::Error(id, "broken pipe".into()));
        assert!(client.is_connected());
        assert_eq!(*errors.lock(), vec![Event::Error { message: "broken pipe".into() }]);
        assert!(io.0.borrow().scheduled.is_empty());
    }

    #[test]
    fn test_successful_reopen_resets_backoff() {
        let (mut client, io) = client(fast_config());
        let id = open(&mut client, &io);
        client.handle(SocketEvent::Closed(id));
        fail_next_attempt(&mut client, &io);
        fail_next_attempt(&mut client, &io);
        assert_eq!(client.reconnect_attempts(), 3);

        client.handle(SocketEvent::TimerFired(last_timer(&io)));
        let id = last_socket(&io);
        client.handle(SocketEvent::Opened(id));
        assert_eq!(client.reconnect_attempts(), 0);

        client.handle(SocketEvent::Closed(id));
        fail_next_attempt(&mut client, &io);
        fail_next_attempt(&mut client, &io);
        assert_eq!(delays(&io), vec![1000, 2000, 3000, 1000, 2000, 3000]);
    }

    #[test]
    fn test_open_failure_takes_reconnect_path() {
        let (mut client, io) = client(fast_config());
        let disconnected = counter(&client, EventKind::Disconnected);
        io.0.borrow_mut().refuse_open = true;

        client.connect(Some("not a url"));
        assert_eq!(client.status(), ConnectionStatus::Disconnected);
        assert_eq!(client.reconnect_attempts(), 1);
        assert_eq!(delays(&io), vec![1000]);
        assert!(disconnected.lock().is_empty());
    }

    #[test]
    fn test_manual_connect_after_exhaustion_keeps_counter() {
        let (mut client, io) = client(fast_config().with_max_reconnect_attempts(1));
        let failed = counter(&client, EventKind::ReconnectFailed);

        let id = open(&mut client, &io);
        client.handle(SocketEvent::Closed(id));
        fail_next_attempt(&mut client, &io);
        assert_eq!(failed.lock().len(), 1);

        client.connect(None);
        assert_eq!(client.status(), ConnectionStatus::Connecting);
        client.handle(SocketEvent::Closed(last_socket(&io)));
        assert_eq!(failed.lock().len(), 2);
        assert_eq!(delays(&io), vec![1000]);
    }

    #[test]
    fn test_manual_connect_cancels_pending_timer() {
        let (mut client, io) = client(fast_config());
        let id = open(&mut client, &io);
        client.handle(SocketEvent::Closed(id));
        let timer = last_timer(&io);

        client.connect(None);
        assert_eq!(io.0.borrow().cancelled, vec![timer]);

        client.handle(SocketEvent::TimerFired(timer));
        assert_eq!(io.0.borrow().opened.len(), 2);
    }

    #[test]
    fn test_apply_routes_commands() {
        let (mut client, io) = client(fast_config());
        client.apply(ClientInput::Connect(Some("ws://cmd/ws/dashboard/".into())));
        let id = last_socket(&io);
        client.apply(SocketEvent::Opened(id).into());
        client.apply(ClientInput::Send(serde_json::json!({"type": "ping"})));
        client.apply(ClientInput::Disconnect);

        let wire = io.0.borrow();
        assert_eq!(wire.opened[0].1, "ws://cmd/ws/dashboard/");
        assert_eq!(wire.sent.len(), 2);
        assert_eq!(wire.closed, vec![id]);
    }
}
