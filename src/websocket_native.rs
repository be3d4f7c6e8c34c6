//! Native driver for the dashboard client
//!
//! Runs [`RealtimeClient`] in a background thread on a single-threaded tokio
//! runtime. Socket tasks, reconnect timers and [`ClientHandle`] commands all
//! post into one channel, so the client sees one input at a time.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::core::{
    ClientInput, ClientMessage, ConnectionCallback, Listeners, RealtimeClient, Scheduler,
    SocketEvent, SocketId, TimerId, Transport,
};
use crate::error::TransportError;
use crate::status::ConnectionStatus;

enum DriverInput {
    Client(ClientInput),
    Shutdown,
}

type Inbox = UnboundedSender<DriverInput>;

fn post(inbox: &Inbox, event: SocketEvent) {
    // The driver is gone once the receiver drops; nothing left to notify.
    let _ = inbox.send(DriverInput::Client(ClientInput::Socket(event)));
}

/// Observable state mirrored out of the driver thread
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub status: ConnectionStatus,
    pub reconnect_attempts: u32,
    pub endpoint: Option<String>,
}

/// Cloneable, thread-safe handle to a running driver
#[derive(Clone)]
pub struct ClientHandle {
    inbox: Inbox,
    listeners: Listeners,
    snapshot: Arc<Mutex<ConnectionSnapshot>>,
}

impl ClientHandle {
    /// Connect, optionally to an explicit endpoint.
    pub fn connect(&self, endpoint: Option<&str>) {
        self.submit(ClientInput::Connect(endpoint.map(str::to_string)));
    }

    pub fn disconnect(&self) {
        self.submit(ClientInput::Disconnect);
    }

    /// Queue a message; it is dropped if the socket is not connected when the driver gets to it.
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

    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.snapshot.lock().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.snapshot.lock().status
    }

    fn submit(&self, input: ClientInput) {
        if self.inbox.send(DriverInput::Client(input)).is_err() {
            warn!("Client driver has stopped, command dropped");
        }
    }
}

/// Native client that runs in a background thread
pub struct NativeWsClient {
    handle: ClientHandle,
    thread: Option<JoinHandle<()>>,
}

impl NativeWsClient {
    /// Start the driver thread. No socket is opened until [`ClientHandle::connect`].
    pub fn spawn(config: ClientConfig, on_connection_change: Option<ConnectionCallback>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let listeners = Listeners::new();
        let snapshot = Arc::new(Mutex::new(ConnectionSnapshot {
            endpoint: config.url.clone(),
            ..ConnectionSnapshot::default()
        }));

        let handle = ClientHandle {
            inbox: tx.clone(),
            listeners: listeners.clone(),
            snapshot: snapshot.clone(),
        };

        let thread = std::thread::Builder::new()
            .name("gcode-live-driver".into())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!(error = %e, "Failed to create tokio runtime");
                        return;
                    }
                };
                rt.block_on(async move {
                    let mut client = RealtimeClient::new(
                        config,
                        NativeTransport::new(tx.clone()),
                        NativeScheduler::new(tx),
                    )
                    .with_listeners(listeners);
                    if let Some(callback) = on_connection_change {
                        client = client.with_connection_callback(callback);
                    }
                    Self::run_driver(client, rx, snapshot).await;
                });
            });

        let thread = match thread {
            Ok(thread) => Some(thread),
            Err(e) => {
                error!(error = %e, "Failed to spawn driver thread");
                None
            }
        };

        Self { handle, thread }
    }

    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    pub fn listeners(&self) -> &Listeners {
        &self.handle.listeners
    }

    /// Disconnect and stop the driver thread, waiting for it to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.handle.inbox.send(DriverInput::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Driver thread panicked");
            }
        }
    }

    async fn run_driver(
        mut client: RealtimeClient<NativeTransport, NativeScheduler>,
        mut inbox: UnboundedReceiver<DriverInput>,
        snapshot: Arc<Mutex<ConnectionSnapshot>>,
    ) {
        while let Some(input) = inbox.recv().await {
            match input {
                DriverInput::Client(input) => client.apply(input),
                DriverInput::Shutdown => {
                    client.disconnect();
                    break;
                }
            }

            *snapshot.lock() = ConnectionSnapshot {
                status: client.status(),
                reconnect_attempts: client.reconnect_attempts(),
                endpoint: client.endpoint().map(str::to_string),
            };
        }

        *snapshot.lock() = ConnectionSnapshot {
            status: ConnectionStatus::Disconnected,
            reconnect_attempts: client.reconnect_attempts(),
            endpoint: client.endpoint().map(str::to_string),
        };
        info!("Client driver stopped");
    }
}

impl Drop for NativeWsClient {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sockets backed by tokio-tungstenite tasks
struct NativeTransport {
    inbox: Inbox,
    sockets: HashMap<SocketId, UnboundedSender<Message>>,
}

impl NativeTransport {
    fn new(inbox: Inbox) -> Self {
        Self { inbox, sockets: HashMap::new() }
    }

    async fn run_socket(
        id: SocketId,
        request: Request,
        mut outgoing: UnboundedReceiver<Message>,
        inbox: Inbox,
    ) {
        let ws_stream = match connect_async(request).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                post(&inbox, SocketEvent::Error(id, e.to_string()));
                post(&inbox, SocketEvent::Closed(id));
                return;
            }
        };
        post(&inbox, SocketEvent::Opened(id));

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                out = outgoing.recv() => match out {
                    Some(msg) => {
                        if let Err(e) = write.send(msg).await {
                            post(&inbox, SocketEvent::Error(id, e.to_string()));
                            break;
                        }
                    }
                    None => {
                        // Released by the client
                        let _ = write.close().await;
                        break;
                    }
                },
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        post(&inbox, SocketEvent::Frame(id, text.to_string()));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(socket = %id, ?frame, "Close frame received");
                        break;
                    }
                    Some(Err(e)) => {
                        post(&inbox, SocketEvent::Error(id, e.to_string()));
                        break;
                    }
                    None => break,
                    _ => {}
                },
            }
        }

        post(&inbox, SocketEvent::Closed(id));
    }
}

impl Transport for NativeTransport {
    fn open(&mut self, id: SocketId, url: &str) -> Result<(), TransportError> {
        let request = url.into_client_request().map_err(|e| TransportError::InvalidEndpoint {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        self.sockets.insert(id, tx);
        tokio::spawn(Self::run_socket(id, request, rx, self.inbox.clone()));
        Ok(())
    }

    fn send(&mut self, id: SocketId, text: String) -> Result<(), TransportError> {
        let tx = self.sockets.get(&id).ok_or(TransportError::NotOpen(id))?;
        tx.send(Message::Text(text))
            .map_err(|_| TransportError::Send(format!("socket {id} task has exited")))
    }

    fn close(&mut self, id: SocketId) {
        // Dropping the sender makes the socket task send a close frame and exit.
        self.sockets.remove(&id);
    }
}

/// One-shot timers backed by `tokio::time::sleep`
struct NativeScheduler {
    inbox: Inbox,
    timers: HashMap<TimerId, tokio::task::JoinHandle<()>>,
}

impl NativeScheduler {
    fn new(inbox: Inbox) -> Self {
        Self { inbox, timers: HashMap::new() }
    }
}

impl Scheduler for NativeScheduler {
    fn schedule(&mut self, id: TimerId, delay: Duration) {
        self.timers.retain(|_, task| !task.is_finished());

        let inbox = self.inbox.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            post(&inbox, SocketEvent::TimerFired(id));
        });
        self.timers.insert(id, task);
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(task) = self.timers.remove(&id) {
            task.abort();
        }
    }
}
