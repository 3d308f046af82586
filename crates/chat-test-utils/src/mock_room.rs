//! Scripted room connector for session tests.
//!
//! `MockRoomConnector` records every connect call and hands out `MockRoom`
//! connections whose events the test injects by hand.
//!
//! # Example
//!
//! ```rust,ignore
//! use chat_test_utils::MockRoomConnector;
//!
//! let connector = MockRoomConnector::builder()
//!     .with_remote_identities(["ai-agent"])
//!     .fail_next_connect("connection refused")
//!     .build();
//!
//! // Spawn a session with `connector`, then drive it:
//! let room = connector.last_room().unwrap();
//! room.emit(RoomEvent::Connected).await;
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use common::room::{
    ConnectOptions, DataPacketKind, RoomConnection, RoomConnector, RoomError, RoomEvent,
    RoomHandle,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};

/// Event channel capacity for each mock connection.
const MOCK_EVENT_BUFFER: usize = 64;

/// One recorded call to [`RoomConnector::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectCall {
    pub url: String,
    pub token: String,
    pub options: ConnectOptions,
}

#[derive(Default)]
struct ConnectorState {
    calls: Vec<ConnectCall>,
    rooms: Vec<Arc<MockRoom>>,
    connect_failures: VecDeque<String>,
}

/// Scripted [`RoomConnector`].
#[derive(Clone)]
pub struct MockRoomConnector {
    state: Arc<Mutex<ConnectorState>>,
    local_identity: String,
    remote_identities: Vec<String>,
    auto_connected: bool,
    gate: Option<Arc<Semaphore>>,
}

impl MockRoomConnector {
    /// Create a new MockRoomConnector builder.
    pub fn builder() -> MockRoomConnectorBuilder {
        MockRoomConnectorBuilder::default()
    }

    /// A connector whose connections open without any scripted behavior.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Number of connect calls so far, including failed ones.
    pub fn connect_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn connect_calls(&self) -> Vec<ConnectCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Every connection handed out, oldest first.
    pub fn rooms(&self) -> Vec<Arc<MockRoom>> {
        self.state.lock().unwrap().rooms.clone()
    }

    /// The most recent connection handed out.
    pub fn last_room(&self) -> Option<Arc<MockRoom>> {
        self.state.lock().unwrap().rooms.last().cloned()
    }

    /// Make the next connect call fail with `RoomError::Connect(reason)`.
    pub fn fail_next_connect(&self, reason: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .connect_failures
            .push_back(reason.into());
    }

    /// Let one held connect call complete. Only meaningful with
    /// [`MockRoomConnectorBuilder::hold_connects`].
    pub fn release_connect(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }
}

impl Default for MockRoomConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomConnector for MockRoomConnector {
    async fn connect(
        &self,
        url: &str,
        token: &str,
        options: ConnectOptions,
    ) -> Result<RoomConnection, RoomError> {
        self.state.lock().unwrap().calls.push(ConnectCall {
            url: url.to_string(),
            token: token.to_string(),
            options,
        });

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| RoomError::Connect(e.to_string()))?
                .forget();
        }

        if let Some(reason) = self.state.lock().unwrap().connect_failures.pop_front() {
            return Err(RoomError::Connect(reason));
        }

        let (events_tx, events_rx) = mpsc::channel(MOCK_EVENT_BUFFER);
        let room = Arc::new(MockRoom {
            local_identity: self.local_identity.clone(),
            remote_identities: Mutex::new(self.remote_identities.clone()),
            events: events_tx,
            published: Mutex::new(Vec::new()),
            publish_failure: Mutex::new(None),
            disconnects: AtomicUsize::new(0),
        });

        if self.auto_connected {
            let _ = room.events.try_send(RoomEvent::Connected);
        }

        self.state.lock().unwrap().rooms.push(Arc::clone(&room));

        Ok(RoomConnection {
            room,
            events: events_rx,
        })
    }
}

/// Builder for MockRoomConnector configuration.
#[derive(Default)]
pub struct MockRoomConnectorBuilder {
    local_identity: Option<String>,
    remote_identities: Vec<String>,
    auto_connected: bool,
    hold_connects: bool,
    connect_failures: VecDeque<String>,
}

impl MockRoomConnectorBuilder {
    /// Identity reported by `local_identity()` (default: "bob").
    pub fn with_local_identity(mut self, identity: impl Into<String>) -> Self {
        self.local_identity = Some(identity.into());
        self
    }

    /// Identities reported by `remote_identities()` when connected.
    pub fn with_remote_identities<I, S>(mut self, identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remote_identities = identities.into_iter().map(Into::into).collect();
        self
    }

    /// Queue a `Connected` event on every new connection.
    pub fn auto_connected(mut self) -> Self {
        self.auto_connected = true;
        self
    }

    /// Block each connect call until `release_connect` is called.
    pub fn hold_connects(mut self) -> Self {
        self.hold_connects = true;
        self
    }

    /// Fail the next connect call with `RoomError::Connect(reason)`.
    pub fn fail_next_connect(mut self, reason: impl Into<String>) -> Self {
        self.connect_failures.push_back(reason.into());
        self
    }

    pub fn build(self) -> MockRoomConnector {
        MockRoomConnector {
            state: Arc::new(Mutex::new(ConnectorState {
                connect_failures: self.connect_failures,
                ..ConnectorState::default()
            })),
            local_identity: self.local_identity.unwrap_or_else(|| "bob".to_string()),
            remote_identities: self.remote_identities,
            auto_connected: self.auto_connected,
            gate: self.hold_connects.then(|| Arc::new(Semaphore::new(0))),
        }
    }
}

/// A connection handed out by [`MockRoomConnector`].
pub struct MockRoom {
    local_identity: String,
    remote_identities: Mutex<Vec<String>>,
    events: mpsc::Sender<RoomEvent>,
    published: Mutex<Vec<(Bytes, DataPacketKind)>>,
    publish_failure: Mutex<Option<String>>,
    disconnects: AtomicUsize,
}

impl MockRoom {
    /// Deliver `event` to the connection's event stream.
    pub async fn emit(&self, event: RoomEvent) {
        self.events
            .send(event)
            .await
            .expect("session dropped the room event stream");
    }

    /// Deliver a data packet from `sender`.
    pub async fn emit_data(&self, sender: Option<&str>, text: &str) {
        self.emit(RoomEvent::DataReceived {
            payload: Bytes::copy_from_slice(text.as_bytes()),
            sender_identity: sender.map(str::to_string),
        })
        .await;
    }

    /// Make every later publish fail with `RoomError::Publish(reason)`.
    pub fn fail_publishes(&self, reason: impl Into<String>) {
        *self.publish_failure.lock().unwrap() = Some(reason.into());
    }

    pub fn set_remote_identities(&self, identities: &[&str]) {
        *self.remote_identities.lock().unwrap() =
            identities.iter().map(|s| (*s).to_string()).collect();
    }

    /// Successfully published payloads decoded as UTF-8.
    pub fn published_text(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(payload, _)| String::from_utf8_lossy(payload).into_owned())
            .collect()
    }

    /// Delivery modes of successful publishes.
    pub fn published_kinds(&self) -> Vec<DataPacketKind> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(_, kind)| *kind)
            .collect()
    }

    /// Number of times `disconnect` was called on this connection.
    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoomHandle for MockRoom {
    fn local_identity(&self) -> String {
        self.local_identity.clone()
    }

    fn remote_identities(&self) -> Vec<String> {
        self.remote_identities.lock().unwrap().clone()
    }

    async fn publish_data(&self, payload: Bytes, kind: DataPacketKind) -> Result<(), RoomError> {
        if let Some(reason) = self.publish_failure.lock().unwrap().clone() {
            return Err(RoomError::Publish(reason));
        }
        self.published.lock().unwrap().push((payload, kind));
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}
