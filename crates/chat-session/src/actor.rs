//! `SessionActor` - the single owner of a chat session.
//!
//! The actor processes one input at a time from two sources:
//! - commands sent through a [`SessionHandle`] (join, send, disconnect)
//! - events from the active room connection, in delivery order
//!
//! Network work runs on spawned tasks. Their completions come back through
//! the mailbox tagged with the connect generation that started them, so a
//! completion that arrives after a disconnect or a newer join is discarded.
//! Outgoing messages go through one publisher task per connection, which
//! publishes them in send order.
//!
//! # Lifecycle
//!
//! 1. Spawned idle with [`SessionActor::spawn`]
//! 2. Runs until its cancellation token fires or every handle is dropped
//! 3. On exit the active connection, if any, is disconnected

use crate::config::SessionConfig;
use crate::errors::SessionError;
use crate::session::{ConnectionState, Session, SessionSnapshot};
use crate::token_source::TokenSource;

use bytes::Bytes;
use common::room::{
    ConnectOptions, DataPacketKind, RoomConnection, RoomConnector, RoomEvent, RoomHandle,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Channel buffer size for the session mailbox.
const SESSION_CHANNEL_BUFFER: usize = 64;

/// Messages processed by the actor.
enum SessionMessage {
    Join {
        username: String,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },
    Send {
        text: String,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },
    Disconnect {
        respond_to: oneshot::Sender<()>,
    },
    ConnectCompleted {
        generation: u64,
        result: Result<RoomConnection, SessionError>,
    },
    SendFailed {
        generation: u64,
        message_id: Uuid,
        cause: String,
    },
}

/// Handle to a `SessionActor`.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionMessage>,
    snapshots: watch::Receiver<SessionSnapshot>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for SessionMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionMessage::Join { .. } => "Join",
            SessionMessage::Send { .. } => "Send",
            SessionMessage::Disconnect { .. } => "Disconnect",
            SessionMessage::ConnectCompleted { .. } => "ConnectCompleted",
            SessionMessage::SendFailed { .. } => "SendFailed",
        };
        f.write_str(name)
    }
}

impl SessionHandle {
    /// Start joining the room as `username`.
    ///
    /// Returns once the session is `Connecting`; watch the snapshots for
    /// `Connected` or a connect error.
    ///
    /// # Errors
    ///
    /// - `EmptyUsername` for a blank username (also set as the session error)
    /// - `AlreadyActive` when a session is connecting or connected
    /// - `Internal` when the actor has stopped
    pub async fn join(&self, username: impl Into<String>) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::Join {
                username: username.into(),
                respond_to: tx,
            })
            .await
            .map_err(|e| SessionError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SessionError::Internal(format!("response receive failed: {e}")))?
    }

    /// Send a chat message. Blank drafts are ignored.
    ///
    /// The message appears in the session immediately. If publishing fails
    /// it is removed again and the session error is set.
    ///
    /// # Errors
    ///
    /// - `Room(NotConnected)` when the session is not connected
    /// - `Internal` when the actor has stopped
    pub async fn send(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::Send {
                text: text.into(),
                respond_to: tx,
            })
            .await
            .map_err(|e| SessionError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SessionError::Internal(format!("response receive failed: {e}")))?
    }

    /// Leave the room and reset the session.
    ///
    /// # Errors
    ///
    /// Returns `Internal` when the actor has stopped.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::Disconnect { respond_to: tx })
            .await
            .map_err(|e| SessionError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SessionError::Internal(format!("response receive failed: {e}")))
    }

    /// The latest published session state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Subscribe to session state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Stop the actor. The active connection is disconnected.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// A message queued for publishing.
struct OutgoingMessage {
    id: Uuid,
    payload: Bytes,
}

/// A room connection owned by the actor.
struct ActiveConnection {
    room: Arc<dyn RoomHandle>,
    events: mpsc::Receiver<RoomEvent>,
    outgoing: mpsc::UnboundedSender<OutgoingMessage>,
    publisher: JoinHandle<()>,
}

/// The `SessionActor` implementation.
pub struct SessionActor {
    session: Session,
    receiver: mpsc::Receiver<SessionMessage>,
    /// Weak so that dropping every handle stops the actor.
    mailbox: mpsc::WeakSender<SessionMessage>,
    snapshots: watch::Sender<SessionSnapshot>,
    cancel_token: CancellationToken,
    tokens: Arc<dyn TokenSource>,
    connector: Arc<dyn RoomConnector>,
    active: Option<ActiveConnection>,
    /// Bumped on every join and teardown.
    generation: u64,
}

impl SessionActor {
    /// Spawn a new, idle session actor.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        config: &SessionConfig,
        tokens: Arc<dyn TokenSource>,
        connector: Arc<dyn RoomConnector>,
        cancel_token: CancellationToken,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(SESSION_CHANNEL_BUFFER);
        let session = Session::new(config.agent_identity.clone());
        let (snapshots, snapshot_rx) = watch::channel(session.snapshot());

        let actor = Self {
            session,
            receiver,
            mailbox: sender.downgrade(),
            snapshots,
            cancel_token: cancel_token.clone(),
            tokens,
            connector,
            active: None,
            generation: 0,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = SessionHandle {
            sender,
            snapshots: snapshot_rx,
            cancel_token,
        };

        (handle, task_handle)
    }

    #[instrument(skip_all, name = "session.actor")]
    async fn run(mut self) {
        debug!(target: "session.actor", "SessionActor started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(target: "session.actor", "SessionActor received cancellation signal");
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message).await,
                        None => {
                            debug!(target: "session.actor", "All session handles dropped");
                            break;
                        }
                    }
                }

                event = next_room_event(&mut self.active) => {
                    self.handle_room_event(event).await;
                }
            }
        }

        self.teardown().await;
        debug!(target: "session.actor", "SessionActor stopped");
    }

    async fn handle_message(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Join {
                username,
                respond_to,
            } => {
                let result = self.handle_join(&username);
                let _ = respond_to.send(result);
            }

            SessionMessage::Send { text, respond_to } => {
                let result = self.handle_send(&text);
                let _ = respond_to.send(result);
            }

            SessionMessage::Disconnect { respond_to } => {
                info!(target: "session.actor", "Disconnect requested");
                self.teardown().await;
                self.session.reset();
                self.publish();
                let _ = respond_to.send(());
            }

            SessionMessage::ConnectCompleted { generation, result } => {
                self.handle_connect_completed(generation, result).await;
            }

            SessionMessage::SendFailed {
                generation,
                message_id,
                cause,
            } => {
                if generation != self.generation {
                    debug!(target: "session.actor", "Ignoring send failure from previous connection");
                    return;
                }
                warn!(target: "session.actor", error = %cause, "Message send failed");
                self.session.rollback_send(message_id, &cause);
                self.publish();
            }
        }
    }

    fn handle_join(&mut self, username: &str) -> Result<(), SessionError> {
        let result = self.session.begin_join(username);
        // A blank username sets the session error, so publish either way
        self.publish();
        let username = result?;

        self.generation += 1;
        let generation = self.generation;
        info!(target: "session.actor", generation, "Joining chat room");

        let Some(mailbox) = self.mailbox.upgrade() else {
            return Err(SessionError::Internal("session mailbox closed".to_string()));
        };
        let tokens = Arc::clone(&self.tokens);
        let connector = Arc::clone(&self.connector);

        tokio::spawn(async move {
            let result = connect(tokens.as_ref(), connector.as_ref(), &username).await;
            if let Err(mpsc::error::SendError(SessionMessage::ConnectCompleted {
                result: Ok(connection),
                ..
            })) = mailbox
                .send(SessionMessage::ConnectCompleted { generation, result })
                .await
            {
                // Actor is gone; the connection would otherwise leak
                connection.room.disconnect().await;
            }
        });

        Ok(())
    }

    fn handle_send(&mut self, text: &str) -> Result<(), SessionError> {
        let Some(active) = self.active.as_ref() else {
            return Err(common::room::RoomError::NotConnected.into());
        };
        if self.session.connection_state() != ConnectionState::Connected {
            return Err(common::room::RoomError::NotConnected.into());
        }

        let Some(message) = self
            .session
            .push_outgoing(text, &active.room.local_identity())
        else {
            return Ok(());
        };
        self.publish();

        let outgoing = OutgoingMessage {
            id: message.id,
            payload: Bytes::from(message.body.into_bytes()),
        };
        if let Err(mpsc::error::SendError(outgoing)) = active.outgoing.send(outgoing) {
            // Publisher only stops when the connection is torn down
            self.session.rollback_send(outgoing.id, "publisher stopped");
            self.publish();
            return Err(SessionError::Internal("publisher stopped".to_string()));
        }

        Ok(())
    }

    async fn handle_connect_completed(
        &mut self,
        generation: u64,
        result: Result<RoomConnection, SessionError>,
    ) {
        if generation != self.generation {
            debug!(
                target: "session.actor",
                generation,
                current = self.generation,
                "Discarding stale connect completion"
            );
            if let Ok(connection) = result {
                connection.room.disconnect().await;
            }
            return;
        }

        match result {
            Ok(connection) => {
                debug!(target: "session.actor", "Room connection opened, awaiting Connected event");
                let (outgoing, publisher) = spawn_publisher(
                    Arc::clone(&connection.room),
                    self.mailbox.clone(),
                    generation,
                );
                self.active = Some(ActiveConnection {
                    room: connection.room,
                    events: connection.events,
                    outgoing,
                    publisher,
                });
            }
            Err(e) => {
                warn!(target: "session.actor", error = %e, "Failed to connect to chat room");
                self.session.fail_connect(&e.to_string());
                self.publish();
            }
        }
    }

    async fn handle_room_event(&mut self, event: Option<RoomEvent>) {
        match event {
            Some(RoomEvent::Connected) => {
                let Some(active) = self.active.as_ref() else {
                    return;
                };
                let local = active.room.local_identity();
                let remotes = active.room.remote_identities();
                if self.session.on_connected(&local, &remotes) {
                    info!(
                        target: "session.actor",
                        participants = self.session.participants().len(),
                        "Connected to chat room"
                    );
                    self.publish();
                }
            }

            Some(RoomEvent::ParticipantJoined { identity }) => {
                self.session.on_participant_joined(&identity);
                self.publish();
            }

            Some(RoomEvent::ParticipantLeft { identity }) => {
                self.session.on_participant_left(&identity);
                self.publish();
            }

            Some(RoomEvent::DataReceived {
                payload,
                sender_identity,
            }) => {
                if self.session.connection_state() != ConnectionState::Connected {
                    debug!(target: "session.actor", "Ignoring data packet received before Connected");
                    return;
                }
                let local = self
                    .active
                    .as_ref()
                    .map(|a| a.room.local_identity())
                    .unwrap_or_default();
                match self
                    .session
                    .on_data(&payload, sender_identity.as_deref(), &local)
                {
                    Ok(()) => self.publish(),
                    Err(e) => {
                        warn!(target: "session.actor", error = %e, "Dropping undecodable data packet");
                    }
                }
            }

            Some(RoomEvent::Disconnected) | None => {
                info!(target: "session.actor", "Room connection closed");
                match self.session.connection_state() {
                    ConnectionState::Connected => {
                        self.session.on_disconnected();
                        self.publish();
                        self.teardown().await;
                        self.session.reset();
                    }
                    ConnectionState::Connecting => {
                        self.teardown().await;
                        self.session.fail_connect("room closed the connection");
                    }
                    ConnectionState::Idle => {
                        self.teardown().await;
                    }
                }
                self.publish();
            }
        }
    }

    /// Disconnect the active connection, if any, and invalidate in-flight
    /// completions. The only place a connection is disconnected.
    async fn teardown(&mut self) {
        self.generation += 1;
        if let Some(active) = self.active.take() {
            debug!(target: "session.actor", "Disconnecting room connection");
            active.publisher.abort();
            active.room.disconnect().await;
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.snapshot());
    }
}

async fn next_room_event(active: &mut Option<ActiveConnection>) -> Option<RoomEvent> {
    match active {
        Some(connection) => connection.events.recv().await,
        None => std::future::pending().await,
    }
}

/// Spawn the publisher for one connection.
///
/// Messages are published one at a time in queue order. A failure is posted
/// back as `SendFailed` and publishing continues with the next message.
fn spawn_publisher(
    room: Arc<dyn RoomHandle>,
    mailbox: mpsc::WeakSender<SessionMessage>,
    generation: u64,
) -> (mpsc::UnboundedSender<OutgoingMessage>, JoinHandle<()>) {
    let (outgoing, mut queue) = mpsc::unbounded_channel::<OutgoingMessage>();

    let publisher = tokio::spawn(async move {
        while let Some(message) = queue.recv().await {
            if let Err(e) = room
                .publish_data(message.payload, DataPacketKind::Reliable)
                .await
            {
                let Some(mailbox) = mailbox.upgrade() else {
                    break;
                };
                let _ = mailbox
                    .send(SessionMessage::SendFailed {
                        generation,
                        message_id: message.id,
                        cause: e.to_string(),
                    })
                    .await;
            }
        }
    });

    (outgoing, publisher)
}

async fn connect(
    tokens: &dyn TokenSource,
    connector: &dyn RoomConnector,
    username: &str,
) -> Result<RoomConnection, SessionError> {
    let grant = tokens.fetch_token(username).await?;
    let connection = connector
        .connect(
            &grant.ws_url,
            grant.token.expose_secret(),
            ConnectOptions::default(),
        )
        .await?;
    Ok(connection)
}
