//! Session state and its transitions.
//!
//! [`Session`] is plain data plus the transition rules. It performs no I/O;
//! the actor in [`crate::actor`] decides when each transition applies and
//! publishes a [`SessionSnapshot`] after every change.
//!
//! # States
//!
//! ```text
//! Idle ──join──▶ Connecting ──Connected event──▶ Connected
//!  ▲                 │                              │
//!  └── connect error ┘◀──── disconnect / reset ─────┘
//! ```

use crate::errors::SessionError;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// System message appended when the room connection is established.
pub const CONNECTED_MESSAGE: &str = "Connected to chat room!";

/// System message appended when the room closes the connection.
pub const DISCONNECTED_MESSAGE: &str = "Disconnected from chat room";

/// Sender recorded for packets without a sender identity.
pub const UNKNOWN_SENDER: &str = "unknown";

/// Sender recorded on system messages.
pub const SYSTEM_SENDER: &str = "system";

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
}

/// Who a message is attributed to, for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    /// Sent by the local participant.
    User,
    /// Sent by the AI agent.
    Agent,
    /// Generated by the session itself.
    System,
    /// Sent by any other participant.
    Other,
}

/// A chat message. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub sender: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub role: MessageRole,
}

impl Message {
    #[must_use]
    pub fn new(sender: impl Into<String>, body: impl Into<String>, role: MessageRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: sender.into(),
            body: body.into(),
            timestamp: Utc::now(),
            role,
        }
    }

    #[must_use]
    pub fn system(body: impl Into<String>) -> Self {
        Self::new(SYSTEM_SENDER, body, MessageRole::System)
    }
}

/// Immutable copy of the session state handed to renderers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub username: String,
    pub connection_state: ConnectionState,
    pub error: Option<String>,
    pub participants: Vec<String>,
    pub messages: Vec<Message>,
}

impl SessionSnapshot {
    /// Message bodies paired with their roles, in display order.
    #[must_use]
    pub fn transcript(&self) -> Vec<(MessageRole, &str)> {
        self.messages
            .iter()
            .map(|m| (m.role, m.body.as_str()))
            .collect()
    }
}

/// Session state owned by the Session Controller.
#[derive(Debug, Clone)]
pub struct Session {
    agent_identity: String,
    username: String,
    connection_state: ConnectionState,
    error: Option<String>,
    participants: Vec<String>,
    messages: Vec<Message>,
}

impl Session {
    /// New idle session. Messages from `agent_identity` get the `Agent` role.
    #[must_use]
    pub fn new(agent_identity: impl Into<String>) -> Self {
        Self {
            agent_identity: agent_identity.into(),
            username: String::new(),
            connection_state: ConnectionState::Idle,
            error: None,
            participants: Vec::new(),
            messages: Vec::new(),
        }
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            username: self.username.clone(),
            connection_state: self.connection_state,
            error: self.error.clone(),
            participants: self.participants.clone(),
            messages: self.messages.clone(),
        }
    }

    /// `Idle → Connecting`. Returns the trimmed username to connect with.
    ///
    /// # Errors
    ///
    /// - `AlreadyActive` when not `Idle`; nothing changes
    /// - `EmptyUsername` for a blank username; the state stays `Idle` and
    ///   the error is set
    pub fn begin_join(&mut self, username: &str) -> Result<String, SessionError> {
        if self.connection_state != ConnectionState::Idle {
            return Err(SessionError::AlreadyActive);
        }

        let username = username.trim();
        if username.is_empty() {
            self.error = Some(SessionError::EmptyUsername.to_string());
            return Err(SessionError::EmptyUsername);
        }

        self.username = username.to_string();
        self.error = None;
        self.connection_state = ConnectionState::Connecting;
        Ok(self.username.clone())
    }

    /// `Connecting → Idle` with `"Failed to connect: <cause>"`.
    pub fn fail_connect(&mut self, cause: &str) {
        self.clear_room_state();
        self.connection_state = ConnectionState::Idle;
        self.error = Some(format!("Failed to connect: {cause}"));
    }

    /// `Connecting → Connected`. Seeds participants and appends the
    /// connected system message. Returns `false` (and changes nothing) if
    /// the session was not connecting.
    pub fn on_connected(&mut self, local_identity: &str, remote_identities: &[String]) -> bool {
        if self.connection_state != ConnectionState::Connecting {
            return false;
        }

        self.connection_state = ConnectionState::Connected;
        self.participants.clear();
        self.insert_participant(local_identity);
        for identity in remote_identities {
            self.insert_participant(identity);
        }
        self.messages.push(Message::system(CONNECTED_MESSAGE));
        true
    }

    /// Idempotent participant insert. Ignored unless connected.
    pub fn on_participant_joined(&mut self, identity: &str) {
        if self.connection_state == ConnectionState::Connected {
            self.insert_participant(identity);
        }
    }

    pub fn on_participant_left(&mut self, identity: &str) {
        self.participants.retain(|p| p != identity);
    }

    /// Append a received data packet as a message.
    ///
    /// # Errors
    ///
    /// Returns `Decode` when the payload is not UTF-8; nothing is appended.
    pub fn on_data(
        &mut self,
        payload: &[u8],
        sender_identity: Option<&str>,
        local_identity: &str,
    ) -> Result<(), SessionError> {
        let body = std::str::from_utf8(payload)
            .map_err(|e| SessionError::Decode(e.to_string()))?;

        let sender = sender_identity.unwrap_or(UNKNOWN_SENDER);
        let role = if sender_identity.is_some_and(|s| s == self.agent_identity) {
            MessageRole::Agent
        } else if sender_identity.is_some_and(|s| s == local_identity) {
            MessageRole::User
        } else {
            MessageRole::Other
        };

        self.messages.push(Message::new(sender, body, role));
        Ok(())
    }

    /// Append an outgoing message optimistically.
    ///
    /// Returns `None` for a blank draft. The returned message carries the id
    /// needed by [`Session::rollback_send`].
    pub fn push_outgoing(&mut self, draft: &str, local_identity: &str) -> Option<Message> {
        let body = draft.trim();
        if body.is_empty() {
            return None;
        }

        let message = Message::new(local_identity, body, MessageRole::User);
        self.messages.push(message.clone());
        Some(message)
    }

    /// Remove exactly the message with `id` and record the send failure.
    pub fn rollback_send(&mut self, id: Uuid, cause: &str) {
        self.messages.retain(|m| m.id != id);
        self.error = Some(format!("Failed to send message: {cause}"));
    }

    /// Record that the room closed the connection.
    pub fn on_disconnected(&mut self) {
        self.messages.push(Message::system(DISCONNECTED_MESSAGE));
    }

    /// Back to `Idle` with no participants, messages or error.
    pub fn reset(&mut self) {
        self.clear_room_state();
        self.error = None;
        self.connection_state = ConnectionState::Idle;
    }

    fn clear_room_state(&mut self) {
        self.participants.clear();
        self.messages.clear();
    }

    fn insert_participant(&mut self, identity: &str) {
        if !self.participants.iter().any(|p| p == identity) {
            self.participants.push(identity.to_string());
        }
    }
}
