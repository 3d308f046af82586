//! `ChatBot` - the agent's presence in the chat room.
//!
//! The bot connects with a token it signs itself (identity `ai-agent`),
//! answers every chat message through a [`ChatAgent`], greets participants
//! as they join, and logs a heartbeat while it runs.
//!
//! # Lifecycle
//!
//! 1. [`ChatBot::connect`] signs the agent token and opens the connection
//! 2. [`ChatBot::run`] processes room events until cancelled or the room
//!    disconnects
//! 3. On cancellation the bot leaves the room

use crate::agent::ChatAgent;
use crate::config::AgentConfig;
use crate::errors::AgentError;
use bytes::Bytes;
use chrono::Utc;
use common::room::{
    ConnectOptions, DataPacketKind, RoomConnector, RoomEvent, RoomHandle, AGENT_IDENTITY,
};
use common::room_token::{sign_room_token_with_ttl, ROOM_NAME};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Lifetime of the token the agent signs for itself.
pub const AGENT_TOKEN_TTL_SECONDS: i64 = 60 * 60;

/// Sender name used when a packet carries no identity.
const FALLBACK_USERNAME: &str = "User";

/// Sign the agent's room token, issued at `now` and valid for one hour.
///
/// # Errors
///
/// Returns `AgentError::Token` if signing fails.
pub fn agent_token(config: &AgentConfig, now: i64) -> Result<String, AgentError> {
    Ok(sign_room_token_with_ttl(
        &config.room_credentials,
        AGENT_IDENTITY,
        ROOM_NAME,
        now,
        AGENT_TOKEN_TTL_SECONDS,
    )?)
}

/// Text of the greeting sent to a participant who joins.
#[must_use]
pub fn welcome_message(identity: &str) -> String {
    format!("🤖 Hello {identity}! I'm your AI assistant. Type anything to start chatting!")
}

/// The agent's room participant.
pub struct ChatBot {
    agent: Arc<ChatAgent>,
    room: Arc<dyn RoomHandle>,
    events: mpsc::Receiver<RoomEvent>,
    heartbeat_interval: Duration,
    welcome_delay: Duration,
}

impl ChatBot {
    /// Join the room described by `config` through `connector`.
    ///
    /// # Errors
    ///
    /// - `AgentError::Token` if the agent token cannot be signed
    /// - `AgentError::Room` if the connection fails
    #[instrument(skip_all, name = "agent.bot.connect")]
    pub async fn connect(
        config: &AgentConfig,
        connector: &dyn RoomConnector,
        agent: Arc<ChatAgent>,
    ) -> Result<Self, AgentError> {
        let token = agent_token(config, Utc::now().timestamp())?;

        info!(
            target: "agent.bot",
            room = ROOM_NAME,
            ws_url = %config.ws_url,
            "Connecting to chat room"
        );

        let connection = connector
            .connect(&config.ws_url, &token, ConnectOptions::default())
            .await
            .map_err(|e| {
                error!(target: "agent.bot", error = %e, "Connection failed");
                e
            })?;

        info!(
            target: "agent.bot",
            identity = %connection.room.local_identity(),
            "Agent connected to chat room"
        );

        Ok(Self {
            agent,
            room: connection.room,
            events: connection.events,
            heartbeat_interval: config.heartbeat_interval,
            welcome_delay: config.welcome_delay,
        })
    }

    /// Identity the bot joined with.
    #[must_use]
    pub fn identity(&self) -> String {
        self.room.local_identity()
    }

    /// Process room events until `cancel_token` fires or the room closes.
    ///
    /// Replies and greetings run on their own tasks so a slow generation
    /// never holds up the event loop. They are abandoned when the bot stops.
    #[instrument(skip_all, name = "agent.bot")]
    pub async fn run(mut self, cancel_token: CancellationToken) {
        let tasks = cancel_token.child_token();
        let mut heartbeat = tokio::time::interval_at(
            tokio::time::Instant::now() + self.heartbeat_interval,
            self.heartbeat_interval,
        );

        info!(target: "agent.bot", "Chat bot is running and waiting for messages");

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    info!(target: "agent.bot", "Chat bot received cancellation signal");
                    self.room.disconnect().await;
                    break;
                }

                _ = heartbeat.tick() => {
                    info!(
                        target: "agent.bot",
                        participants = self.room.remote_identities().len(),
                        "Agent status: online and ready"
                    );
                }

                event = self.events.recv() => {
                    match event {
                        Some(RoomEvent::DataReceived { payload, sender_identity }) => {
                            self.handle_data(&payload, sender_identity, &tasks);
                        }
                        Some(RoomEvent::ParticipantJoined { identity }) => {
                            info!(target: "agent.bot", "Participant connected");
                            self.send_welcome(identity, &tasks);
                        }
                        Some(RoomEvent::ParticipantLeft { .. }) => {
                            info!(target: "agent.bot", "Participant disconnected");
                        }
                        Some(RoomEvent::Connected) => {
                            debug!(target: "agent.bot", "Room connection established");
                        }
                        Some(RoomEvent::Disconnected) | None => {
                            warn!(target: "agent.bot", "Room disconnected");
                            break;
                        }
                    }
                }
            }
        }

        tasks.cancel();
        info!(target: "agent.bot", "Chat bot stopped");
    }

    fn handle_data(
        &self,
        payload: &[u8],
        sender_identity: Option<String>,
        tasks: &CancellationToken,
    ) {
        let message = match std::str::from_utf8(payload) {
            Ok(text) => text.to_string(),
            Err(e) => {
                warn!(target: "agent.bot", error = %e, "Dropping undecodable data packet");
                return;
            }
        };

        if message.trim().is_empty() {
            return;
        }
        if sender_identity.as_deref() == Some(AGENT_IDENTITY) {
            return;
        }
        let username = sender_identity.unwrap_or_else(|| FALLBACK_USERNAME.to_string());

        debug!(target: "agent.bot", "Processing chat message");
        let agent = Arc::clone(&self.agent);
        let room = Arc::clone(&self.room);
        let cancelled = tasks.clone();

        tokio::spawn(async move {
            let response = tokio::select! {
                () = cancelled.cancelled() => {
                    debug!(target: "agent.bot", "Abandoning reply, bot is stopping");
                    return;
                }
                response = agent.generate_response(&username, &message) => response,
            };

            let reply = Bytes::from(format!("🤖 {response}"));
            match room.publish_data(reply, DataPacketKind::Reliable).await {
                Ok(()) => debug!(target: "agent.bot", "Response sent"),
                Err(e) => error!(target: "agent.bot", error = %e, "Failed to send response"),
            }
        });
    }

    fn send_welcome(&self, identity: String, tasks: &CancellationToken) {
        let room = Arc::clone(&self.room);
        let delay = self.welcome_delay;
        let cancelled = tasks.clone();

        tokio::spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }
            let greeting = Bytes::from(welcome_message(&identity));
            if let Err(e) = room.publish_data(greeting, DataPacketKind::Reliable).await {
                warn!(target: "agent.bot", error = %e, "Failed to send welcome message");
            }
        });
    }
}
