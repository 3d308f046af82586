//! Room service client boundary.
//!
//! The real-time room service (signaling, data channel, presence) is an
//! external collaborator. Everything in Relay Chat talks to it through the
//! traits in this module:
//!
//! - [`RoomConnector`] opens a connection with a signed room token
//! - [`RoomHandle`] is the live connection (identity, publish, disconnect)
//! - [`RoomEvent`] values arrive on the connection's event channel in the
//!   order the transport delivers them
//!
//! Each call to [`RoomConnector::connect`] yields an independent connection,
//! so a stale connection can be torn down without touching a newer one.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Identity the AI agent joins the room with.
pub const AGENT_IDENTITY: &str = "ai-agent";

/// Delivery mode for data channel packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPacketKind {
    /// Ordered, retransmitted delivery.
    Reliable,
    /// Best-effort delivery.
    Lossy,
}

/// Options passed to [`RoomConnector::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Subscribe to remote tracks automatically.
    pub auto_subscribe: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            auto_subscribe: true,
        }
    }
}

/// Events delivered by a room connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// The connection is established and presence is available.
    Connected,
    /// The connection was closed by the room service or the network.
    Disconnected,
    /// A data packet arrived. `sender_identity` is `None` for server-originated packets.
    DataReceived {
        payload: Bytes,
        sender_identity: Option<String>,
    },
    /// A remote participant joined.
    ParticipantJoined { identity: String },
    /// A remote participant left.
    ParticipantLeft { identity: String },
}

/// Room client errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomError {
    /// Connecting to the room service failed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Publishing a data packet failed.
    #[error("publish failed: {0}")]
    Publish(String),

    /// The operation requires a live connection.
    #[error("not connected to room")]
    NotConnected,
}

/// A live room connection.
#[async_trait]
pub trait RoomHandle: Send + Sync {
    /// Identity of the local participant.
    fn local_identity(&self) -> String;

    /// Identities of the remote participants currently in the room.
    fn remote_identities(&self) -> Vec<String>;

    /// Publish a data packet to the other participants.
    async fn publish_data(&self, payload: Bytes, kind: DataPacketKind) -> Result<(), RoomError>;

    /// Leave the room. Calling it on a closed connection has no effect.
    async fn disconnect(&self);
}

/// Opens room connections.
#[async_trait]
pub trait RoomConnector: Send + Sync {
    /// Connect to the room service at `url` using `token`.
    async fn connect(
        &self,
        url: &str,
        token: &str,
        options: ConnectOptions,
    ) -> Result<RoomConnection, RoomError>;
}

/// A connection handle paired with its event stream.
pub struct RoomConnection {
    pub room: Arc<dyn RoomHandle>,
    pub events: mpsc::Receiver<RoomEvent>,
}

impl fmt::Debug for RoomConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomConnection")
            .field("local_identity", &self.room.local_identity())
            .finish_non_exhaustive()
    }
}
