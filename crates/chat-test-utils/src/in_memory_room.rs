//! In-memory room service.
//!
//! A working single-room implementation of the room boundary: it checks the
//! HS256 room token presented on connect, takes the participant identity from
//! the token subject, and fans data packets and presence changes out to the
//! other participants. Packets are not echoed back to their sender.

use async_trait::async_trait;
use bytes::Bytes;
use common::room::{
    ConnectOptions, DataPacketKind, RoomConnection, RoomConnector, RoomError, RoomEvent,
    RoomHandle,
};
use common::room_token::verify_room_token;
use secrecy::SecretString;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Event channel capacity for each participant.
const PARTICIPANT_EVENT_BUFFER: usize = 256;

type Participants = Arc<Mutex<BTreeMap<String, mpsc::Sender<RoomEvent>>>>;

/// In-memory [`RoomConnector`] hosting one room.
#[derive(Clone)]
pub struct InMemoryRoomService {
    api_secret: SecretString,
    ws_url: String,
    participants: Participants,
}

impl InMemoryRoomService {
    /// A room that accepts tokens signed with `api_secret` on `ws_url`.
    pub fn new(api_secret: SecretString, ws_url: impl Into<String>) -> Self {
        Self {
            api_secret,
            ws_url: ws_url.into(),
            participants: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Identities currently in the room, sorted.
    pub fn participant_identities(&self) -> Vec<String> {
        self.participants.lock().unwrap().keys().cloned().collect()
    }

    /// Close the room: every participant receives `Disconnected`.
    pub fn close_room(&self) {
        let participants = std::mem::take(&mut *self.participants.lock().unwrap());
        for events in participants.values() {
            let _ = events.try_send(RoomEvent::Disconnected);
        }
    }
}

#[async_trait]
impl RoomConnector for InMemoryRoomService {
    async fn connect(
        &self,
        url: &str,
        token: &str,
        _options: ConnectOptions,
    ) -> Result<RoomConnection, RoomError> {
        if url != self.ws_url {
            return Err(RoomError::Connect(format!("unknown room service url: {url}")));
        }

        let claims = verify_room_token(token, &self.api_secret)
            .map_err(|e| RoomError::Connect(e.to_string()))?;
        if !claims.video.room_join {
            return Err(RoomError::Connect("token does not grant room join".to_string()));
        }
        let identity = claims.sub;

        let (events_tx, events_rx) = mpsc::channel(PARTICIPANT_EVENT_BUFFER);
        {
            let mut participants = self.participants.lock().unwrap();
            if participants.contains_key(&identity) {
                return Err(RoomError::Connect(format!(
                    "identity already connected: {identity}"
                )));
            }
            for events in participants.values() {
                let _ = events.try_send(RoomEvent::ParticipantJoined {
                    identity: identity.clone(),
                });
            }
            participants.insert(identity.clone(), events_tx.clone());
        }
        let _ = events_tx.try_send(RoomEvent::Connected);

        let participant = Arc::new(InMemoryParticipant {
            identity,
            participants: Arc::clone(&self.participants),
            closed: AtomicBool::new(false),
        });

        Ok(RoomConnection {
            room: participant,
            events: events_rx,
        })
    }
}

struct InMemoryParticipant {
    identity: String,
    participants: Participants,
    closed: AtomicBool,
}

#[async_trait]
impl RoomHandle for InMemoryParticipant {
    fn local_identity(&self) -> String {
        self.identity.clone()
    }

    fn remote_identities(&self) -> Vec<String> {
        self.participants
            .lock()
            .unwrap()
            .keys()
            .filter(|id| **id != self.identity)
            .cloned()
            .collect()
    }

    async fn publish_data(&self, payload: Bytes, _kind: DataPacketKind) -> Result<(), RoomError> {
        let participants = self.participants.lock().unwrap();
        if self.closed.load(Ordering::SeqCst) || !participants.contains_key(&self.identity) {
            return Err(RoomError::NotConnected);
        }

        for (identity, events) in participants.iter() {
            if *identity != self.identity {
                let _ = events.try_send(RoomEvent::DataReceived {
                    payload: payload.clone(),
                    sender_identity: Some(self.identity.clone()),
                });
            }
        }
        Ok(())
    }

    async fn disconnect(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut participants = self.participants.lock().unwrap();
        if participants.remove(&self.identity).is_some() {
            for events in participants.values() {
                let _ = events.try_send(RoomEvent::ParticipantLeft {
                    identity: self.identity.clone(),
                });
            }
        }
    }
}
