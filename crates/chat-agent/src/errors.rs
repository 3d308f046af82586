//! Chat Agent error types.

use crate::config::ConfigError;
use common::room::RoomError;
use common::room_token::RoomTokenError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The language backend failed or returned nothing usable.
    #[error("{0}")]
    Generation(String),

    #[error("room error: {0}")]
    Room(#[from] RoomError),

    #[error("agent token error: {0}")]
    Token(#[from] RoomTokenError),
}
