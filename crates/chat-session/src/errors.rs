//! Session Controller error types.
//!
//! Every variant is rendered into the session's single `error` string before
//! it reaches a renderer; see [`crate::session::Session`].

use common::room::RoomError;
use thiserror::Error;

/// Session Controller errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Join with an empty or whitespace-only username.
    #[error("Please enter a username")]
    EmptyUsername,

    /// Join while a session is connecting or connected.
    #[error("Session already active")]
    AlreadyActive,

    /// The token request failed (transport error or non-success status).
    #[error("{0}")]
    TokenFetch(String),

    /// The room client reported an error.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A data packet was not valid UTF-8.
    #[error("invalid message payload: {0}")]
    Decode(String),

    /// The session actor is gone.
    #[error("internal error: {0}")]
    Internal(String),
}
