//! Chat Session Controller
//!
//! Owns the client side of a chat session: connection lifecycle, the message
//! list, the participant set and the user-facing error. The controller runs as
//! an actor ([`SessionActor`]) driven by commands from a [`SessionHandle`] and
//! by events from the room connection.
//!
//! # Architecture
//!
//! ```text
//! SessionHandle ──commands──▶ SessionActor ◀──events── RoomConnection
//!        ▲                        │
//!        └──── watch<SessionSnapshot> ◀──┘
//! ```
//!
//! Renderers subscribe to [`SessionSnapshot`] values and hold no logic of
//! their own.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actor;
pub mod config;
pub mod errors;
pub mod session;
pub mod token_source;

pub use actor::{SessionActor, SessionHandle};
pub use config::SessionConfig;
pub use errors::SessionError;
pub use session::{ConnectionState, Message, MessageRole, Session, SessionSnapshot};
pub use token_source::{HttpTokenSource, TokenGrant, TokenSource};
