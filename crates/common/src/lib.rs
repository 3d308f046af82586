//! Common utilities and types shared across Relay Chat components.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for room access tokens (claims, signing, verification)
pub mod room_token;

/// Module for the room service client boundary (connections, events)
pub mod room;
