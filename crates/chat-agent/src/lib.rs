//! Chat Agent
//!
//! The AI participant of the chat room. The bot joins the room with its own
//! token, answers every chat message through a generative-language backend,
//! and remembers the last few exchanges with each user so replies can refer
//! back to them.
//!
//! The room transport is injected through [`common::room::RoomConnector`];
//! the language backend through [`generator::ResponseGenerator`].

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod bot;
pub mod config;
pub mod errors;
pub mod generator;
pub mod memory;
pub mod prompt;

pub use agent::ChatAgent;
pub use bot::ChatBot;
pub use config::AgentConfig;
pub use errors::AgentError;
pub use generator::{GeminiClient, ResponseGenerator};
pub use memory::{MemoryEntry, MemoryStore};
