//! # Chat Test Utilities
//!
//! Shared test utilities for the Relay Chat crates.
//!
//! ## Modules
//!
//! - `fixtures` - fixed room service credentials and configurations
//! - `server_harness` - spawns a real Token Issuer on a random port
//! - `mock_room` - scripted room connector for session tests
//! - `in_memory_room` - a working multi-party room that checks tokens
//! - `token_source` - token sources that skip the HTTP hop
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let room = InMemoryRoomService::new(test_credentials().api_secret, TEST_WS_URL);
//!     let tokens = StaticTokenSource::signing(test_credentials(), TEST_WS_URL);
//!
//!     // Spawn a session against `room` with `tokens`...
//! }
//! ```

pub mod fixtures;
pub mod in_memory_room;
pub mod mock_room;
pub mod server_harness;
pub mod token_source;

pub use fixtures::*;
pub use in_memory_room::InMemoryRoomService;
pub use mock_room::{ConnectCall, MockRoom, MockRoomConnector};
pub use server_harness::TestTokenServer;
pub use token_source::StaticTokenSource;
