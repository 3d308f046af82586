//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used across Relay Chat. The room service
//! API secret, generative-language API keys and issued room tokens are all
//! held as [`SecretString`] so that any struct deriving `Debug` around them
//! stays safe to log.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct ApiCredentials {
//!     api_key: String,
//!     api_secret: SecretString,
//! }
//!
//! let creds = ApiCredentials {
//!     api_key: "APIxyz".to_string(),
//!     api_secret: SecretString::from("room-signing-secret"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("room-signing-secret"));
//! assert_eq!(creds.api_secret.expose_secret(), "room-signing-secret");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
