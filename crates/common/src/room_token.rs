//! Room access tokens shared across Relay Chat services.
//!
//! A room token is a JWT signed with HS256 over the room service API secret.
//! It names the API key as issuer, the participant identity as subject, and
//! carries a `video` grant object with the room permissions. Tokens are
//! valid from the moment they are issued for [`TOKEN_TTL_SECONDS`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::room_token::{sign_room_token, RoomCredentials, ROOM_NAME};
//!
//! let token = sign_room_token(&credentials, "alice", ROOM_NAME, Utc::now().timestamp())?;
//! ```

use crate::secret::{ExposeSecret, SecretString};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// The single room every chat participant and the agent join.
pub const ROOM_NAME: &str = "ai-chat-room";

/// Token lifetime (6 hours).
pub const TOKEN_TTL_SECONDS: i64 = 6 * 60 * 60;

/// Maximum accepted token size in bytes, checked before any parsing.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised while signing or verifying room tokens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomTokenError {
    /// The signing operation failed; carries the underlying message.
    #[error("{0}")]
    Signing(String),

    /// Token exceeds [`MAX_TOKEN_SIZE_BYTES`].
    #[error("Room token is too large")]
    TokenTooLarge,

    /// Signature, structure or time-bound validation failed.
    #[error("Room token is invalid: {0}")]
    Invalid(String),
}

// =============================================================================
// Credentials
// =============================================================================

/// Room service API credentials used to sign tokens.
///
/// The secret is redacted in Debug output.
#[derive(Debug, Clone)]
pub struct RoomCredentials {
    /// API key id, written to the `iss` claim.
    pub api_key: String,

    /// Symmetric signing secret.
    pub api_secret: SecretString,
}

impl RoomCredentials {
    #[must_use]
    pub fn new(api_key: impl Into<String>, api_secret: SecretString) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret,
        }
    }
}

// =============================================================================
// Claims Types
// =============================================================================

/// Room permissions embedded in the token under the `video` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    /// Room the grant applies to.
    pub room: String,
    pub room_join: bool,
    pub can_publish: bool,
    pub can_subscribe: bool,
    pub can_publish_data: bool,
}

impl VideoGrant {
    /// Full join/publish/subscribe/publish-data rights on one room.
    #[must_use]
    pub fn full_access(room: &str) -> Self {
        Self {
            room: room.to_string(),
            room_join: true,
            can_publish: true,
            can_subscribe: true,
            can_publish_data: true,
        }
    }
}

/// Room token claims.
///
/// The `sub` field (participant identity) is redacted in Debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomClaims {
    /// Issuer: the API key id.
    pub iss: String,

    /// Subject: the participant identity.
    pub sub: String,

    /// Not-before timestamp (Unix epoch seconds).
    pub nbf: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Room grant.
    pub video: VideoGrant,
}

impl fmt::Debug for RoomClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomClaims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("nbf", &self.nbf)
            .field("exp", &self.exp)
            .field("video", &self.video)
            .finish()
    }
}

impl RoomClaims {
    /// Claims for `identity` issued at `now`, expiring after [`TOKEN_TTL_SECONDS`].
    #[must_use]
    pub fn new(api_key: &str, identity: &str, room: &str, now: i64) -> Self {
        Self::with_ttl(api_key, identity, room, now, TOKEN_TTL_SECONDS)
    }

    /// Claims for `identity` issued at `now`, expiring after `ttl_seconds`.
    #[must_use]
    pub fn with_ttl(
        api_key: &str,
        identity: &str,
        room: &str,
        now: i64,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            iss: api_key.to_string(),
            sub: identity.to_string(),
            nbf: now,
            exp: now + ttl_seconds,
            video: VideoGrant::full_access(room),
        }
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Sign a room token for `identity` on `room`, issued at `now`.
///
/// # Errors
///
/// Returns `RoomTokenError::Signing` with the underlying message if the JWT
/// cannot be encoded.
pub fn sign_room_token(
    credentials: &RoomCredentials,
    identity: &str,
    room: &str,
    now: i64,
) -> Result<String, RoomTokenError> {
    let claims = RoomClaims::new(&credentials.api_key, identity, room, now);
    sign_claims(&claims, &credentials.api_secret)
}

/// Sign a room token that expires `ttl_seconds` after `now`.
///
/// # Errors
///
/// Returns `RoomTokenError::Signing` if the JWT cannot be encoded.
pub fn sign_room_token_with_ttl(
    credentials: &RoomCredentials,
    identity: &str,
    room: &str,
    now: i64,
    ttl_seconds: i64,
) -> Result<String, RoomTokenError> {
    let claims = RoomClaims::with_ttl(&credentials.api_key, identity, room, now, ttl_seconds);
    sign_claims(&claims, &credentials.api_secret)
}

/// Sign arbitrary room claims with HS256.
///
/// # Errors
///
/// Returns `RoomTokenError::Signing` if encoding fails.
pub fn sign_claims(claims: &RoomClaims, api_secret: &SecretString) -> Result<String, RoomTokenError> {
    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some("JWT".to_string());

    let key = EncodingKey::from_secret(api_secret.expose_secret().as_bytes());

    encode(&header, claims, &key).map_err(|e| {
        tracing::debug!(target: "common.room_token", error = %e, "Room token signing failed");
        RoomTokenError::Signing(e.to_string())
    })
}

/// Verify a room token's signature and time bounds, returning its claims.
///
/// Only HS256 is accepted. `exp`, `nbf`, `iss` and `sub` are required.
///
/// # Errors
///
/// - `TokenTooLarge` when the token exceeds [`MAX_TOKEN_SIZE_BYTES`]
/// - `Invalid` for any signature, structure or time-bound failure
pub fn verify_room_token(
    token: &str,
    api_secret: &SecretString,
) -> Result<RoomClaims, RoomTokenError> {
    if token.len() > MAX_TOKEN_SIZE_BYTES {
        tracing::debug!(
            target: "common.room_token",
            token_size = token.len(),
            max_size = MAX_TOKEN_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(RoomTokenError::TokenTooLarge);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_nbf = true;
    validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);

    let key = DecodingKey::from_secret(api_secret.expose_secret().as_bytes());

    decode::<RoomClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(target: "common.room_token", error = %e, "Room token rejected");
            RoomTokenError::Invalid(e.to_string())
        })
}
