use crate::config::RoomServiceConfig;
use crate::errors::TokenServiceError;
use crate::models::TokenResponse;
use chrono::Utc;
use common::room_token::{self, ROOM_NAME};

/// Issue a room token for `username` on the chat room.
///
/// The token is valid from now for six hours. Nothing is persisted; the
/// token is never re-issued or revoked.
pub fn issue_room_token(
    room_service: &RoomServiceConfig,
    username: &str,
) -> Result<TokenResponse, TokenServiceError> {
    issue_room_token_at(room_service, username, Utc::now().timestamp())
}

/// Issue a room token with an explicit issue time.
pub fn issue_room_token_at(
    room_service: &RoomServiceConfig,
    username: &str,
    now: i64,
) -> Result<TokenResponse, TokenServiceError> {
    let token = room_token::sign_room_token(&room_service.credentials, username, ROOM_NAME, now)
        .map_err(|e| TokenServiceError::TokenGeneration(e.to_string()))?;

    Ok(TokenResponse {
        token,
        ws_url: room_service.ws_url.clone(),
        room_name: ROOM_NAME.to_string(),
    })
}
