//! Token endpoint.
//!
//! `POST /api/token` with `{ "username": "..." }`. Checks run in a fixed
//! order: username, then configuration, then signing. A request that fails
//! an earlier check never reaches a later one.

use crate::errors::TokenServiceError;
use crate::models::{TokenRequest, TokenResponse};
use crate::observability::{hash_for_correlation, metrics};
use crate::routes::AppState;
use crate::services::token_service;
use axum::{body::Bytes, extract::State, Json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Handler for POST /api/token
///
/// # Response
///
/// - 200 OK: `{ token, wsUrl, roomName }`
/// - 400 Bad Request: missing or blank username (also for unparseable bodies)
/// - 500 Internal Server Error: room service configuration missing, or signing failed
#[instrument(
    skip_all,
    name = "token.issue",
    fields(method = "POST", endpoint = "/api/token", status = tracing::field::Empty)
)]
pub async fn handle_issue_token(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<TokenResponse>, TokenServiceError> {
    let start = Instant::now();

    let result = issue(&state, &body);

    let (status, error_type) = match &result {
        Ok(_) => ("success", None),
        Err(TokenServiceError::MissingUsername) => ("error", Some("missing_username")),
        Err(TokenServiceError::MissingConfiguration(_)) => ("error", Some("configuration")),
        Err(TokenServiceError::TokenGeneration(_)) => ("error", Some("signing")),
        Err(TokenServiceError::MethodNotAllowed) => ("error", Some("method")),
    };
    tracing::Span::current().record("status", status);
    metrics::record_token_issuance(status, error_type, start.elapsed());

    result.map(Json)
}

fn issue(state: &AppState, body: &[u8]) -> Result<TokenResponse, TokenServiceError> {
    // Parse manually so a malformed body is a 400, not axum's 422
    let request: TokenRequest = serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: "token.handlers", error = %e, "Invalid request body");
        TokenServiceError::MissingUsername
    })?;

    let username = request
        .username()
        .ok_or(TokenServiceError::MissingUsername)?;

    let room_service = state.config.room_service().map_err(|report| {
        warn!(
            target: "token.handlers",
            api_key = ?report.api_key,
            api_secret = ?report.api_secret,
            ws_url = ?report.ws_url,
            "Token requested but room service configuration is incomplete"
        );
        TokenServiceError::MissingConfiguration(report)
    })?;

    let response = token_service::issue_room_token(&room_service, username).map_err(|e| {
        warn!(target: "token.handlers", error = %e, "Token generation failed");
        e
    })?;

    info!(
        target: "token.handlers",
        user = %hash_for_correlation(username),
        room = %response.room_name,
        "Room token issued"
    );

    Ok(response)
}

/// Fallback for every method other than POST on the token route.
pub async fn method_not_allowed() -> TokenServiceError {
    TokenServiceError::MethodNotAllowed
}
