//! Token fetch for joining the room.
//!
//! [`TokenSource`] is the seam between the session and the Token Issuer.
//! [`HttpTokenSource`] is the production implementation; tests substitute a
//! fixed grant.

use crate::config::SessionConfig;
use crate::errors::SessionError;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

/// What the Token Issuer hands back for a join.
///
/// The token is redacted in Debug output.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub token: SecretString,
    pub ws_url: String,
    pub room_name: String,
}

/// Source of room tokens.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Fetch a token for `username`.
    async fn fetch_token(&self, username: &str) -> Result<TokenGrant, SessionError>;
}

#[derive(Serialize)]
struct TokenRequestBody<'a> {
    username: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Fetches tokens from the Token Issuer over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTokenSource {
    client: Client,
    endpoint: String,
}

impl HttpTokenSource {
    /// Build a client for `config.token_endpoint` with `config.request_timeout`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Internal` if the HTTP client cannot be built.
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SessionError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.token_endpoint.clone(),
        })
    }
}

#[async_trait]
impl TokenSource for HttpTokenSource {
    #[instrument(skip_all, name = "session.token_source.fetch")]
    async fn fetch_token(&self, username: &str) -> Result<TokenGrant, SessionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&TokenRequestBody { username })
            .send()
            .await
            .map_err(|e| {
                warn!(target: "session.token_source", error = %e, "Token request failed");
                SessionError::TokenFetch(format!("token request failed: {e}"))
            })?;

        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| {
                warn!(target: "session.token_source", error = %e, "Failed to parse token response");
                SessionError::TokenFetch(format!("invalid token response: {e}"))
            })
        } else {
            // Prefer the issuer's own error text when it sent one
            let reason = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| status.to_string());

            warn!(
                target: "session.token_source",
                status = %status,
                reason = %reason,
                "Token issuer rejected request"
            );
            Err(SessionError::TokenFetch(format!(
                "token request returned {}: {reason}",
                status.as_u16()
            )))
        }
    }
}
