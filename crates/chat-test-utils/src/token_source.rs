//! Token sources that skip the HTTP hop to the Token Issuer.

use async_trait::async_trait;
use chat_session::{SessionError, TokenGrant, TokenSource};
use chrono::Utc;
use common::room_token::{sign_room_token, RoomCredentials, ROOM_NAME};
use secrecy::SecretString;
use std::sync::atomic::{AtomicUsize, Ordering};

enum Mode {
    Fixed { token: String, ws_url: String },
    Signing { credentials: RoomCredentials, ws_url: String },
    Failing(String),
}

/// A [`TokenSource`] with a scripted outcome.
///
/// - `fixed` returns the same token for every username
/// - `signing` signs a real room token for the requested username
/// - `failing` always fails with `SessionError::TokenFetch`
pub struct StaticTokenSource {
    mode: Mode,
    calls: AtomicUsize,
}

impl StaticTokenSource {
    pub fn fixed(token: impl Into<String>, ws_url: impl Into<String>) -> Self {
        Self::with_mode(Mode::Fixed {
            token: token.into(),
            ws_url: ws_url.into(),
        })
    }

    pub fn signing(credentials: RoomCredentials, ws_url: impl Into<String>) -> Self {
        Self::with_mode(Mode::Signing {
            credentials,
            ws_url: ws_url.into(),
        })
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_mode(Mode::Failing(reason.into()))
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of tokens requested so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn fetch_token(&self, username: &str) -> Result<TokenGrant, SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (token, ws_url) = match &self.mode {
            Mode::Fixed { token, ws_url } => (token.clone(), ws_url.clone()),
            Mode::Signing {
                credentials,
                ws_url,
            } => {
                let token =
                    sign_room_token(credentials, username, ROOM_NAME, Utc::now().timestamp())
                        .map_err(|e| SessionError::TokenFetch(e.to_string()))?;
                (token, ws_url.clone())
            }
            Mode::Failing(reason) => return Err(SessionError::TokenFetch(reason.clone())),
        };

        Ok(TokenGrant {
            token: SecretString::from(token),
            ws_url,
            room_name: ROOM_NAME.to_string(),
        })
    }
}
