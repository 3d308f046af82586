//! Response generation backends.
//!
//! [`ResponseGenerator`] turns a prompt into reply text. [`GeminiClient`]
//! implements it against the Gemini `generateContent` REST endpoint.

use crate::config::AgentConfig;
use crate::errors::AgentError;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

/// Produces reply text for a prompt.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generate a reply to `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, AgentError>;
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

// =============================================================================
// Gemini client
// =============================================================================

/// Gemini `generateContent` client.
///
/// The API key is redacted in Debug output.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl GeminiClient {
    /// Build a client from the agent configuration.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Generation` if the HTTP client cannot be built.
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(config.gemini_timeout)
            .build()
            .map_err(|e| AgentError::Generation(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
            api_key: config.gemini_api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl ResponseGenerator for GeminiClient {
    #[instrument(skip_all, name = "agent.generator.generate", fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        let request = GenerateContentRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.expose_secret())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                // reqwest errors carry the URL, which includes the key
                let e = e.without_url();
                warn!(target: "agent.generator", error = %e, "Generation request failed");
                AgentError::Generation(format!("generation request failed: {e}"))
            })?;

        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ApiErrorResponse>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| status.to_string());
            warn!(
                target: "agent.generator",
                status = %status,
                error = %message,
                "Generation API returned an error"
            );
            return Err(AgentError::Generation(format!(
                "generation API returned {}: {message}",
                status.as_u16()
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            let e = e.without_url();
            warn!(target: "agent.generator", error = %e, "Failed to parse generation response");
            AgentError::Generation("invalid generation response".to_string())
        })?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AgentError::Generation(
                "generation response contained no text".to_string(),
            ));
        }

        Ok(text)
    }
}

/// Mock generator for testing.
pub mod mock {
    use super::{async_trait, AgentError, ResponseGenerator};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Reply {
        Fixed(String),
        Echo,
        Failing(String),
    }

    /// Scripted [`ResponseGenerator`] that records the prompts it receives.
    pub struct MockGenerator {
        reply: Reply,
        call_count: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl MockGenerator {
        fn with_reply(reply: Reply) -> Self {
            Self {
                reply,
                call_count: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        /// Always reply with `text`.
        #[must_use]
        pub fn replying(text: impl Into<String>) -> Self {
            Self::with_reply(Reply::Fixed(text.into()))
        }

        /// Reply with the prompt's current message followed by " back".
        #[must_use]
        pub fn echoing() -> Self {
            Self::with_reply(Reply::Echo)
        }

        /// Always fail with `AgentError::Generation(reason)`.
        #[must_use]
        pub fn failing(reason: impl Into<String>) -> Self {
            Self::with_reply(Reply::Failing(reason.into()))
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Prompts received so far.
        pub fn prompts(&self) -> Vec<String> {
            self.prompts
                .lock()
                .map(|prompts| prompts.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl ResponseGenerator for MockGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }

            match &self.reply {
                Reply::Fixed(text) => Ok(text.clone()),
                Reply::Echo => Ok(prompt
                    .lines()
                    .find_map(|line| line.split_once(": ").filter(|(head, _)| {
                        head.starts_with("Current message from")
                    }))
                    .map(|(_, message)| format!("{message} back"))
                    .unwrap_or_default()),
                Reply::Failing(reason) => Err(AgentError::Generation(reason.clone())),
            }
        }
    }
}
