//! Session Controller configuration.

use common::room::AGENT_IDENTITY;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default token endpoint of a locally running Token Issuer.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "http://localhost:3001/api/token";

/// Default timeout for the token request in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Session Controller configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Full URL of the token endpoint (`TOKEN_ENDPOINT`).
    pub token_endpoint: String,

    /// Timeout applied to the token request (`TOKEN_REQUEST_TIMEOUT_SECONDS`).
    pub request_timeout: Duration,

    /// Identity whose messages are shown as agent replies (`AGENT_IDENTITY`).
    pub agent_identity: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
            agent_identity: AGENT_IDENTITY.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid request timeout: {0}")]
    InvalidRequestTimeout(String),
}

impl SessionConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Load configuration from a map of variables.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let token_endpoint = vars
            .get("TOKEN_ENDPOINT")
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or(defaults.token_endpoint);

        let request_timeout = match vars.get("TOKEN_REQUEST_TIMEOUT_SECONDS") {
            Some(value) => {
                let seconds: u64 = value.trim().parse().map_err(|e| {
                    ConfigError::InvalidRequestTimeout(format!(
                        "TOKEN_REQUEST_TIMEOUT_SECONDS must be a positive integer: {e}"
                    ))
                })?;
                if seconds == 0 {
                    return Err(ConfigError::InvalidRequestTimeout(
                        "TOKEN_REQUEST_TIMEOUT_SECONDS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(seconds)
            }
            None => defaults.request_timeout,
        };

        let agent_identity = vars
            .get("AGENT_IDENTITY")
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or(defaults.agent_identity);

        Ok(Self {
            token_endpoint,
            request_timeout,
            agent_identity,
        })
    }
}
