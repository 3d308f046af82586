//! Chat Agent configuration.
//!
//! Four variables are required and all missing ones are reported together:
//! `GEMINI_API_KEY`, `LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET`, `LIVEKIT_URL`.

use common::room_token::RoomCredentials;
use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default generative-language model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Default generative-language API base URL.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default heartbeat log interval in seconds.
pub const DEFAULT_HEARTBEAT_SECONDS: u64 = 300;

/// Default delay before greeting a new participant, in milliseconds.
pub const DEFAULT_WELCOME_DELAY_MS: u64 = 1000;

/// Default timeout for a generation request in seconds.
pub const DEFAULT_GEMINI_TIMEOUT_SECONDS: u64 = 30;

const REQUIRED_VARS: [&str; 4] = [
    "GEMINI_API_KEY",
    "LIVEKIT_API_KEY",
    "LIVEKIT_API_SECRET",
    "LIVEKIT_URL",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("Invalid {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Chat Agent configuration.
///
/// Secrets are redacted in Debug output.
#[derive(Clone)]
pub struct AgentConfig {
    pub gemini_api_key: SecretString,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub gemini_timeout: Duration,

    /// Credentials the agent signs its own room token with.
    pub room_credentials: RoomCredentials,
    pub ws_url: String,

    pub heartbeat_interval: Duration,
    pub welcome_delay: Duration,
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("gemini_api_key", &"[REDACTED]")
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("gemini_timeout", &self.gemini_timeout)
            .field("room_credentials", &self.room_credentials)
            .field("ws_url", &self.ws_url)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("welcome_delay", &self.welcome_delay)
            .finish()
    }
}

impl AgentConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Load configuration from a map of variables.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            vars.get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|name| get(*name).is_none())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingVariables(missing));
        }

        let required = |name: &str| get(name).unwrap_or_default();

        let heartbeat_seconds = parse_u64(vars, "AGENT_HEARTBEAT_SECONDS", DEFAULT_HEARTBEAT_SECONDS)?;
        if heartbeat_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                name: "AGENT_HEARTBEAT_SECONDS",
                reason: "must be greater than zero".to_string(),
            });
        }
        let welcome_ms = parse_u64(vars, "AGENT_WELCOME_DELAY_MS", DEFAULT_WELCOME_DELAY_MS)?;
        let timeout_seconds = parse_u64(
            vars,
            "GEMINI_TIMEOUT_SECONDS",
            DEFAULT_GEMINI_TIMEOUT_SECONDS,
        )?;

        Ok(Self {
            gemini_api_key: SecretString::from(required("GEMINI_API_KEY")),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            gemini_timeout: Duration::from_secs(timeout_seconds),
            room_credentials: RoomCredentials::new(
                required("LIVEKIT_API_KEY"),
                SecretString::from(required("LIVEKIT_API_SECRET")),
            ),
            ws_url: required("LIVEKIT_URL"),
            heartbeat_interval: Duration::from_secs(heartbeat_seconds),
            welcome_delay: Duration::from_millis(welcome_ms),
        })
    }
}

fn parse_u64(
    vars: &HashMap<String, String>,
    name: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match vars.get(name) {
        Some(value) => value.trim().parse().map_err(|e| ConfigError::InvalidValue {
            name,
            reason: format!("{e}"),
        }),
        None => Ok(default),
    }
}
