//! Token Issuer configuration.
//!
//! Loaded from environment variables. The three room service values are
//! optional at startup: a missing value does not stop the server, it makes
//! every token request fail with a report of which values are absent.

use common::room_token::RoomCredentials;
use common::secret::SecretString;
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3001";

/// Token Issuer configuration.
///
/// The API secret is redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:3001").
    pub bind_address: String,

    /// Room service API key id (`LIVEKIT_API_KEY`).
    pub api_key: Option<String>,

    /// Room service API secret (`LIVEKIT_API_SECRET`).
    pub api_secret: Option<SecretString>,

    /// Room service websocket URL handed to clients (`LIVEKIT_URL`).
    pub ws_url: Option<String>,

    /// Seconds to keep serving after a shutdown signal (default: 0).
    pub drain_seconds: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "[REDACTED]"))
            .field("ws_url", &self.ws_url)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid drain period: {0}")]
    InvalidDrainSeconds(String),
}

/// Whether a configuration value is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Presence {
    Missing,
    Present,
}

impl Presence {
    fn of<T>(value: Option<&T>) -> Self {
        if value.is_some() {
            Presence::Present
        } else {
            Presence::Missing
        }
    }
}

/// Breakdown of which room service values are configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationReport {
    pub api_key: Presence,
    pub api_secret: Presence,
    pub ws_url: Presence,
}

/// Everything needed to issue a token.
#[derive(Debug, Clone)]
pub struct RoomServiceConfig {
    pub credentials: RoomCredentials,
    pub ws_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    ///
    /// Empty values are treated as unset.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| vars.get(name).filter(|v| !v.trim().is_empty()).cloned();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let drain_seconds = match vars.get("TOKEN_DRAIN_SECONDS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidDrainSeconds(format!("TOKEN_DRAIN_SECONDS={raw}: {e}"))
            })?,
            None => 0,
        };

        Ok(Config {
            bind_address,
            api_key: non_empty("LIVEKIT_API_KEY"),
            api_secret: non_empty("LIVEKIT_API_SECRET").map(SecretString::from),
            ws_url: non_empty("LIVEKIT_URL"),
            drain_seconds,
        })
    }

    /// Which room service values are configured.
    pub fn report(&self) -> ConfigurationReport {
        ConfigurationReport {
            api_key: Presence::of(self.api_key.as_ref()),
            api_secret: Presence::of(self.api_secret.as_ref()),
            ws_url: Presence::of(self.ws_url.as_ref()),
        }
    }

    /// The room service settings, or the report of what is missing.
    pub fn room_service(&self) -> Result<RoomServiceConfig, ConfigurationReport> {
        match (&self.api_key, &self.api_secret, &self.ws_url) {
            (Some(api_key), Some(api_secret), Some(ws_url)) => Ok(RoomServiceConfig {
                credentials: RoomCredentials::new(api_key.clone(), api_secret.clone()),
                ws_url: ws_url.clone(),
            }),
            _ => Err(self.report()),
        }
    }
}
