//! Fixed test credentials and configurations.

use common::room_token::RoomCredentials;
use secrecy::SecretString;
use std::collections::HashMap;
use token_service::config::Config;

/// Room service API key used by every test.
pub const TEST_API_KEY: &str = "APItestkey";

/// Room service API secret used by every test.
pub const TEST_API_SECRET: &str = "test-api-secret-for-relay-chat-0123456789";

/// Room service URL used by every test.
pub const TEST_WS_URL: &str = "wss://relay-chat-test.livekit.invalid";

/// Credentials built from [`TEST_API_KEY`] and [`TEST_API_SECRET`].
#[must_use]
pub fn test_credentials() -> RoomCredentials {
    RoomCredentials::new(TEST_API_KEY, SecretString::from(TEST_API_SECRET))
}

/// Token Issuer configuration with every room service value set.
#[must_use]
pub fn test_config() -> Config {
    config_from(&[
        ("LIVEKIT_API_KEY", TEST_API_KEY),
        ("LIVEKIT_API_SECRET", TEST_API_SECRET),
        ("LIVEKIT_URL", TEST_WS_URL),
    ])
}

/// Token Issuer configuration built from `pairs`, bound to 127.0.0.1:0.
///
/// Pass a subset of the room service variables to test missing values.
#[must_use]
pub fn config_from(pairs: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string());

    Config::from_vars(&vars).expect("test configuration must be valid")
}
