//! Observability for the Token Issuer.
//!
//! Handlers use `#[instrument(skip_all)]` and log only allow-listed fields.
//! Usernames are never logged in plaintext; they appear as
//! [`hash_for_correlation`] output so a single user's requests can still be
//! followed across log lines. Secrets and tokens never appear in logs.

pub mod metrics;

pub use metrics::{init_metrics_recorder, record_http_request, record_token_issuance};

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars).
///
/// This is a one-way hash for correlation only, not a secret-protection mechanism.
pub fn hash_for_correlation(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    // First 4 bytes: enough to correlate, limits reversibility
    hex::encode(result.get(..4).unwrap_or_default())
}
