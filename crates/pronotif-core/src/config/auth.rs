//! API token configuration.

use serde::{Deserialize, Serialize};

/// Settings for the bearer tokens handed to mobile clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign tokens.
    pub jwt_secret: String,
    /// Token lifetime in days.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_days: u64,
}

fn default_token_ttl() -> u64 {
    365
}
