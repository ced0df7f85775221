//! Push delivery configuration.

use serde::{Deserialize, Serialize};

/// Firebase Cloud Messaging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// FCM send endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// FCM server key.
    pub server_key: String,
    /// Android package allowed to receive the messages.
    #[serde(default = "default_package")]
    pub restricted_package_name: String,
    /// Message time-to-live in seconds.
    #[serde(default = "default_ttl")]
    pub time_to_live_seconds: u32,
    /// Validate requests with FCM without delivering them.
    #[serde(default)]
    pub dry_run: bool,
    /// Maximum registration tokens per FCM request.
    #[serde(default = "default_max_tokens")]
    pub max_tokens_per_request: usize,
    /// HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_endpoint() -> String {
    "https://fcm.googleapis.com/fcm/send".to_string()
}

fn default_package() -> String {
    "com.androz2091.pronotenotifications".to_string()
}

fn default_ttl() -> u32 {
    86_400
}

fn default_max_tokens() -> usize {
    1000
}

fn default_request_timeout() -> u64 {
    15
}
