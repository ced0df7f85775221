//! Academic portal bridge configuration.

use serde::{Deserialize, Serialize};

/// Settings for reaching school portals through the protocol bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Base URL of the HTTP bridge that speaks the portal protocol.
    pub bridge_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Grading period requested when fetching grades.
    #[serde(default = "default_grade_period")]
    pub grade_period: String,
    /// Account type used at login.
    #[serde(default = "default_account_type")]
    pub account_type: String,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_grade_period() -> String {
    "trimester".to_string()
}

fn default_account_type() -> String {
    "student".to_string()
}
