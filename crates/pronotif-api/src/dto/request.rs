//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use pronotif_entity::device::TokenSettings;
use pronotif_service::LoginRequest;

/// Login request body.
///
/// The `pronote_*` and `fcm_token` aliases accept the field names used by
/// older app releases.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct LoginBody {
    /// Portal login name.
    #[serde(alias = "pronote_username")]
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    /// Portal password.
    #[serde(alias = "pronote_password")]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    /// Portal base URL.
    #[serde(alias = "pronote_url")]
    #[validate(url(message = "Portal URL is invalid"))]
    pub url: String,
    /// Push token of the device.
    #[serde(default, alias = "fcm_token")]
    #[validate(length(min = 1, message = "Device token must not be empty"))]
    pub device_token: Option<String>,
    /// Optional device identifier.
    #[serde(default)]
    pub device_id: Option<String>,
}

impl std::fmt::Debug for LoginBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginBody")
            .field("username", &self.username)
            .field("url", &self.url)
            .field("device_token", &self.device_token)
            .finish_non_exhaustive()
    }
}

impl From<LoginBody> for LoginRequest {
    fn from(body: LoginBody) -> Self {
        Self {
            username: body.username,
            password: body.password,
            url: body.url,
            device_token: body.device_token,
            device_id: body.device_id,
        }
    }
}

/// Device registration body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterDeviceBody {
    /// Push token of the device.
    #[serde(alias = "fcm_token")]
    #[validate(length(min = 1, message = "Device token is required"))]
    pub device_token: String,
    /// Optional device identifier.
    #[serde(default)]
    pub device_id: Option<String>,
}

/// Per-category subscription update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SettingsBody {
    /// Receive new-assignment notifications.
    #[serde(default, alias = "notifications_homeworks")]
    pub notify_assignments: Option<bool>,
    /// Receive new-grade notifications.
    #[serde(default, alias = "notifications_marks")]
    pub notify_grades: Option<bool>,
}

impl From<SettingsBody> for TokenSettings {
    fn from(body: SettingsBody) -> Self {
        Self {
            notify_assignments: body.notify_assignments,
            notify_grades: body.notify_grades,
            is_active: None,
        }
    }
}

/// Mark-read body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MarkReadBody {
    /// Notification ID.
    pub id: Uuid,
}

/// History query parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of notifications (1..=100).
    pub limit: Option<i64>,
}
