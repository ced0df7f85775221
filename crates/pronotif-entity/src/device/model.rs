//! Device token entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use pronotif_core::AccountKey;

use crate::notification::NotificationCategory;

/// A push registration token bound to an account.
///
/// Tokens are upserted on every registration, deactivated on logout, and
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeviceToken {
    /// Opaque push registration token.
    pub token: String,
    /// Owning account username.
    pub username: String,
    /// Owning account portal URL.
    pub url: String,
    /// Whether the token currently receives notifications.
    pub is_active: bool,
    /// Subscribed to new-assignment notifications.
    pub notify_assignments: bool,
    /// Subscribed to new-grade notifications.
    pub notify_grades: bool,
    /// Optional device identifier supplied by the app.
    pub device_id: Option<String>,
    /// When the token was first registered.
    pub created_at: DateTime<Utc>,
    /// Last time a delivery was attempted to this token.
    pub last_active_at: Option<DateTime<Utc>>,
    /// Last time a delivery to this token succeeded.
    pub last_success_at: Option<DateTime<Utc>>,
}

impl DeviceToken {
    /// Returns the owning account's key.
    pub fn account_key(&self) -> AccountKey {
        AccountKey::new(self.username.clone(), self.url.clone())
    }

    /// Whether this token subscribes to the given category.
    pub fn accepts(&self, category: NotificationCategory) -> bool {
        match category {
            NotificationCategory::Assignment => self.notify_assignments,
            NotificationCategory::Grade => self.notify_grades,
        }
    }
}

/// Partial update of a token's delivery preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenSettings {
    /// New-assignment subscription.
    pub notify_assignments: Option<bool>,
    /// New-grade subscription.
    pub notify_grades: Option<bool>,
    /// Active flag.
    pub is_active: Option<bool>,
}

impl TokenSettings {
    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.notify_assignments.is_none() && self.notify_grades.is_none() && self.is_active.is_none()
    }
}
