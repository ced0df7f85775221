//! Notification event and persisted record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use pronotif_core::AccountKey;

use super::category::NotificationCategory;

/// A notification produced by the diff engine, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Category used for subscription routing.
    pub category: NotificationCategory,
    /// Title shown on the device.
    pub title: String,
    /// Body shown on the device.
    pub body: String,
}

impl NotificationEvent {
    /// Creates a new event.
    pub fn new(
        category: NotificationCategory,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            category,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// `notifications` table row.
///
/// Immutable once created, except for `sent_at` and `read_at`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationRecord {
    /// Unique notification identifier.
    pub id: Uuid,
    /// Owning account username.
    pub username: String,
    /// Owning account portal URL.
    pub url: String,
    /// Notification category.
    pub category: NotificationCategory,
    /// Title.
    pub title: String,
    /// Body.
    pub body: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the push batch for this record completed.
    pub sent_at: Option<DateTime<Utc>>,
    /// When the user opened the notification.
    pub read_at: Option<DateTime<Utc>>,
}

impl NotificationRecord {
    /// Builds a fresh, unsent record for an event.
    pub fn from_event(key: &AccountKey, event: &NotificationEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: key.username.clone(),
            url: key.url.clone(),
            category: event.category,
            title: event.title.clone(),
            body: event.body.clone(),
            created_at: Utc::now(),
            sent_at: None,
            read_at: None,
        }
    }

    /// Returns the owning account's key.
    pub fn account_key(&self) -> AccountKey {
        AccountKey::new(self.username.clone(), self.url.clone())
    }
}
