//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pronotif_entity::device::DeviceToken;
use pronotif_entity::notification::{NotificationCategory, NotificationRecord};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for the following requests.
    pub token: String,
    /// Bearer token expiration.
    pub expires_at: DateTime<Utc>,
    /// Whether this login registered the account.
    pub created: bool,
    /// Student name reported by the portal.
    pub full_name: Option<String>,
    /// Student class.
    pub student_class: Option<String>,
    /// School name.
    pub establishment: Option<String>,
    /// The registered device, if a device token was sent.
    pub device: Option<DeviceResponse>,
}

/// Device token state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceResponse {
    /// Whether deliveries are enabled for the device.
    pub is_active: bool,
    /// Receive new-assignment notifications.
    pub notify_assignments: bool,
    /// Receive new-grade notifications.
    pub notify_grades: bool,
    /// Last successful delivery.
    pub last_success_at: Option<DateTime<Utc>>,
}

impl From<DeviceToken> for DeviceResponse {
    fn from(device: DeviceToken) -> Self {
        Self {
            is_active: device.is_active,
            notify_assignments: device.notify_assignments,
            notify_grades: device.notify_grades,
            last_success_at: device.last_success_at,
        }
    }
}

/// Device registration response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDeviceResponse {
    /// Bearer token bound to the new device.
    pub token: String,
    /// Bearer token expiration.
    pub expires_at: DateTime<Utc>,
    /// The registered device.
    pub device: DeviceResponse,
}

/// One notification of the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResponse {
    /// Notification ID.
    pub id: Uuid,
    /// Category.
    pub category: NotificationCategory,
    /// Title.
    pub title: String,
    /// Body.
    pub body: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Delivery time.
    pub sent_at: Option<DateTime<Utc>>,
    /// Read time.
    pub read_at: Option<DateTime<Utc>>,
}

impl From<NotificationRecord> for NotificationResponse {
    fn from(record: NotificationRecord) -> Self {
        Self {
            id: record.id,
            category: record.category,
            title: record.title,
            body: record.body,
            created_at: record.created_at,
            sent_at: record.sent_at,
            read_at: record.read_at,
        }
    }
}

/// Message-only response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

impl MessageResponse {
    /// Creates a message response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}
