//! Push transport interface.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pronotif_core::error::{AppError, ErrorKind};
use pronotif_entity::notification::{NotificationCategory, NotificationRecord};

/// Payload delivered to every device of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    /// Notification category, also sent as data so the app can route it.
    pub category: NotificationCategory,
    /// Title.
    pub title: String,
    /// Body.
    pub body: String,
    /// Identifier of the persisted record, for read receipts.
    pub notification_id: Option<String>,
}

impl From<&NotificationRecord> for PushMessage {
    fn from(record: &NotificationRecord) -> Self {
        Self {
            category: record.category,
            title: record.title.clone(),
            body: record.body.clone(),
            notification_id: Some(record.id.to_string()),
        }
    }
}

/// Delivery outcome for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    /// Target token.
    pub token: String,
    /// Whether the provider accepted the message for this token.
    pub success: bool,
    /// Provider error code when delivery failed.
    pub error: Option<String>,
}

impl DeliveryResult {
    /// A successful delivery.
    pub fn delivered(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            success: true,
            error: None,
        }
    }

    /// A failed delivery.
    pub fn failed(token: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Failure of a whole batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PushError {
    /// The provider could not be reached.
    #[error("push transport error: {0}")]
    Transport(String),
    /// The provider refused the request.
    #[error("push provider returned {status}: {body}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Response body.
        body: String,
    },
    /// The provider response could not be decoded.
    #[error("invalid push provider response: {0}")]
    Decode(String),
}

impl From<PushError> for AppError {
    fn from(err: PushError) -> Self {
        AppError::with_source(ErrorKind::ExternalService, "Push delivery failed", err)
    }
}

/// Sends one message to a list of device tokens.
#[async_trait]
pub trait PushTransport: Send + Sync + fmt::Debug + 'static {
    /// Sends a batch. Results are ordered like `tokens`.
    async fn send_batch(
        &self,
        message: &PushMessage,
        tokens: &[String],
    ) -> Result<Vec<DeliveryResult>, PushError>;
}
