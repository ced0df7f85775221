//! Request log entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use pronotif_core::AccountKey;

/// One authenticated API call, as stored in `user_logs`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RequestLog {
    /// Portal login name of the caller.
    pub username: String,
    /// Portal base URL of the caller.
    pub url: String,
    /// Request path, e.g. `/settings`.
    pub route: String,
    /// Device token bound to the bearer token.
    pub device_token: Option<String>,
    /// Value of the `App-Version` header.
    pub app_version: Option<String>,
    /// `jti` of the bearer token.
    pub token_id: Option<String>,
    /// JSON request body, when there was one.
    pub body: Option<serde_json::Value>,
    /// When the request was received.
    pub created_at: DateTime<Utc>,
}

impl RequestLog {
    /// Key of the account that made the call.
    pub fn account_key(&self) -> AccountKey {
        AccountKey::new(&self.username, &self.url)
    }
}

/// Data recorded for a new request log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequestLog {
    /// Caller.
    pub account: AccountKey,
    /// Request path.
    pub route: String,
    /// Bound device token.
    pub device_token: Option<String>,
    /// Client version header.
    pub app_version: Option<String>,
    /// Bearer token id.
    pub token_id: Option<String>,
    /// Parsed JSON body.
    pub body: Option<serde_json::Value>,
}

impl CreateRequestLog {
    /// Materializes the row with the current time.
    pub fn into_row(self) -> RequestLog {
        RequestLog {
            username: self.account.username,
            url: self.account.url,
            route: self.route,
            device_token: self.device_token,
            app_version: self.app_version,
            token_id: self.token_id,
            body: self.body,
            created_at: Utc::now(),
        }
    }
}
