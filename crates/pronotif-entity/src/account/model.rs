//! Account entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use pronotif_core::AccountKey;

use super::auth_variant::AuthVariant;

/// A portal account registered for notifications.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    /// Portal login name.
    pub username: String,
    /// Portal base URL.
    pub url: String,
    /// Current portal password.
    #[serde(skip_serializing)]
    pub password: String,
    /// Resolved authentication variant, if known.
    pub auth_variant: Option<String>,
    /// Student full name as reported by the portal.
    pub full_name: Option<String>,
    /// Student class.
    pub student_class: Option<String>,
    /// School name.
    pub establishment: Option<String>,
    /// Whether the stored password is believed to be valid.
    pub credentials_valid: bool,
    /// When the account was first registered.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Returns the account's composite key.
    pub fn key(&self) -> AccountKey {
        AccountKey::new(self.username.clone(), self.url.clone())
    }

    /// Returns the stored authentication variant, if resolved.
    pub fn auth_variant(&self) -> Option<AuthVariant> {
        self.auth_variant.as_deref().map(AuthVariant::from)
    }
}

/// Data required to register a new account after its first successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccount {
    /// Portal login name.
    pub username: String,
    /// Portal base URL.
    pub url: String,
    /// Portal password.
    pub password: String,
    /// Resolved authentication variant.
    pub auth_variant: Option<String>,
    /// Student full name.
    pub full_name: Option<String>,
    /// Student class.
    pub student_class: Option<String>,
    /// School name.
    pub establishment: Option<String>,
}

/// Profile fields reported by the portal on a successful login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    /// Student full name.
    pub full_name: Option<String>,
    /// Student class.
    pub student_class: Option<String>,
    /// School name.
    pub establishment: Option<String>,
}
