//! Protocol client interfaces.
//!
//! The portal protocol itself is spoken by an external bridge. The engine
//! only sees these traits: discover candidate authentication variants, log
//! in, then fetch assignments and grades through a live session.

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use pronotif_core::AccountKey;
use pronotif_entity::account::{Account, AccountProfile, AuthVariant};
use pronotif_entity::snapshot::{Assignment, GradeSet};

/// Raw failure reported by the protocol client, before classification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PortalError {
    /// The portal or bridge answered with an error.
    #[error("portal rejected the request (code {code:?}): {message}")]
    Rejected {
        /// Protocol error code, when the portal supplied one.
        code: Option<i64>,
        /// Error message as reported upstream.
        message: String,
    },
    /// The host could not be reached or the connection dropped.
    #[error("connection failed: {0}")]
    Connection(String),
    /// The request did not complete in time.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// The response could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),
}

/// Login material for one account.
#[derive(Clone)]
pub struct PortalCredentials {
    /// Portal base URL.
    pub url: String,
    /// Portal login name.
    pub username: String,
    /// Portal password.
    pub password: String,
}

impl PortalCredentials {
    /// Creates credentials.
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the account key these credentials belong to.
    pub fn key(&self) -> AccountKey {
        AccountKey::new(self.username.clone(), self.url.clone())
    }
}

impl From<&Account> for PortalCredentials {
    fn from(account: &Account) -> Self {
        Self::new(&account.url, &account.username, &account.password)
    }
}

impl fmt::Debug for PortalCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalCredentials")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Candidate authentication variants advertised for a portal URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateVariants {
    /// The portal needs no delegated authentication.
    None,
    /// Exactly one variant applies.
    Single(AuthVariant),
    /// Several variants may apply; the right one must be probed.
    Multiple(Vec<AuthVariant>),
}

impl CandidateVariants {
    /// Normalizes a raw list of variant names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut variants: Vec<AuthVariant> = names
            .into_iter()
            .map(|n| AuthVariant::from(n.as_ref()))
            .collect();
        match variants.len() {
            0 => Self::None,
            1 => Self::Single(variants.remove(0)),
            _ => Self::Multiple(variants),
        }
    }
}

/// Student identity reported by the portal on login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortalUser {
    /// Student full name.
    pub name: Option<String>,
    /// Student class.
    pub student_class: Option<String>,
    /// School name.
    pub establishment: Option<String>,
}

impl PortalUser {
    /// Converts into the stored profile fields.
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            full_name: self.name.clone(),
            student_class: self.student_class.clone(),
            establishment: self.establishment.clone(),
        }
    }
}

/// A live, authenticated portal session.
#[async_trait]
pub trait PortalSession: Send + Sync + fmt::Debug {
    /// Student identity.
    fn user(&self) -> &PortalUser;

    /// Last day of the school year, the upper bound for assignment fetches.
    fn last_day(&self) -> NaiveDate;

    /// Fetches the assignments due between two dates.
    async fn fetch_assignments(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Assignment>, PortalError>;

    /// Fetches the grades of a period. `None` when the portal has no grade data.
    async fn fetch_grades(&self, period: &str) -> Result<Option<GradeSet>, PortalError>;

    /// Closes the session upstream.
    async fn logout(&self) -> Result<(), PortalError>;
}

/// Entry point of the protocol client.
#[async_trait]
pub trait PortalClient: Send + Sync + fmt::Debug + 'static {
    /// Lists the authentication variants a portal URL may use.
    async fn auth_variants(&self, url: &str) -> Result<CandidateVariants, PortalError>;

    /// Opens a session with the given variant.
    async fn login(
        &self,
        credentials: &PortalCredentials,
        variant: &AuthVariant,
    ) -> Result<Box<dyn PortalSession>, PortalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_from_names() {
        assert_eq!(
            CandidateVariants::from_names(Vec::<String>::new()),
            CandidateVariants::None
        );
        assert_eq!(
            CandidateVariants::from_names(["ac-lyon"]),
            CandidateVariants::Single(AuthVariant::new("ac-lyon"))
        );
        assert!(matches!(
            CandidateVariants::from_names(["ac-lyon", "ac-grenoble"]),
            CandidateVariants::Multiple(v) if v.len() == 2
        ));
    }

    #[test]
    fn test_credentials_debug_masks_password() {
        let creds = PortalCredentials::new("https://a.example/pronote/", "eleve", "hunter2");
        let out = format!("{creds:?}");
        assert!(!out.contains("hunter2"));
        assert!(out.contains("eleve"));
    }
}
