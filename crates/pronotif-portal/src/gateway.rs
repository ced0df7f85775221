//! Session gateway and login failure taxonomy.
//!
//! [`SessionGateway`] opens sessions through the [`PortalClient`] and turns
//! every upstream failure into an [`AuthError`]. It never retries. Sessions
//! are handed out as [`SessionGuard`]s, which log out when closed or dropped.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use pronotif_core::error::{AppError, ErrorKind};
use pronotif_entity::account::AuthVariant;
use pronotif_entity::snapshot::{Assignment, GradeSet};

use crate::client::{PortalClient, PortalCredentials, PortalError, PortalSession, PortalUser};

const RATE_LIMITED_MESSAGE: &str =
    "You are being rate limited because of too many failed requests";
const SESSION_EXPIRED_MESSAGE: &str = "Session has expired due to inactivity or error";
const WRONG_CREDENTIALS_MESSAGE: &str = "Wrong user credentials";

/// Classified login or session failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// The chosen authentication variant was rejected.
    InvalidAuthVariant,
    /// The portal host could not be reached.
    Unreachable,
    /// The username or password is wrong.
    WrongCredentials,
    /// The portal did not answer in time.
    Timeout,
    /// The portal's anti-abuse protection kicked in.
    RateLimited,
    /// The session died while in use.
    SessionExpired,
    /// Anything else.
    Unknown,
}

impl AuthErrorKind {
    /// Returns the kind as a stable identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidAuthVariant => "invalid_auth_variant",
            Self::Unreachable => "unreachable",
            Self::WrongCredentials => "wrong_credentials",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::SessionExpired => "session_expired",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the failure is an expected upstream condition rather than a bug.
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified portal failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct AuthError {
    /// Failure class.
    pub kind: AuthErrorKind,
    /// Upstream detail.
    pub message: String,
}

impl AuthError {
    /// Creates a classified error.
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether the stored password was rejected.
    pub fn is_wrong_credentials(&self) -> bool {
        self.kind == AuthErrorKind::WrongCredentials
    }
}

impl From<PortalError> for AuthError {
    fn from(err: PortalError) -> Self {
        Self::new(classify(&err), err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let kind = match err.kind {
            AuthErrorKind::WrongCredentials => ErrorKind::Authentication,
            AuthErrorKind::Unreachable
            | AuthErrorKind::Timeout
            | AuthErrorKind::SessionExpired => ErrorKind::ServiceUnavailable,
            AuthErrorKind::RateLimited => ErrorKind::RateLimit,
            AuthErrorKind::InvalidAuthVariant | AuthErrorKind::Unknown => {
                ErrorKind::ExternalService
            }
        };
        AppError::with_source(kind, format!("Portal login failed: {}", err.kind), err)
    }
}

/// Classifies a raw protocol failure.
pub fn classify(err: &PortalError) -> AuthErrorKind {
    match err {
        PortalError::Rejected { code, message } => classify_signal(*code, message),
        PortalError::Connection(message) => match classify_signal(None, message) {
            AuthErrorKind::Unknown => AuthErrorKind::Unreachable,
            kind => kind,
        },
        PortalError::Timeout(_) => AuthErrorKind::Timeout,
        PortalError::Decode(_) => AuthErrorKind::Unknown,
    }
}

/// Classifies an upstream error code and message.
///
/// The bridge relays the protocol library's errors verbatim, so transport
/// failures arrive as socket error strings.
pub fn classify_signal(code: Option<i64>, message: &str) -> AuthErrorKind {
    match code {
        Some(1) => return AuthErrorKind::InvalidAuthVariant,
        Some(3) => return AuthErrorKind::WrongCredentials,
        _ => {}
    }
    if message == WRONG_CREDENTIALS_MESSAGE {
        AuthErrorKind::WrongCredentials
    } else if message.contains("ECONNRESET")
        || message.contains("ECONNREFUSED")
        || message.contains("ENOTFOUND")
    {
        AuthErrorKind::Unreachable
    } else if message.starts_with("connect ETIMEDOUT") {
        AuthErrorKind::Timeout
    } else if message == RATE_LIMITED_MESSAGE {
        AuthErrorKind::RateLimited
    } else if message == SESSION_EXPIRED_MESSAGE {
        AuthErrorKind::SessionExpired
    } else {
        AuthErrorKind::Unknown
    }
}

/// Opens portal sessions and classifies their failures.
#[derive(Debug, Clone)]
pub struct SessionGateway {
    client: Arc<dyn PortalClient>,
}

impl SessionGateway {
    /// Creates a gateway over a protocol client.
    pub fn new(client: Arc<dyn PortalClient>) -> Self {
        Self { client }
    }

    /// Returns the underlying protocol client.
    pub fn client(&self) -> &Arc<dyn PortalClient> {
        &self.client
    }

    /// Logs in with an explicit variant.
    pub async fn login(
        &self,
        credentials: &PortalCredentials,
        variant: &AuthVariant,
    ) -> Result<SessionGuard, AuthError> {
        let session = self
            .client
            .login(credentials, variant)
            .await
            .map_err(AuthError::from)?;
        tracing::debug!(
            account = %credentials.key(),
            variant = %variant,
            "Portal session opened"
        );
        Ok(SessionGuard::new(session))
    }
}

/// Scoped portal session.
///
/// Call [`close`](Self::close) to log out and observe the result. A guard
/// dropped without being closed logs out in the background.
#[derive(Debug)]
pub struct SessionGuard {
    session: Arc<dyn PortalSession>,
    closed: bool,
}

impl SessionGuard {
    fn new(session: Box<dyn PortalSession>) -> Self {
        Self {
            session: Arc::from(session),
            closed: false,
        }
    }

    /// Student identity.
    pub fn user(&self) -> &PortalUser {
        self.session.user()
    }

    /// Last day of the school year.
    pub fn last_day(&self) -> NaiveDate {
        self.session.last_day()
    }

    /// Fetches assignments, classifying failures.
    pub async fn fetch_assignments(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Assignment>, AuthError> {
        self.session
            .fetch_assignments(from, to)
            .await
            .map_err(AuthError::from)
    }

    /// Fetches grades, classifying failures.
    pub async fn fetch_grades(&self, period: &str) -> Result<Option<GradeSet>, AuthError> {
        self.session
            .fetch_grades(period)
            .await
            .map_err(AuthError::from)
    }

    /// Logs out and releases the session.
    pub async fn close(mut self) {
        self.closed = true;
        if let Err(e) = self.session.logout().await {
            tracing::debug!(error = %e, "Portal logout failed");
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let session = Arc::clone(&self.session);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.logout().await {
                        tracing::debug!(error = %e, "Background portal logout failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!("Portal session dropped outside a runtime; logout skipped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockPortal, MockPortalClient};

    #[test]
    fn test_classify_codes() {
        assert_eq!(
            classify_signal(Some(1), "whatever"),
            AuthErrorKind::InvalidAuthVariant
        );
        assert_eq!(
            classify_signal(Some(3), "whatever"),
            AuthErrorKind::WrongCredentials
        );
    }

    #[test]
    fn test_classify_messages() {
        assert_eq!(
            classify_signal(None, "Wrong user credentials"),
            AuthErrorKind::WrongCredentials
        );
        assert_eq!(
            classify_signal(None, "read ECONNRESET"),
            AuthErrorKind::Unreachable
        );
        assert_eq!(
            classify_signal(None, "connect ETIMEDOUT 10.0.0.1:443"),
            AuthErrorKind::Timeout
        );
        assert_eq!(
            classify_signal(None, RATE_LIMITED_MESSAGE),
            AuthErrorKind::RateLimited
        );
        assert_eq!(
            classify_signal(None, SESSION_EXPIRED_MESSAGE),
            AuthErrorKind::SessionExpired
        );
        assert_eq!(classify_signal(None, "boom"), AuthErrorKind::Unknown);
    }

    #[test]
    fn test_classify_transport_errors() {
        assert_eq!(
            classify(&PortalError::Connection("dns failure".into())),
            AuthErrorKind::Unreachable
        );
        assert_eq!(
            classify(&PortalError::Timeout("30s".into())),
            AuthErrorKind::Timeout
        );
        assert_eq!(
            classify(&PortalError::Decode("bad json".into())),
            AuthErrorKind::Unknown
        );
    }

    #[test]
    fn test_app_error_mapping_keeps_user_distinction() {
        let wrong: AppError = AuthError::new(AuthErrorKind::WrongCredentials, "x").into();
        let down: AppError = AuthError::new(AuthErrorKind::Unreachable, "x").into();
        assert_eq!(wrong.kind, ErrorKind::Authentication);
        assert_eq!(down.kind, ErrorKind::ServiceUnavailable);
    }

    #[tokio::test]
    async fn test_close_logs_out() {
        let portal = MockPortal::new().with_account("eleve", "pw");
        let client = Arc::new(MockPortalClient::new().with_portal("https://a.example/", portal));
        let gateway = SessionGateway::new(client.clone());
        let creds = PortalCredentials::new("https://a.example/", "eleve", "pw");

        let guard = gateway.login(&creds, &AuthVariant::none()).await.unwrap();
        assert_eq!(client.open_sessions(), 1);
        guard.close().await;
        assert_eq!(client.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_wrong_password_is_classified() {
        let portal = MockPortal::new().with_account("eleve", "pw");
        let client = Arc::new(MockPortalClient::new().with_portal("https://a.example/", portal));
        let gateway = SessionGateway::new(client);
        let creds = PortalCredentials::new("https://a.example/", "eleve", "nope");

        let err = gateway
            .login(&creds, &AuthVariant::none())
            .await
            .unwrap_err();
        assert!(err.is_wrong_credentials());
    }
}
