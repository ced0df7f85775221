//! Account lifecycle service.
//!
//! Handles the app-facing operations: logging in (which registers the
//! account on first success), device token registration, delivery settings,
//! and notification history.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use pronotif_core::AccountKey;
use pronotif_core::error::AppError;
use pronotif_core::result::AppResult;
use pronotif_database::AccountStore;
use pronotif_entity::account::{Account, CreateAccount};
use pronotif_entity::audit::CreateRequestLog;
use pronotif_entity::device::{DeviceToken, TokenSettings};
use pronotif_entity::notification::NotificationRecord;
use pronotif_portal::{CasResolver, PortalCredentials};

use crate::credential::CredentialTracker;

const MAX_HISTORY: i64 = 100;

/// Login attempt from the app.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Portal login name.
    pub username: String,
    /// Portal password.
    pub password: String,
    /// Portal base URL.
    pub url: String,
    /// Push token of the device logging in.
    pub device_token: Option<String>,
    /// Optional device identifier.
    pub device_id: Option<String>,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("url", &self.url)
            .field("device_token", &self.device_token)
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The stored account after the login.
    pub account: Account,
    /// Whether this login registered the account.
    pub created: bool,
    /// The device token registered with the login, if any.
    pub device: Option<DeviceToken>,
}

/// App-facing account operations.
#[derive(Debug, Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    resolver: Arc<CasResolver>,
    credentials: Arc<CredentialTracker>,
}

impl AccountService {
    /// Creates a new account service.
    pub fn new(
        store: Arc<dyn AccountStore>,
        resolver: Arc<CasResolver>,
        credentials: Arc<CredentialTracker>,
    ) -> Self {
        Self {
            store,
            resolver,
            credentials,
        }
    }

    /// Logs in to the portal, registering or updating the account.
    ///
    /// A successful login always marks the account's credentials valid.
    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginOutcome> {
        let creds = PortalCredentials::new(&request.url, &request.username, &request.password);
        let key = creds.key();
        let existing = self.store.find_account(&key).await?;

        let (variant, session) = match existing.as_ref().and_then(Account::auth_variant) {
            Some(variant) => (variant, None),
            None => {
                let resolution = self.resolver.resolve(&creds).await?;
                (resolution.variant, resolution.session)
            }
        };
        let session = match session {
            Some(session) => session,
            None => self.resolver.gateway().login(&creds, &variant).await?,
        };
        let profile = session.user().profile();
        session.close().await;

        let (account, created) = match existing {
            None => {
                let account = self
                    .store
                    .create_account(&CreateAccount {
                        username: request.username.clone(),
                        url: request.url.clone(),
                        password: request.password.clone(),
                        auth_variant: Some(variant.to_string()),
                        full_name: profile.full_name.clone(),
                        student_class: profile.student_class.clone(),
                        establishment: profile.establishment.clone(),
                    })
                    .await?;
                info!(account = %key, variant = %variant, "Account registered");
                (account, true)
            }
            Some(mut account) => {
                if account.password != request.password {
                    self.store.update_password(&key, &request.password).await?;
                    account.password = request.password.clone();
                    info!(account = %key, "Account password updated");
                }
                if account.auth_variant.is_none() {
                    self.store.set_auth_variant(&key, variant.as_str()).await?;
                    account.auth_variant = Some(variant.to_string());
                }
                self.store.update_profile(&key, &profile).await?;
                (account, false)
            }
        };

        self.credentials.record_success(&key).await?;

        let device = match request.device_token.as_deref() {
            Some(token) => Some(
                self.store
                    .upsert_token(&key, token, request.device_id.as_deref())
                    .await?,
            ),
            None => None,
        };

        let mut account = account;
        account.credentials_valid = true;
        Ok(LoginOutcome {
            account,
            created,
            device,
        })
    }

    /// Registers or reactivates a device token for an existing account.
    pub async fn register_device(
        &self,
        key: &AccountKey,
        token: &str,
        device_id: Option<&str>,
    ) -> AppResult<DeviceToken> {
        if self.store.find_account(key).await?.is_none() {
            return Err(AppError::not_found(format!("Account {key} not found")));
        }
        self.store.upsert_token(key, token, device_id).await
    }

    /// Stops delivering to a device.
    pub async fn logout_device(&self, key: &AccountKey, token: &str) -> AppResult<()> {
        self.owned_token(key, token).await?;
        self.store
            .update_token_settings(
                token,
                &TokenSettings {
                    is_active: Some(false),
                    ..TokenSettings::default()
                },
            )
            .await?;
        info!(account = %key, "Device logged out");
        Ok(())
    }

    /// Changes a device's category subscriptions.
    pub async fn update_settings(
        &self,
        key: &AccountKey,
        token: &str,
        settings: &TokenSettings,
    ) -> AppResult<DeviceToken> {
        if settings.is_empty() {
            return Err(AppError::validation("No setting to update"));
        }
        self.owned_token(key, token).await?;
        self.store.update_token_settings(token, settings).await?;
        self.owned_token(key, token).await
    }

    /// Most recent notifications of an account.
    pub async fn list_notifications(
        &self,
        key: &AccountKey,
        limit: Option<i64>,
    ) -> AppResult<Vec<NotificationRecord>> {
        let limit = limit.unwrap_or(MAX_HISTORY).clamp(1, MAX_HISTORY);
        self.store.list_notifications(key, limit).await
    }

    /// Marks a notification read.
    pub async fn mark_notification_read(&self, key: &AccountKey, id: Uuid) -> AppResult<()> {
        if self.store.mark_notification_read(id, key, Utc::now()).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("Notification {id} not found")))
        }
    }

    /// Appends an authenticated API call to the account's audit trail.
    pub async fn record_request(&self, log: CreateRequestLog) -> AppResult<()> {
        tracing::debug!(account = %log.account, route = %log.route, "Recording API call");
        self.store.record_request(log).await
    }

    async fn owned_token(&self, key: &AccountKey, token: &str) -> AppResult<DeviceToken> {
        match self.store.find_token(token).await? {
            Some(device) if device.account_key() == *key => Ok(device),
            _ => Err(AppError::not_found("Device token not found")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pronotif_core::error::ErrorKind;
    use pronotif_database::SyncStore;
    use pronotif_database::mock::MockSyncStore;
    use pronotif_entity::notification::{NotificationCategory, NotificationEvent};
    use pronotif_portal::SessionGateway;
    use pronotif_portal::mock::{MockPortal, MockPortalClient};

    const URL: &str = "https://a.example/pronote/";

    struct Fixture {
        store: Arc<MockSyncStore>,
        client: Arc<MockPortalClient>,
        service: AccountService,
    }

    fn fixture(portal: MockPortal) -> Fixture {
        let store = Arc::new(MockSyncStore::new());
        let client = Arc::new(MockPortalClient::new().with_portal(URL, portal));
        let resolver = Arc::new(CasResolver::new(SessionGateway::new(client.clone())));
        let credentials = Arc::new(CredentialTracker::new(store.clone()));
        let service = AccountService::new(store.clone(), resolver, credentials);
        Fixture {
            store,
            client,
            service,
        }
    }

    fn request(password: &str, token: Option<&str>) -> LoginRequest {
        LoginRequest {
            username: "eleve".to_string(),
            password: password.to_string(),
            url: URL.to_string(),
            device_token: token.map(str::to_string),
            device_id: None,
        }
    }

    #[tokio::test]
    async fn test_first_login_registers_account() {
        let portal = MockPortal::new()
            .with_account("eleve", "pw")
            .with_candidates(&["ac-lyon", "ac-grenoble"], "ac-grenoble");
        let f = fixture(portal);

        let outcome = f.service.login(request("pw", Some("tok"))).await.unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.account.auth_variant.as_deref(), Some("ac-grenoble"));
        assert_eq!(outcome.account.full_name.as_deref(), Some("Student eleve"));
        assert!(outcome.device.unwrap().is_active);
        assert_eq!(f.client.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_login_updates_password_and_revalidates() {
        let f = fixture(MockPortal::new().with_account("eleve", "new-pw"));
        let mut account = MockSyncStore::account("eleve", URL, "old-pw");
        account.auth_variant = Some("none".to_string());
        account.credentials_valid = false;
        let key = account.key();
        f.store.insert_account(account);

        let outcome = f.service.login(request("new-pw", None)).await.unwrap();
        assert!(!outcome.created);
        let stored = f.store.get_account(&key).unwrap();
        assert_eq!(stored.password, "new-pw");
        assert!(stored.credentials_valid);
        assert_eq!(f.client.discovery_count(), 0);
    }

    #[tokio::test]
    async fn test_wrong_password_is_authentication_error() {
        let f = fixture(MockPortal::new().with_account("eleve", "pw"));
        let err = f.service.login(request("nope", None)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn test_unreachable_portal_is_service_unavailable() {
        let portal = MockPortal::new()
            .with_account("eleve", "pw")
            .with_login_failure(pronotif_portal::PortalError::Connection("read ECONNRESET".into()));
        let f = fixture(portal);
        let err = f.service.login(request("pw", None)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
    }

    #[tokio::test]
    async fn test_device_settings_and_logout() {
        let f = fixture(MockPortal::new().with_account("eleve", "pw"));
        f.service.login(request("pw", Some("tok"))).await.unwrap();
        let key = AccountKey::new("eleve", URL);

        let updated = f
            .service
            .update_settings(
                &key,
                "tok",
                &TokenSettings {
                    notify_grades: Some(false),
                    ..TokenSettings::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.notify_grades);
        assert!(updated.notify_assignments);

        f.service.logout_device(&key, "tok").await.unwrap();
        assert!(!f.store.get_token("tok").unwrap().is_active);

        let stranger = AccountKey::new("autre", URL);
        let err = f.service.logout_device(&stranger, "tok").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_notification_history() {
        let f = fixture(MockPortal::new());
        let key = AccountKey::new("eleve", URL);
        let event = NotificationEvent::new(NotificationCategory::Assignment, "t", "b");
        let record = f.store.create_notification_record(&key, &event).await.unwrap();

        let history = f.service.list_notifications(&key, Some(1000)).await.unwrap();
        assert_eq!(history.len(), 1);

        f.service.mark_notification_read(&key, record.id).await.unwrap();
        assert!(f.store.notifications()[0].read_at.is_some());

        let err = f
            .service
            .mark_notification_read(&key, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_record_request_appends_to_trail() {
        let f = fixture(MockPortal::new());
        let key = AccountKey::new("eleve", URL);
        let log = CreateRequestLog {
            account: key.clone(),
            route: "/logout".to_string(),
            device_token: Some("tok".to_string()),
            app_version: None,
            token_id: None,
            body: None,
        };

        f.service.record_request(log).await.unwrap();
        let logs = f.store.request_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].account_key(), key);
        assert_eq!(logs[0].route, "/logout");
    }
}
