//! Store interfaces consumed by the sync engine and the account service.
//!
//! [`SyncStore`] is the narrow contract the synchronizer, the credential
//! tracker, and the notification dispatcher need. [`AccountStore`] adds the
//! account lifecycle operations used by login/registration. [`PgStore`]
//! implements both on top of the concrete repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use pronotif_core::AccountKey;
use pronotif_core::result::AppResult;
use pronotif_entity::account::{Account, AccountProfile, CreateAccount};
use pronotif_entity::audit::CreateRequestLog;
use pronotif_entity::device::{DeviceToken, TokenSettings};
use pronotif_entity::notification::{NotificationEvent, NotificationRecord};
use pronotif_entity::snapshot::AcademicSnapshot;

use crate::repositories::{
    AccountRepository, DeviceTokenRepository, NotificationRepository, RequestLogRepository,
    SnapshotRepository,
};

/// Persistence operations used during synchronization and dispatch.
#[async_trait]
pub trait SyncStore: Send + Sync + std::fmt::Debug + 'static {
    /// Loads every registered account.
    async fn load_accounts(&self) -> AppResult<Vec<Account>>;

    /// Loads the cached snapshot of an account (empty if never polled).
    async fn load_snapshot(&self, key: &AccountKey) -> AppResult<AcademicSnapshot>;

    /// Replaces the cached snapshot of an account.
    async fn save_snapshot(&self, key: &AccountKey, snapshot: &AcademicSnapshot) -> AppResult<()>;

    /// Persists the credential-valid flag of an account.
    async fn set_credential_valid(&self, key: &AccountKey, valid: bool) -> AppResult<()>;

    /// Loads the active device tokens of an account.
    async fn load_active_tokens(&self, key: &AccountKey) -> AppResult<Vec<DeviceToken>>;

    /// Persists a notification event and returns the created record.
    async fn create_notification_record(
        &self,
        key: &AccountKey,
        event: &NotificationEvent,
    ) -> AppResult<NotificationRecord>;

    /// Sets a notification's sent-at timestamp.
    async fn mark_notification_sent(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    /// Records a delivery attempt to a token.
    async fn mark_token_active(&self, token: &str, at: DateTime<Utc>) -> AppResult<()>;

    /// Records a successful delivery to a token.
    async fn mark_token_success(&self, token: &str, at: DateTime<Utc>) -> AppResult<()>;
}

/// Account lifecycle operations used by login, registration, and the app API.
#[async_trait]
pub trait AccountStore: SyncStore {
    /// Finds an account by key.
    async fn find_account(&self, key: &AccountKey) -> AppResult<Option<Account>>;

    /// Registers a new account.
    async fn create_account(&self, data: &CreateAccount) -> AppResult<Account>;

    /// Replaces an account's password.
    async fn update_password(&self, key: &AccountKey, password: &str) -> AppResult<()>;

    /// Refreshes the profile fields reported by the portal.
    async fn update_profile(&self, key: &AccountKey, profile: &AccountProfile) -> AppResult<()>;

    /// Stores an account's resolved authentication variant.
    async fn set_auth_variant(&self, key: &AccountKey, variant: &str) -> AppResult<()>;

    /// Registers or reactivates a device token.
    async fn upsert_token(
        &self,
        key: &AccountKey,
        token: &str,
        device_id: Option<&str>,
    ) -> AppResult<DeviceToken>;

    /// Finds a device token.
    async fn find_token(&self, token: &str) -> AppResult<Option<DeviceToken>>;

    /// Applies a partial settings update to a token.
    async fn update_token_settings(&self, token: &str, settings: &TokenSettings) -> AppResult<()>;

    /// Lists the most recent notifications of an account.
    async fn list_notifications(
        &self,
        key: &AccountKey,
        limit: i64,
    ) -> AppResult<Vec<NotificationRecord>>;

    /// Marks a notification read. Returns `false` when it does not belong to the account.
    async fn mark_notification_read(
        &self,
        id: Uuid,
        key: &AccountKey,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Appends an authenticated API call to the audit trail.
    async fn record_request(&self, log: CreateRequestLog) -> AppResult<()>;
}

/// PostgreSQL-backed store composed of the entity repositories.
#[derive(Debug, Clone)]
pub struct PgStore {
    accounts: AccountRepository,
    snapshots: SnapshotRepository,
    tokens: DeviceTokenRepository,
    notifications: NotificationRepository,
    requests: RequestLogRepository,
}

impl PgStore {
    /// Builds the store over a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            snapshots: SnapshotRepository::new(pool.clone()),
            tokens: DeviceTokenRepository::new(pool.clone()),
            notifications: NotificationRepository::new(pool.clone()),
            requests: RequestLogRepository::new(pool),
        }
    }
}

#[async_trait]
impl SyncStore for PgStore {
    async fn load_accounts(&self) -> AppResult<Vec<Account>> {
        self.accounts.find_all().await
    }

    async fn load_snapshot(&self, key: &AccountKey) -> AppResult<AcademicSnapshot> {
        self.snapshots.find(key).await
    }

    async fn save_snapshot(&self, key: &AccountKey, snapshot: &AcademicSnapshot) -> AppResult<()> {
        self.snapshots.upsert(key, snapshot).await
    }

    async fn set_credential_valid(&self, key: &AccountKey, valid: bool) -> AppResult<()> {
        self.accounts.set_credentials_valid(key, valid).await
    }

    async fn load_active_tokens(&self, key: &AccountKey) -> AppResult<Vec<DeviceToken>> {
        self.tokens.find_active(key).await
    }

    async fn create_notification_record(
        &self,
        key: &AccountKey,
        event: &NotificationEvent,
    ) -> AppResult<NotificationRecord> {
        let record = NotificationRecord::from_event(key, event);
        self.notifications.create(&record).await
    }

    async fn mark_notification_sent(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        self.notifications.mark_sent(id, at).await
    }

    async fn mark_token_active(&self, token: &str, at: DateTime<Utc>) -> AppResult<()> {
        self.tokens.mark_active(token, at).await
    }

    async fn mark_token_success(&self, token: &str, at: DateTime<Utc>) -> AppResult<()> {
        self.tokens.mark_success(token, at).await
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_account(&self, key: &AccountKey) -> AppResult<Option<Account>> {
        self.accounts.find(key).await
    }

    async fn create_account(&self, data: &CreateAccount) -> AppResult<Account> {
        self.accounts.create(data).await
    }

    async fn update_password(&self, key: &AccountKey, password: &str) -> AppResult<()> {
        self.accounts.update_password(key, password).await
    }

    async fn update_profile(&self, key: &AccountKey, profile: &AccountProfile) -> AppResult<()> {
        self.accounts
            .update_profile(
                key,
                profile.full_name.as_deref(),
                profile.student_class.as_deref(),
                profile.establishment.as_deref(),
            )
            .await
    }

    async fn set_auth_variant(&self, key: &AccountKey, variant: &str) -> AppResult<()> {
        self.accounts.set_auth_variant(key, variant).await
    }

    async fn upsert_token(
        &self,
        key: &AccountKey,
        token: &str,
        device_id: Option<&str>,
    ) -> AppResult<DeviceToken> {
        self.tokens.upsert(key, token, device_id).await
    }

    async fn find_token(&self, token: &str) -> AppResult<Option<DeviceToken>> {
        self.tokens.find(token).await
    }

    async fn update_token_settings(&self, token: &str, settings: &TokenSettings) -> AppResult<()> {
        self.tokens.update_settings(token, settings).await
    }

    async fn list_notifications(
        &self,
        key: &AccountKey,
        limit: i64,
    ) -> AppResult<Vec<NotificationRecord>> {
        self.notifications.find_by_account(key, limit).await
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        key: &AccountKey,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.notifications.mark_read(id, key, at).await
    }

    async fn record_request(&self, log: CreateRequestLog) -> AppResult<()> {
        self.requests.create(&log.into_row()).await
    }
}
