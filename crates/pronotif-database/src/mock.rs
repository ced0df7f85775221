//! In-memory store for development and testing.
//!
//! Mirrors the PostgreSQL semantics of [`PgStore`](crate::store::PgStore)
//! closely enough to drive the sync engine without a database.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use pronotif_core::AccountKey;
use pronotif_core::error::{AppError, ErrorKind};
use pronotif_core::result::AppResult;
use pronotif_entity::account::{Account, AccountProfile, CreateAccount};
use pronotif_entity::audit::{CreateRequestLog, RequestLog};
use pronotif_entity::device::{DeviceToken, TokenSettings};
use pronotif_entity::notification::{NotificationEvent, NotificationRecord};
use pronotif_entity::snapshot::AcademicSnapshot;

use crate::store::{AccountStore, SyncStore};

/// Mock store keeping every table in memory.
#[derive(Debug, Default)]
pub struct MockSyncStore {
    accounts: Mutex<Vec<Account>>,
    snapshots: Mutex<HashMap<AccountKey, AcademicSnapshot>>,
    tokens: Mutex<Vec<DeviceToken>>,
    notifications: Mutex<Vec<NotificationRecord>>,
    credential_updates: Mutex<Vec<(AccountKey, bool)>>,
    request_logs: Mutex<Vec<RequestLog>>,
    broken_accounts: Mutex<HashSet<AccountKey>>,
    broken_tokens: Mutex<HashSet<String>>,
}

impl MockSyncStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an account row with valid credentials and no resolved variant.
    pub fn account(username: &str, url: &str, password: &str) -> Account {
        Account {
            username: username.to_string(),
            url: url.to_string(),
            password: password.to_string(),
            auth_variant: None,
            full_name: None,
            student_class: None,
            establishment: None,
            credentials_valid: true,
            created_at: Utc::now(),
        }
    }

    /// Builds an active token subscribed to both categories.
    pub fn token(key: &AccountKey, token: &str) -> DeviceToken {
        DeviceToken {
            token: token.to_string(),
            username: key.username.clone(),
            url: key.url.clone(),
            is_active: true,
            notify_assignments: true,
            notify_grades: true,
            device_id: None,
            created_at: Utc::now(),
            last_active_at: None,
            last_success_at: None,
        }
    }

    /// Seeds an account.
    pub fn insert_account(&self, account: Account) {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        accounts.retain(|a| a.key() != account.key());
        accounts.push(account);
    }

    /// Seeds a snapshot.
    pub fn insert_snapshot(&self, key: &AccountKey, snapshot: AcademicSnapshot) {
        let mut snapshots = self.snapshots.lock().unwrap_or_else(|e| e.into_inner());
        snapshots.insert(key.clone(), snapshot);
    }

    /// Seeds a device token.
    pub fn insert_token(&self, token: DeviceToken) {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens.retain(|t| t.token != token.token);
        tokens.push(token);
    }

    /// Current state of an account.
    pub fn get_account(&self, key: &AccountKey) -> Option<Account> {
        let accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        accounts.iter().find(|a| a.key() == *key).cloned()
    }

    /// Current snapshot of an account, if one was saved.
    pub fn get_snapshot(&self, key: &AccountKey) -> Option<AcademicSnapshot> {
        let snapshots = self.snapshots.lock().unwrap_or_else(|e| e.into_inner());
        snapshots.get(key).cloned()
    }

    /// Current state of a token.
    pub fn get_token(&self, token: &str) -> Option<DeviceToken> {
        let tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens.iter().find(|t| t.token == token).cloned()
    }

    /// Every notification record, in creation order.
    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.notifications
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Every credential flag write, in call order.
    pub fn credential_updates(&self) -> Vec<(AccountKey, bool)> {
        self.credential_updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Every recorded API call, oldest first.
    pub fn request_logs(&self) -> Vec<RequestLog> {
        self.request_logs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Makes every credential flag write for this account fail.
    pub fn break_credential_writes(&self, key: &AccountKey) {
        self.broken_accounts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone());
    }

    /// Makes every delivery bookkeeping write for this token fail.
    pub fn break_token_writes(&self, token: &str) {
        self.broken_tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.to_string());
    }

    fn check_token_writable(&self, token: &str) -> AppResult<()> {
        let broken = self.broken_tokens.lock().unwrap_or_else(|e| e.into_inner());
        if broken.contains(token) {
            return Err(AppError::new(ErrorKind::Database, "device_tokens is read-only"));
        }
        Ok(())
    }

    fn with_token<F: FnOnce(&mut DeviceToken)>(&self, token: &str, f: F) {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(t) = tokens.iter_mut().find(|t| t.token == token) {
            f(t);
        }
    }
}

#[async_trait]
impl SyncStore for MockSyncStore {
    async fn load_accounts(&self) -> AppResult<Vec<Account>> {
        Ok(self
            .accounts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    async fn load_snapshot(&self, key: &AccountKey) -> AppResult<AcademicSnapshot> {
        Ok(self.get_snapshot(key).unwrap_or_default())
    }

    async fn save_snapshot(&self, key: &AccountKey, snapshot: &AcademicSnapshot) -> AppResult<()> {
        self.insert_snapshot(key, snapshot.clone());
        Ok(())
    }

    async fn set_credential_valid(&self, key: &AccountKey, valid: bool) -> AppResult<()> {
        if self
            .broken_accounts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
        {
            return Err(AppError::new(ErrorKind::Database, "accounts is read-only"));
        }
        {
            let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(account) = accounts.iter_mut().find(|a| a.key() == *key) {
                account.credentials_valid = valid;
            }
        }
        self.credential_updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((key.clone(), valid));
        Ok(())
    }

    async fn load_active_tokens(&self, key: &AccountKey) -> AppResult<Vec<DeviceToken>> {
        let tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        Ok(tokens
            .iter()
            .filter(|t| t.is_active && t.account_key() == *key)
            .cloned()
            .collect())
    }

    async fn create_notification_record(
        &self,
        key: &AccountKey,
        event: &NotificationEvent,
    ) -> AppResult<NotificationRecord> {
        let record = NotificationRecord::from_event(key, event);
        self.notifications
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(record)
    }

    async fn mark_notification_sent(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut notifications = self.notifications.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = notifications.iter_mut().find(|n| n.id == id) {
            record.sent_at = Some(at);
        }
        Ok(())
    }

    async fn mark_token_active(&self, token: &str, at: DateTime<Utc>) -> AppResult<()> {
        self.check_token_writable(token)?;
        self.with_token(token, |t| t.last_active_at = Some(at));
        Ok(())
    }

    async fn mark_token_success(&self, token: &str, at: DateTime<Utc>) -> AppResult<()> {
        self.check_token_writable(token)?;
        self.with_token(token, |t| t.last_success_at = Some(at));
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MockSyncStore {
    async fn find_account(&self, key: &AccountKey) -> AppResult<Option<Account>> {
        Ok(self.get_account(key))
    }

    async fn create_account(&self, data: &CreateAccount) -> AppResult<Account> {
        let account = Account {
            username: data.username.clone(),
            url: data.url.clone(),
            password: data.password.clone(),
            auth_variant: data.auth_variant.clone(),
            full_name: data.full_name.clone(),
            student_class: data.student_class.clone(),
            establishment: data.establishment.clone(),
            credentials_valid: true,
            created_at: Utc::now(),
        };
        self.insert_account(account.clone());
        Ok(account)
    }

    async fn update_password(&self, key: &AccountKey, password: &str) -> AppResult<()> {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(account) = accounts.iter_mut().find(|a| a.key() == *key) {
            account.password = password.to_string();
        }
        Ok(())
    }

    async fn update_profile(&self, key: &AccountKey, profile: &AccountProfile) -> AppResult<()> {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(account) = accounts.iter_mut().find(|a| a.key() == *key) {
            if profile.full_name.is_some() {
                account.full_name = profile.full_name.clone();
            }
            if profile.student_class.is_some() {
                account.student_class = profile.student_class.clone();
            }
            if profile.establishment.is_some() {
                account.establishment = profile.establishment.clone();
            }
        }
        Ok(())
    }

    async fn set_auth_variant(&self, key: &AccountKey, variant: &str) -> AppResult<()> {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(account) = accounts.iter_mut().find(|a| a.key() == *key) {
            account.auth_variant = Some(variant.to_string());
        }
        Ok(())
    }

    async fn upsert_token(
        &self,
        key: &AccountKey,
        token: &str,
        device_id: Option<&str>,
    ) -> AppResult<DeviceToken> {
        let previous = self.get_token(token);
        let mut row = Self::token(key, token);
        if let Some(previous) = previous {
            row.created_at = previous.created_at;
            row.last_active_at = previous.last_active_at;
            row.last_success_at = previous.last_success_at;
            row.device_id = previous.device_id;
        }
        if let Some(device_id) = device_id {
            row.device_id = Some(device_id.to_string());
        }
        self.insert_token(row.clone());
        Ok(row)
    }

    async fn find_token(&self, token: &str) -> AppResult<Option<DeviceToken>> {
        Ok(self.get_token(token))
    }

    async fn update_token_settings(&self, token: &str, settings: &TokenSettings) -> AppResult<()> {
        self.with_token(token, |t| {
            if let Some(v) = settings.notify_assignments {
                t.notify_assignments = v;
            }
            if let Some(v) = settings.notify_grades {
                t.notify_grades = v;
            }
            if let Some(v) = settings.is_active {
                t.is_active = v;
            }
        });
        Ok(())
    }

    async fn list_notifications(
        &self,
        key: &AccountKey,
        limit: i64,
    ) -> AppResult<Vec<NotificationRecord>> {
        let notifications = self.notifications.lock().unwrap_or_else(|e| e.into_inner());
        Ok(notifications
            .iter()
            .rev()
            .filter(|n| n.account_key() == *key)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        key: &AccountKey,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut notifications = self.notifications.lock().unwrap_or_else(|e| e.into_inner());
        match notifications
            .iter_mut()
            .find(|n| n.id == id && n.account_key() == *key)
        {
            Some(record) => {
                record.read_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_request(&self, log: CreateRequestLog) -> AppResult<()> {
        self.request_logs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(log.into_row());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pronotif_entity::notification::NotificationCategory;

    #[tokio::test]
    async fn test_credential_flag_round_trip() {
        let store = MockSyncStore::new();
        let account = MockSyncStore::account("eleve", "https://a.example/pronote/", "pw");
        let key = account.key();
        store.insert_account(account);

        store.set_credential_valid(&key, false).await.unwrap();
        assert!(!store.get_account(&key).unwrap().credentials_valid);
        assert_eq!(store.credential_updates(), vec![(key, false)]);
    }

    #[tokio::test]
    async fn test_upsert_token_reactivates() {
        let store = MockSyncStore::new();
        let key = AccountKey::new("eleve", "https://a.example/pronote/");
        store.upsert_token(&key, "tok", Some("pixel")).await.unwrap();
        store
            .update_token_settings(
                "tok",
                &TokenSettings {
                    is_active: Some(false),
                    notify_grades: Some(false),
                    ..TokenSettings::default()
                },
            )
            .await
            .unwrap();
        assert!(store.load_active_tokens(&key).await.unwrap().is_empty());

        let token = store.upsert_token(&key, "tok", None).await.unwrap();
        assert!(token.is_active);
        assert!(token.notify_grades);
        assert_eq!(token.device_id.as_deref(), Some("pixel"));
    }

    #[tokio::test]
    async fn test_broken_token_rejects_writes() {
        let store = MockSyncStore::new();
        let key = AccountKey::new("eleve", "https://a.example/pronote/");
        store.insert_token(MockSyncStore::token(&key, "tok"));
        store.break_token_writes("tok");

        assert!(store.mark_token_active("tok", Utc::now()).await.is_err());
        assert!(store.get_token("tok").unwrap().last_active_at.is_none());
    }

    #[tokio::test]
    async fn test_mark_read_checks_owner() {
        let store = MockSyncStore::new();
        let owner = AccountKey::new("eleve", "https://a.example/pronote/");
        let other = AccountKey::new("autre", "https://a.example/pronote/");
        let event = NotificationEvent::new(NotificationCategory::Grade, "t", "b");
        let record = store.create_notification_record(&owner, &event).await.unwrap();

        assert!(!store.mark_notification_read(record.id, &other, Utc::now()).await.unwrap());
        assert!(store.mark_notification_read(record.id, &owner, Utc::now()).await.unwrap());
    }
}
