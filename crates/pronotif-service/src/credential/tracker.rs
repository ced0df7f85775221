//! Credential validity state machine.
//!
//! An account starts `Valid`. A wrong-credentials login failure during a sync
//! attempt moves it to `Invalidated`; only a later successful login moves it
//! back. No other failure kind changes the state. Every transition is
//! persisted through the store, which stays the source of truth: the tracker
//! is reseeded from it at the start of each cycle.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use pronotif_core::AccountKey;
use pronotif_core::result::AppResult;
use pronotif_database::SyncStore;
use pronotif_entity::account::Account;
use pronotif_portal::AuthError;

/// Credential validity of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialState {
    /// The stored password is believed to work.
    Valid,
    /// The portal rejected the stored password.
    Invalidated,
}

impl CredentialState {
    /// State matching a persisted flag.
    pub fn from_flag(valid: bool) -> Self {
        if valid { Self::Valid } else { Self::Invalidated }
    }

    /// Whether routine polling should include the account.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl fmt::Display for CredentialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => f.write_str("valid"),
            Self::Invalidated => f.write_str("invalidated"),
        }
    }
}

/// Tracks and persists credential state transitions.
#[derive(Debug)]
pub struct CredentialTracker {
    store: Arc<dyn SyncStore>,
    states: DashMap<AccountKey, CredentialState>,
}

impl CredentialTracker {
    /// Creates a tracker with no known accounts.
    pub fn new(store: Arc<dyn SyncStore>) -> Self {
        Self {
            store,
            states: DashMap::new(),
        }
    }

    /// Refreshes the in-memory view from freshly loaded accounts.
    pub fn observe(&self, accounts: &[Account]) {
        for account in accounts {
            self.states
                .insert(account.key(), CredentialState::from_flag(account.credentials_valid));
        }
    }

    /// Current state of an account. Unknown accounts are `Valid`.
    pub fn state(&self, key: &AccountKey) -> CredentialState {
        self.states
            .get(key)
            .map(|s| *s.value())
            .unwrap_or(CredentialState::Valid)
    }

    /// Applies a login failure observed during synchronization.
    ///
    /// Only wrong-credentials failures invalidate the account.
    pub async fn record_failure(
        &self,
        key: &AccountKey,
        error: &AuthError,
    ) -> AppResult<CredentialState> {
        if !error.is_wrong_credentials() {
            return Ok(self.state(key));
        }
        let previous = self.states.insert(key.clone(), CredentialState::Invalidated);
        if previous != Some(CredentialState::Invalidated) {
            self.store.set_credential_valid(key, false).await?;
            tracing::warn!(account = %key, "Credentials invalidated");
        }
        Ok(CredentialState::Invalidated)
    }

    /// Applies a successful login.
    pub async fn record_success(&self, key: &AccountKey) -> AppResult<CredentialState> {
        let previous = self.states.insert(key.clone(), CredentialState::Valid);
        if previous != Some(CredentialState::Valid) {
            self.store.set_credential_valid(key, true).await?;
            if previous == Some(CredentialState::Invalidated) {
                tracing::info!(account = %key, "Credentials valid again");
            }
        }
        Ok(CredentialState::Valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pronotif_database::mock::MockSyncStore;
    use pronotif_portal::AuthErrorKind;

    const URL: &str = "https://a.example/pronote/";

    fn setup() -> (Arc<MockSyncStore>, CredentialTracker, AccountKey) {
        let store = Arc::new(MockSyncStore::new());
        let account = MockSyncStore::account("eleve", URL, "pw");
        let key = account.key();
        store.insert_account(account.clone());
        let tracker = CredentialTracker::new(store.clone());
        tracker.observe(&[account]);
        (store, tracker, key)
    }

    #[tokio::test]
    async fn test_wrong_credentials_invalidates() {
        let (store, tracker, key) = setup();
        let err = AuthError::new(AuthErrorKind::WrongCredentials, "Wrong user credentials");

        let state = tracker.record_failure(&key, &err).await.unwrap();
        assert_eq!(state, CredentialState::Invalidated);
        assert!(!store.get_account(&key).unwrap().credentials_valid);

        // A second rejection does not write again.
        tracker.record_failure(&key, &err).await.unwrap();
        assert_eq!(store.credential_updates().len(), 1);
    }

    #[tokio::test]
    async fn test_other_failures_keep_state() {
        let (store, tracker, key) = setup();
        for kind in [
            AuthErrorKind::InvalidAuthVariant,
            AuthErrorKind::Unreachable,
            AuthErrorKind::Timeout,
            AuthErrorKind::RateLimited,
            AuthErrorKind::SessionExpired,
            AuthErrorKind::Unknown,
        ] {
            let state = tracker
                .record_failure(&key, &AuthError::new(kind, "x"))
                .await
                .unwrap();
            assert_eq!(state, CredentialState::Valid);
        }
        assert!(store.credential_updates().is_empty());
    }

    #[tokio::test]
    async fn test_success_revalidates() {
        let (store, tracker, key) = setup();
        let err = AuthError::new(AuthErrorKind::WrongCredentials, "x");
        tracker.record_failure(&key, &err).await.unwrap();

        let state = tracker.record_success(&key).await.unwrap();
        assert!(state.is_valid());
        assert!(store.get_account(&key).unwrap().credentials_valid);
        assert_eq!(
            store.credential_updates(),
            vec![(key.clone(), false), (key, true)]
        );
    }

    #[tokio::test]
    async fn test_success_on_valid_account_is_silent() {
        let (store, tracker, key) = setup();
        tracker.record_success(&key).await.unwrap();
        assert!(store.credential_updates().is_empty());
    }
}
