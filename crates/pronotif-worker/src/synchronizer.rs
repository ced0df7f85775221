//! Synchronizer: the periodic sync cycle and the invalidation-recheck cycle.
//!
//! Accounts are processed one after the other with a fixed pause between
//! them, which bounds the request rate seen by the portals. A failing account
//! never aborts the cycle. Accounts, snapshots, and tokens are reloaded from
//! the store at the start of every cycle.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;

use pronotif_core::AccountKey;
use pronotif_core::config::SyncConfig;
use pronotif_core::error::AppError;
use pronotif_core::result::AppResult;
use pronotif_database::SyncStore;
use pronotif_entity::account::Account;
use pronotif_entity::snapshot::{Assignment, GradeSet};
use pronotif_portal::{AuthError, CasResolver, PortalCredentials, SessionGuard};
use pronotif_service::credential::{CredentialState, CredentialTracker};
use pronotif_service::notification::dispatcher::Dispatched;
use pronotif_service::{DiffPolicy, NotificationDispatcher, SnapshotDiff};

/// Which accounts a sync cycle covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    /// Every account with valid credentials.
    All,
    /// Only accounts with this username.
    Account(String),
}

impl SyncScope {
    fn includes(&self, account: &Account) -> bool {
        match self {
            Self::All => true,
            Self::Account(username) => account.username == *username,
        }
    }
}

impl FromStr for SyncScope {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "" | "all" => Self::All,
            username => Self::Account(username.to_string()),
        })
    }
}

impl fmt::Display for SyncScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Account(username) => f.write_str(username),
        }
    }
}

/// Summary of one sync cycle.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Accounts attempted.
    pub attempted: usize,
    /// Accounts synchronized successfully.
    pub succeeded: usize,
    /// Accounts that failed.
    pub failed: usize,
    /// Accounts whose credentials were invalidated.
    pub invalidated: usize,
    /// Notification records created.
    pub notifications: usize,
    /// Deliveries started during the cycle, still running in the background.
    pub deliveries: Vec<Dispatched>,
}

impl SyncReport {
    /// Waits for every delivery started by the cycle.
    pub async fn wait_deliveries(&mut self) {
        for dispatched in self.deliveries.drain(..) {
            dispatched.wait().await;
        }
    }
}

/// Summary of one recheck cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecheckReport {
    /// Logins attempted.
    pub attempted: usize,
    /// Accounts whose credentials are valid again.
    pub revalidated: usize,
    /// Accounts skipped because their URL already failed in this pass.
    pub skipped: usize,
}

/// Failure of a single account's sync.
#[derive(Debug, Error)]
enum AccountSyncError {
    #[error(transparent)]
    Portal(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] AppError),
}

/// Result of a successful account sync.
#[derive(Debug)]
struct AccountSync {
    new_assignments: usize,
    new_grades: usize,
    dispatched: Dispatched,
}

/// Drives both synchronization cycles.
#[derive(Debug)]
pub struct Synchronizer {
    store: Arc<dyn SyncStore>,
    resolver: Arc<CasResolver>,
    credentials: Arc<CredentialTracker>,
    dispatcher: NotificationDispatcher,
    diff: SnapshotDiff,
    grade_period: String,
    account_delay: Duration,
    fetch_ids: AtomicU64,
    sync_running: Mutex<()>,
    recheck_running: Mutex<()>,
}

impl Synchronizer {
    /// Creates a synchronizer.
    pub fn new(
        store: Arc<dyn SyncStore>,
        resolver: Arc<CasResolver>,
        credentials: Arc<CredentialTracker>,
        dispatcher: NotificationDispatcher,
        config: &SyncConfig,
        grade_period: impl Into<String>,
    ) -> Self {
        Self {
            store,
            resolver,
            credentials,
            dispatcher,
            diff: SnapshotDiff::new(DiffPolicy::from(config)),
            grade_period: grade_period.into(),
            account_delay: Duration::from_millis(config.account_delay_ms),
            fetch_ids: AtomicU64::new(0),
            sync_running: Mutex::new(()),
            recheck_running: Mutex::new(()),
        }
    }

    /// Runs one periodic sync cycle.
    ///
    /// Returns `None` when a previous cycle is still running.
    pub async fn run_sync_cycle(&self, scope: &SyncScope) -> AppResult<Option<SyncReport>> {
        let Ok(_running) = self.sync_running.try_lock() else {
            tracing::warn!("Sync cycle still running, this run is skipped");
            return Ok(None);
        };

        let accounts = self.store.load_accounts().await?;
        self.credentials.observe(&accounts);
        let eligible: Vec<&Account> = accounts
            .iter()
            .filter(|a| self.credentials.state(&a.key()).is_valid())
            .filter(|a| scope.includes(a))
            .collect();

        tracing::info!(
            scope = %scope,
            accounts = eligible.len(),
            "Sync cycle started"
        );

        let mut report = SyncReport::default();
        for (index, account) in eligible.into_iter().enumerate() {
            if index > 0 && !self.account_delay.is_zero() {
                tokio::time::sleep(self.account_delay).await;
            }

            let key = account.key();
            let fetch_id = self.next_fetch_id();
            report.attempted += 1;

            match self.sync_account(account, fetch_id).await {
                Ok(sync) => {
                    report.succeeded += 1;
                    report.notifications += sync.dispatched.records.len();
                    tracing::info!(
                        fetch_id,
                        account = %key,
                        new_assignments = sync.new_assignments,
                        new_grades = sync.new_grades,
                        notifications = sync.dispatched.records.len(),
                        "Account synchronized"
                    );
                    report.deliveries.push(sync.dispatched);
                }
                Err(AccountSyncError::Portal(e)) => {
                    report.failed += 1;
                    log_portal_failure(fetch_id, &key, &e);
                    match self.credentials.record_failure(&key, &e).await {
                        Ok(CredentialState::Invalidated) => report.invalidated += 1,
                        Ok(CredentialState::Valid) => {}
                        Err(store_err) => tracing::error!(
                            fetch_id,
                            account = %key,
                            error = %store_err,
                            "Failed to persist credential state"
                        ),
                    }
                }
                Err(AccountSyncError::Store(e)) => {
                    report.failed += 1;
                    tracing::error!(fetch_id, account = %key, error = %e, "Account sync failed");
                }
            }
        }

        tracing::info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            invalidated = report.invalidated,
            notifications = report.notifications,
            "Sync cycle finished"
        );
        Ok(Some(report))
    }

    /// Runs one invalidation-recheck cycle.
    ///
    /// Each invalidated account gets one login attempt. Once an attempt fails,
    /// every other invalidated account on the same portal URL is skipped for
    /// the rest of the pass. Returns `None` when a previous recheck is still
    /// running.
    pub async fn run_recheck_cycle(&self) -> AppResult<Option<RecheckReport>> {
        let Ok(_running) = self.recheck_running.try_lock() else {
            tracing::warn!("Recheck cycle still running, this run is skipped");
            return Ok(None);
        };

        let accounts = self.store.load_accounts().await?;
        self.credentials.observe(&accounts);
        let invalidated: Vec<&Account> = accounts
            .iter()
            .filter(|a| !self.credentials.state(&a.key()).is_valid())
            .collect();

        tracing::info!(accounts = invalidated.len(), "Recheck cycle started");

        let mut report = RecheckReport::default();
        let mut failed_urls: HashSet<&str> = HashSet::new();
        for account in invalidated {
            if failed_urls.contains(account.url.as_str()) {
                report.skipped += 1;
                tracing::debug!(
                    account = %account.key(),
                    "Portal already failed in this pass, account skipped"
                );
                continue;
            }
            if report.attempted > 0 && !self.account_delay.is_zero() {
                tokio::time::sleep(self.account_delay).await;
            }

            let key = account.key();
            let fetch_id = self.next_fetch_id();
            report.attempted += 1;

            match self.open_session(account).await {
                Ok(session) => {
                    session.close().await;
                    match self.credentials.record_success(&key).await {
                        Ok(_) => report.revalidated += 1,
                        Err(e) => tracing::error!(
                            fetch_id,
                            account = %key,
                            error = %e,
                            "Failed to persist credential state"
                        ),
                    }
                }
                Err(e) => {
                    failed_urls.insert(account.url.as_str());
                    log_portal_failure(fetch_id, &key, &e);
                }
            }
        }

        tracing::info!(
            attempted = report.attempted,
            revalidated = report.revalidated,
            skipped = report.skipped,
            "Recheck cycle finished"
        );
        Ok(Some(report))
    }

    async fn sync_account(
        &self,
        account: &Account,
        fetch_id: u64,
    ) -> Result<AccountSync, AccountSyncError> {
        let key = account.key();
        tracing::debug!(fetch_id, account = %key, "Fetching account");

        let old = self.store.load_snapshot(&key).await?;
        let session = self.open_session(account).await?;
        let fetched = self.fetch(&session).await;
        session.close().await;
        let (assignments, grades) = fetched?;

        let outcome = self.diff.diff(&old, assignments, grades);
        self.store.save_snapshot(&key, &outcome.snapshot).await?;
        let dispatched = self.dispatcher.notify(&key, &outcome.events).await?;
        self.credentials.record_success(&key).await?;

        Ok(AccountSync {
            new_assignments: outcome.new_assignments,
            new_grades: outcome.new_grades,
            dispatched,
        })
    }

    /// Logs in with the stored variant, resolving it first when unknown.
    async fn open_session(&self, account: &Account) -> Result<SessionGuard, AuthError> {
        let creds = PortalCredentials::from(account);
        let variant = match account.auth_variant() {
            Some(variant) => variant,
            None => {
                let resolution = self.resolver.resolve(&creds).await?;
                if let Some(session) = resolution.session {
                    return Ok(session);
                }
                resolution.variant
            }
        };
        self.resolver.gateway().login(&creds, &variant).await
    }

    async fn fetch(
        &self,
        session: &SessionGuard,
    ) -> Result<(Vec<Assignment>, Option<GradeSet>), AuthError> {
        let today = Utc::now().date_naive();
        let assignments = session.fetch_assignments(today, session.last_day()).await?;
        let grades = session.fetch_grades(&self.grade_period).await?;
        Ok((assignments, grades))
    }

    fn next_fetch_id(&self) -> u64 {
        self.fetch_ids.fetch_add(1, Ordering::Relaxed) + 1
    }
}

fn log_portal_failure(fetch_id: u64, key: &AccountKey, error: &AuthError) {
    if error.kind.is_expected() {
        tracing::warn!(
            fetch_id,
            account = %key,
            kind = %error.kind,
            error = %error.message,
            "Portal login failed"
        );
    } else {
        tracing::error!(
            fetch_id,
            account = %key,
            kind = %error.kind,
            error = ?error,
            "Portal login failed"
        );
    }
}
