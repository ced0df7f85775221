//! Scriptable in-memory protocol client for development and testing.
//!
//! Each portal URL is backed by a [`MockPortal`] describing which accounts
//! exist, which authentication variant it accepts, and what data sessions
//! return. Calls are recorded so tests can assert on them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use pronotif_entity::account::AuthVariant;
use pronotif_entity::snapshot::{Assignment, GradeSet};

use crate::client::{
    CandidateVariants, PortalClient, PortalCredentials, PortalError, PortalSession, PortalUser,
};

/// Scripted behaviour of one portal URL.
#[derive(Debug, Clone)]
pub struct MockPortal {
    candidates: Result<Vec<String>, PortalError>,
    accepted_variants: Option<Vec<String>>,
    accounts: HashMap<String, String>,
    login_failure: Option<PortalError>,
    remaining_login_failures: usize,
    variant_delays: HashMap<String, Duration>,
    assignments: Vec<Assignment>,
    grades: Option<GradeSet>,
    fetch_failure: Option<PortalError>,
}

impl Default for MockPortal {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPortal {
    /// A portal with direct login, no accounts, and no data.
    pub fn new() -> Self {
        Self {
            candidates: Ok(Vec::new()),
            accepted_variants: None,
            accounts: HashMap::new(),
            login_failure: None,
            remaining_login_failures: 0,
            variant_delays: HashMap::new(),
            assignments: Vec::new(),
            grades: None,
            fetch_failure: None,
        }
    }

    /// Registers an account.
    pub fn with_account(mut self, username: &str, password: &str) -> Self {
        self.accounts
            .insert(username.to_string(), password.to_string());
        self
    }

    /// Advertises candidate variants; only `accepted` lets logins through.
    pub fn with_candidates(mut self, candidates: &[&str], accepted: &str) -> Self {
        self.candidates = Ok(candidates.iter().map(|c| c.to_string()).collect());
        self.accepted_variants = Some(vec![accepted.to_string()]);
        self
    }

    /// Lets logins through with any of these variants.
    pub fn with_accepted_variants(mut self, accepted: &[&str]) -> Self {
        self.accepted_variants = Some(accepted.iter().map(|a| a.to_string()).collect());
        self
    }

    /// Makes the candidate discovery call fail.
    pub fn with_discovery_failure(mut self, err: PortalError) -> Self {
        self.candidates = Err(err);
        self
    }

    /// Makes every login fail with this error.
    pub fn with_login_failure(mut self, err: PortalError) -> Self {
        self.login_failure = Some(err);
        self
    }

    /// Makes the next `n` logins fail as unreachable.
    pub fn with_transient_failures(mut self, n: usize) -> Self {
        self.remaining_login_failures = n;
        self
    }

    /// Delays logins attempted with a given variant.
    pub fn with_variant_delay(mut self, variant: &str, delay: Duration) -> Self {
        self.variant_delays.insert(variant.to_string(), delay);
        self
    }

    /// Data returned by sessions.
    pub fn with_assignments(mut self, assignments: Vec<Assignment>) -> Self {
        self.assignments = assignments;
        self
    }

    /// Grades returned by sessions.
    pub fn with_grades(mut self, grades: Option<GradeSet>) -> Self {
        self.grades = grades;
        self
    }

    /// Makes session fetches fail with this error.
    pub fn with_fetch_failure(mut self, err: PortalError) -> Self {
        self.fetch_failure = Some(err);
        self
    }

    /// Replaces the data returned by sessions opened from now on.
    pub fn set_assignments(&mut self, assignments: Vec<Assignment>) {
        self.assignments = assignments;
    }

    /// Replaces the grades returned by sessions opened from now on.
    pub fn set_grades(&mut self, grades: Option<GradeSet>) {
        self.grades = grades;
    }

    /// Changes an account's password.
    pub fn set_password(&mut self, username: &str, password: &str) {
        self.accounts
            .insert(username.to_string(), password.to_string());
    }

    /// Clears any scripted login failure.
    pub fn clear_login_failure(&mut self) {
        self.login_failure = None;
    }

    fn check_login(
        &mut self,
        credentials: &PortalCredentials,
        variant: &AuthVariant,
    ) -> Result<(), PortalError> {
        if self.remaining_login_failures > 0 {
            self.remaining_login_failures -= 1;
            return Err(PortalError::Connection("read ECONNRESET".to_string()));
        }
        if let Some(err) = &self.login_failure {
            return Err(err.clone());
        }
        let variant_ok = match &self.accepted_variants {
            Some(accepted) => accepted.iter().any(|a| a == variant.as_str()),
            None => variant.is_none(),
        };
        if !variant_ok {
            return Err(PortalError::Rejected {
                code: Some(1),
                message: format!("Unknown CAS '{variant}'"),
            });
        }
        match self.accounts.get(&credentials.username) {
            Some(password) if *password == credentials.password => Ok(()),
            _ => Err(PortalError::Rejected {
                code: Some(3),
                message: "Wrong user credentials".to_string(),
            }),
        }
    }
}

/// A login attempt recorded by [`MockPortalClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCall {
    /// Portal URL.
    pub url: String,
    /// Username.
    pub username: String,
    /// Variant used.
    pub variant: String,
}

/// In-memory [`PortalClient`].
#[derive(Debug, Default)]
pub struct MockPortalClient {
    portals: Mutex<HashMap<String, MockPortal>>,
    logins: Mutex<Vec<LoginCall>>,
    discoveries: AtomicUsize,
    open_sessions: Arc<AtomicUsize>,
}

impl MockPortalClient {
    /// Creates a client with no portals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a portal URL.
    pub fn with_portal(self, url: &str, portal: MockPortal) -> Self {
        self.portals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), portal);
        self
    }

    /// Mutates a registered portal.
    pub fn update_portal<F: FnOnce(&mut MockPortal)>(&self, url: &str, f: F) {
        let mut portals = self.portals.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(portal) = portals.get_mut(url) {
            f(portal);
        }
    }

    /// Every login attempt, in call order.
    pub fn logins(&self) -> Vec<LoginCall> {
        self.logins
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of login attempts against a URL.
    pub fn login_count(&self, url: &str) -> usize {
        self.logins().iter().filter(|c| c.url == url).count()
    }

    /// Number of candidate discovery calls.
    pub fn discovery_count(&self) -> usize {
        self.discoveries.load(Ordering::SeqCst)
    }

    /// Sessions opened and not yet logged out.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PortalClient for MockPortalClient {
    async fn auth_variants(&self, url: &str) -> Result<CandidateVariants, PortalError> {
        self.discoveries.fetch_add(1, Ordering::SeqCst);
        let candidates = {
            let portals = self.portals.lock().unwrap_or_else(|e| e.into_inner());
            match portals.get(url) {
                Some(portal) => portal.candidates.clone(),
                None => Err(PortalError::Connection(format!("getaddrinfo ENOTFOUND {url}"))),
            }
        };
        candidates.map(CandidateVariants::from_names)
    }

    async fn login(
        &self,
        credentials: &PortalCredentials,
        variant: &AuthVariant,
    ) -> Result<Box<dyn PortalSession>, PortalError> {
        self.logins
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(LoginCall {
                url: credentials.url.clone(),
                username: credentials.username.clone(),
                variant: variant.to_string(),
            });

        let delay = {
            let portals = self.portals.lock().unwrap_or_else(|e| e.into_inner());
            portals
                .get(&credentials.url)
                .and_then(|p| p.variant_delays.get(variant.as_str()).copied())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let session = {
            let mut portals = self.portals.lock().unwrap_or_else(|e| e.into_inner());
            let portal = portals.get_mut(&credentials.url).ok_or_else(|| {
                PortalError::Connection(format!("getaddrinfo ENOTFOUND {}", credentials.url))
            })?;
            portal.check_login(credentials, variant)?;
            MockSession {
                user: PortalUser {
                    name: Some(format!("Student {}", credentials.username)),
                    student_class: Some("3A".to_string()),
                    establishment: Some("College Test".to_string()),
                },
                assignments: portal.assignments.clone(),
                grades: portal.grades.clone(),
                fetch_failure: portal.fetch_failure.clone(),
                open_sessions: Arc::clone(&self.open_sessions),
            }
        };
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(session))
    }
}

#[derive(Debug)]
struct MockSession {
    user: PortalUser,
    assignments: Vec<Assignment>,
    grades: Option<GradeSet>,
    fetch_failure: Option<PortalError>,
    open_sessions: Arc<AtomicUsize>,
}

#[async_trait]
impl PortalSession for MockSession {
    fn user(&self) -> &PortalUser {
        &self.user
    }

    fn last_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(2099, 7, 4).unwrap_or_default()
    }

    async fn fetch_assignments(
        &self,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<Assignment>, PortalError> {
        match &self.fetch_failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.assignments.clone()),
        }
    }

    async fn fetch_grades(&self, _period: &str) -> Result<Option<GradeSet>, PortalError> {
        match &self.fetch_failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.grades.clone()),
        }
    }

    async fn logout(&self) -> Result<(), PortalError> {
        self.open_sessions.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
