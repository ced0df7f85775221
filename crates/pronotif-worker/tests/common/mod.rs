//! Shared fixtures for the synchronizer tests.

#![allow(dead_code)]

use std::sync::Arc;

use pronotif_core::config::SyncConfig;
use pronotif_database::mock::MockSyncStore;
use pronotif_entity::account::Account;
use pronotif_portal::mock::MockPortalClient;
use pronotif_portal::{CasResolver, SessionGateway};
use pronotif_push::mock::MockPushTransport;
use pronotif_service::{CredentialTracker, NotificationDispatcher};
use pronotif_worker::Synchronizer;

pub const URL_A: &str = "https://a.example/pronote/";
pub const URL_B: &str = "https://b.example/pronote/";

pub struct Harness {
    pub store: Arc<MockSyncStore>,
    pub client: Arc<MockPortalClient>,
    pub transport: Arc<MockPushTransport>,
    pub sync: Synchronizer,
}

pub fn harness(client: MockPortalClient) -> Harness {
    let store = Arc::new(MockSyncStore::new());
    let client = Arc::new(client);
    let transport = Arc::new(MockPushTransport::new());

    let resolver = Arc::new(CasResolver::new(SessionGateway::new(client.clone())));
    let credentials = Arc::new(CredentialTracker::new(store.clone()));
    let dispatcher = NotificationDispatcher::new(store.clone(), transport.clone());
    let config = SyncConfig {
        account_delay_ms: 0,
        ..SyncConfig::default()
    };
    let sync = Synchronizer::new(
        store.clone(),
        resolver,
        credentials,
        dispatcher,
        &config,
        "trimester",
    );

    Harness {
        store,
        client,
        transport,
        sync,
    }
}

/// An account with a known direct-login variant.
pub fn account(username: &str, url: &str, password: &str) -> Account {
    let mut account = MockSyncStore::account(username, url, password);
    account.auth_variant = Some("none".to_string());
    account
}

/// An account whose credentials were already invalidated.
pub fn invalidated(username: &str, url: &str, password: &str) -> Account {
    let mut account = account(username, url, password);
    account.credentials_valid = false;
    account
}
