mod common;

use pronotif_entity::notification::NotificationCategory;
use pronotif_entity::snapshot::{AcademicSnapshot, Assignment, Grade, GradeSet, Subject};
use pronotif_portal::PortalError;
use pronotif_portal::mock::{MockPortal, MockPortalClient};
use pronotif_database::mock::MockSyncStore;
use pronotif_worker::SyncScope;

use common::{URL_A, URL_B, account, harness, invalidated};

fn hw(subject: &str, description: &str) -> Assignment {
    Assignment::new(subject, description)
}

fn grades(subject: &str, ids: &[&str]) -> GradeSet {
    GradeSet {
        subjects: vec![Subject {
            name: subject.to_string(),
            grades: ids
                .iter()
                .map(|id| Grade {
                    id: id.to_string(),
                    value: Some(14.0),
                    scale: 20.0,
                    average: Some(10.0),
                })
                .collect(),
        }],
        empty: false,
    }
}

#[tokio::test]
async fn first_poll_seeds_cache_then_new_assignment_is_pushed() {
    let portal = MockPortal::new()
        .with_account("eleve", "pw")
        .with_assignments(vec![hw("Math", "Ex 4")])
        .with_grades(Some(grades("SVT", &["g1"])));
    let h = harness(MockPortalClient::new().with_portal(URL_A, portal));
    let acc = account("eleve", URL_A, "pw");
    let key = acc.key();
    h.store.insert_account(acc);
    h.store.insert_token(MockSyncStore::token(&key, "tok"));

    let mut first = h.sync.run_sync_cycle(&SyncScope::All).await.unwrap().unwrap();
    first.wait_deliveries().await;
    assert_eq!(first.succeeded, 1);
    assert_eq!(first.notifications, 0);
    let cached = h.store.get_snapshot(&key).unwrap();
    assert_eq!(cached.assignments.as_ref().unwrap().len(), 1);
    assert!(cached.has_grade_baseline());

    h.client.update_portal(URL_A, |p| {
        p.set_assignments(vec![hw("Math", "Ex 4"), hw("Math", "Ex 5")]);
        p.set_grades(Some(grades("SVT", &["g1", "g2"])));
    });
    let mut second = h.sync.run_sync_cycle(&SyncScope::All).await.unwrap().unwrap();
    second.wait_deliveries().await;

    assert_eq!(second.notifications, 2);
    let sent = h.transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].message.category, NotificationCategory::Assignment);
    assert_eq!(sent[0].message.body, "Ex 5");
    assert_eq!(sent[1].message.category, NotificationCategory::Grade);
    assert!(h.store.notifications().iter().all(|n| n.sent_at.is_some()));
    assert!(h.store.get_token("tok").unwrap().last_success_at.is_some());
    assert_eq!(h.client.open_sessions(), 0);
}

#[tokio::test]
async fn burst_of_assignments_updates_cache_silently() {
    let fetched: Vec<Assignment> = (1..=5).map(|i| hw("Math", &format!("Ex {i}"))).collect();
    let portal = MockPortal::new()
        .with_account("eleve", "pw")
        .with_assignments(fetched.clone());
    let h = harness(MockPortalClient::new().with_portal(URL_A, portal));
    let acc = account("eleve", URL_A, "pw");
    let key = acc.key();
    h.store.insert_account(acc);
    h.store.insert_snapshot(
        &key,
        AcademicSnapshot {
            assignments: Some(vec![]),
            grades: None,
        },
    );

    let report = h.sync.run_sync_cycle(&SyncScope::All).await.unwrap().unwrap();
    assert_eq!(report.notifications, 0);
    assert_eq!(h.store.get_snapshot(&key).unwrap().assignments, Some(fetched));
}

#[tokio::test]
async fn wrong_credentials_invalidate_and_exclude_account() {
    let portal = MockPortal::new().with_account("eleve", "new-password");
    let h = harness(MockPortalClient::new().with_portal(URL_A, portal));
    let acc = account("eleve", URL_A, "old-password");
    let key = acc.key();
    h.store.insert_account(acc);

    let report = h.sync.run_sync_cycle(&SyncScope::All).await.unwrap().unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.invalidated, 1);
    assert!(!h.store.get_account(&key).unwrap().credentials_valid);

    let next = h.sync.run_sync_cycle(&SyncScope::All).await.unwrap().unwrap();
    assert_eq!(next.attempted, 0);
    assert_eq!(h.client.login_count(URL_A), 1);
}

#[tokio::test]
async fn transient_failures_keep_account_valid() {
    let portal = MockPortal::new()
        .with_account("eleve", "pw")
        .with_login_failure(PortalError::Connection("read ECONNRESET".into()));
    let h = harness(MockPortalClient::new().with_portal(URL_A, portal));
    let acc = account("eleve", URL_A, "pw");
    let key = acc.key();
    h.store.insert_account(acc);

    let report = h.sync.run_sync_cycle(&SyncScope::All).await.unwrap().unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.invalidated, 0);
    assert!(h.store.credential_updates().is_empty());
    assert!(h.store.get_account(&key).unwrap().credentials_valid);

    let next = h.sync.run_sync_cycle(&SyncScope::All).await.unwrap().unwrap();
    assert_eq!(next.attempted, 1);
}

#[tokio::test]
async fn session_is_released_when_fetch_fails() {
    let portal = MockPortal::new()
        .with_account("eleve", "pw")
        .with_fetch_failure(PortalError::Rejected {
            code: None,
            message: "Session has expired due to inactivity or error".into(),
        });
    let h = harness(MockPortalClient::new().with_portal(URL_A, portal));
    let acc = account("eleve", URL_A, "pw");
    let key = acc.key();
    h.store.insert_account(acc);

    let report = h.sync.run_sync_cycle(&SyncScope::All).await.unwrap().unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(h.client.open_sessions(), 0);
    assert!(h.store.get_snapshot(&key).is_none());
    assert!(h.store.get_account(&key).unwrap().credentials_valid);
}

#[tokio::test]
async fn one_failing_account_does_not_abort_cycle() {
    let client = MockPortalClient::new()
        .with_portal(
            URL_A,
            MockPortal::new()
                .with_login_failure(PortalError::Timeout("connect ETIMEDOUT".into())),
        )
        .with_portal(URL_B, MockPortal::new().with_account("bob", "pw"));
    let h = harness(client);
    h.store.insert_account(account("alice", URL_A, "pw"));
    h.store.insert_account(account("bob", URL_B, "pw"));

    let report = h.sync.run_sync_cycle(&SyncScope::All).await.unwrap().unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn scoped_cycle_only_touches_named_account() {
    let portal = MockPortal::new()
        .with_account("alice", "pw")
        .with_account("bob", "pw");
    let h = harness(MockPortalClient::new().with_portal(URL_A, portal));
    h.store.insert_account(account("alice", URL_A, "pw"));
    h.store.insert_account(account("bob", URL_A, "pw"));
    h.store.insert_account(invalidated("carol", URL_A, "pw"));

    let report = h
        .sync
        .run_sync_cycle(&"bob".parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.attempted, 1);
    let logins = h.client.logins();
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0].username, "bob");
}

#[tokio::test]
async fn unknown_variant_is_resolved_before_login() {
    let portal = MockPortal::new()
        .with_account("eleve", "pw")
        .with_candidates(&["ac-lyon", "ac-grenoble"], "ac-grenoble");
    let h = harness(MockPortalClient::new().with_portal(URL_A, portal));
    h.store
        .insert_account(MockSyncStore::account("eleve", URL_A, "pw"));

    let report = h.sync.run_sync_cycle(&SyncScope::All).await.unwrap().unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(h.client.discovery_count(), 1);
    assert_eq!(h.client.open_sessions(), 0);
}
