//! Route tests over the in-memory store and a fake portal.

mod common;

use axum::http::StatusCode;

use pronotif_core::AccountKey;
use pronotif_entity::notification::{NotificationCategory, NotificationEvent};
use pronotif_portal::PortalError;
use pronotif_portal::mock::{MockPortal, MockPortalClient};
use pronotif_database::SyncStore;

use common::{TestApp, URL};

fn app() -> TestApp {
    TestApp::new(MockPortalClient::new().with_portal(URL, MockPortal::new().with_account("eleve", "pw")))
}

#[tokio::test]
async fn test_login_registers_account_and_device() {
    let app = app();
    let response = app.login("pw", Some("fcm-1")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["created"], true);
    assert_eq!(response.body["data"]["full_name"], "Student eleve");
    assert_eq!(response.body["data"]["device"]["notify_grades"], true);
    assert!(!app.login("pw", None).await.token().is_empty());

    let key = AccountKey::new("eleve", URL);
    assert!(app.store.get_account(&key).unwrap().credentials_valid);
    assert!(app.store.get_token("fcm-1").unwrap().is_active);
}

#[tokio::test]
async fn test_wrong_password_is_forbidden() {
    let response = app().login("nope", None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_unreachable_portal_is_unavailable() {
    let portal = MockPortal::new()
        .with_account("eleve", "pw")
        .with_login_failure(PortalError::Connection("connect ECONNREFUSED".into()));
    let app = TestApp::new(MockPortalClient::new().with_portal(URL, portal));

    let response = app.login("pw", None).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_invalid_body_is_rejected() {
    let response = app()
        .request(
            "POST",
            "/login",
            Some(serde_json::json!({ "username": "", "password": "pw", "url": URL })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_legacy_field_names_accepted() {
    let response = app()
        .request(
            "POST",
            "/login",
            Some(serde_json::json!({
                "pronote_username": "eleve",
                "pronote_password": "pw",
                "pronote_url": URL,
                "fcm_token": "fcm-legacy",
            })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_require_bearer() {
    let app = app();
    let response = app.request("GET", "/notifications", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .request("GET", "/notifications", None, Some("not-a-token"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_settings_and_logout_act_on_bound_device() {
    let app = app();
    let token = app.login("pw", Some("fcm-1")).await.token();

    let response = app
        .request(
            "POST",
            "/settings",
            Some(serde_json::json!({ "notify_assignments": false })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["notify_assignments"], false);
    assert_eq!(response.body["data"]["notify_grades"], true);

    let response = app.request("POST", "/logout", None, Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(!app.store.get_token("fcm-1").unwrap().is_active);
}

#[tokio::test]
async fn test_authenticated_calls_are_audited() {
    let app = app();
    let token = app.login("pw", Some("fcm-1")).await.token();
    assert!(app.store.request_logs().is_empty());

    let response = app
        .request_with_headers(
            "POST",
            "/settings",
            Some(serde_json::json!({ "notify_grades": false })),
            Some(&token),
            &[("App-Version", "2.4.1")],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let logs = app.store.request_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].account_key(), AccountKey::new("eleve", URL));
    assert_eq!(logs[0].route, "/settings");
    assert_eq!(logs[0].device_token.as_deref(), Some("fcm-1"));
    assert_eq!(logs[0].app_version.as_deref(), Some("2.4.1"));
    assert!(logs[0].token_id.is_some());
    assert_eq!(logs[0].body.as_ref().unwrap()["notify_grades"], false);
}

#[tokio::test]
async fn test_login_and_anonymous_calls_are_not_audited() {
    let app = app();
    let token = app.login("pw", Some("fcm-1")).await.token();

    let response = app
        .request(
            "POST",
            "/login",
            Some(serde_json::json!({ "username": "eleve", "password": "pw", "url": URL })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let response = app.request("GET", "/notifications", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    assert!(app.store.request_logs().is_empty());
}

#[tokio::test]
async fn test_settings_without_device_is_rejected() {
    let app = app();
    let token = app.login("pw", None).await.token();
    let response = app
        .request(
            "POST",
            "/settings",
            Some(serde_json::json!({ "notify_grades": false })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_device_rebinds_token() {
    let app = app();
    let token = app.login("pw", None).await.token();

    let response = app
        .request(
            "POST",
            "/device",
            Some(serde_json::json!({ "device_token": "fcm-2" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let bound = response.token();

    let response = app.request("POST", "/logout", None, Some(&bound)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(!app.store.get_token("fcm-2").unwrap().is_active);
}

#[tokio::test]
async fn test_history_and_mark_read() {
    let app = app();
    let token = app.login("pw", None).await.token();
    let key = AccountKey::new("eleve", URL);
    let event = NotificationEvent::new(NotificationCategory::Grade, "Nouvelle note en SVT", "Note: 15/20");
    let record = app
        .store
        .create_notification_record(&key, &event)
        .await
        .unwrap();

    let response = app
        .request("GET", "/notifications?limit=10", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"][0]["category"], "grade");
    assert_eq!(response.body["data"][0]["title"], "Nouvelle note en SVT");

    let response = app
        .request(
            "POST",
            "/notifications/read",
            Some(serde_json::json!({ "id": record.id })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(app.store.notifications()[0].read_at.is_some());

    let response = app
        .request(
            "POST",
            "/notifications/read",
            Some(serde_json::json!({ "id": uuid::Uuid::new_v4() })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let response = app().request("GET", "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
}
