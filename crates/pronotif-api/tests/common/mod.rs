//! Shared helpers for the route tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use pronotif_api::jwt::{JwtDecoder, JwtEncoder};
use pronotif_api::{AppState, build_router};
use pronotif_core::config::AuthConfig;
use pronotif_database::mock::MockSyncStore;
use pronotif_portal::mock::MockPortalClient;
use pronotif_portal::{CasResolver, SessionGateway};
use pronotif_service::{AccountService, CredentialTracker};

pub const URL: &str = "https://a.example/pronote/";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// In-memory store behind the service
    pub store: Arc<MockSyncStore>,
}

impl TestApp {
    /// Create a new test application over a fake portal
    pub fn new(client: MockPortalClient) -> Self {
        let store = Arc::new(MockSyncStore::new());
        let resolver = Arc::new(CasResolver::new(SessionGateway::new(Arc::new(client))));
        let credentials = Arc::new(CredentialTracker::new(store.clone()));
        let accounts = Arc::new(AccountService::new(store.clone(), resolver, credentials));

        let auth = AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_days: 1,
        };
        let state = AppState::new(accounts, JwtEncoder::new(&auth), JwtDecoder::new(&auth));

        Self {
            router: build_router(state),
            store,
        }
    }

    /// Log in and return the bearer token
    pub async fn login(&self, password: &str, device: Option<&str>) -> TestResponse {
        let mut body = serde_json::json!({
            "username": "eleve",
            "password": password,
            "url": URL,
        });
        if let Some(device) = device {
            body["device_token"] = Value::String(device.to_string());
        }
        self.request("POST", "/login", Some(body), None).await
    }

    /// Send a request to the router
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        self.request_with_headers(method, path, body, token, &[]).await
    }

    /// Send a request with extra headers
    pub async fn request_with_headers(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    /// The bearer token of a login response
    pub fn token(&self) -> String {
        self.body["data"]["token"]
            .as_str()
            .expect("Response has no token")
            .to_string()
    }
}
