//! Audit trail of authenticated API calls.

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use pronotif_core::error::AppError;
use pronotif_entity::audit::CreateRequestLog;

use crate::error::ApiError;
use crate::extractors::auth::bearer_token;
use crate::state::AppState;

/// Header carrying the mobile app version.
pub const APP_VERSION_HEADER: &str = "app-version";

const MAX_AUDITED_BODY: usize = 64 * 1024;

/// Records route, app version, device token, and JSON body of every call
/// made with a valid bearer token. Anonymous calls pass through untouched.
pub async fn request_audit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(claims) = bearer_token(request.headers())
        .ok()
        .and_then(|token| state.jwt_decoder.decode(token).ok())
    else {
        return next.run(request).await;
    };

    let route = request.uri().path().to_owned();
    let app_version = app_version(request.headers());
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_AUDITED_BODY).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return ApiError::from(AppError::validation("Request body too large")).into_response();
        }
    };
    let body_json = serde_json::from_slice::<serde_json::Value>(&bytes).ok();

    let response = next
        .run(Request::from_parts(parts, Body::from(bytes)))
        .await;

    let log = CreateRequestLog {
        account: claims.account_key(),
        route,
        device_token: claims.device.clone(),
        app_version,
        token_id: Some(claims.jti.to_string()),
        body: body_json,
    };
    if let Err(e) = state.accounts.record_request(log).await {
        tracing::warn!(account = %claims.account_key(), error = %e, "Failed to record API call");
    }

    response
}

fn app_version(headers: &HeaderMap) -> Option<String> {
    headers
        .get(APP_VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}
