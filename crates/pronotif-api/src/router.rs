//! Route definitions.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Builds the complete Axum router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(account_routes())
        .merge(notification_routes())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::audit::request_audit,
        ))
        .route("/login", post(handlers::account::login))
        .route("/health", get(handlers::health::health))
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Device and settings endpoints. `/login` is registered outside the audit
/// layer so credentials never reach the trail.
fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(handlers::account::logout))
        .route("/device", post(handlers::account::register_device))
        .route("/settings", post(handlers::account::update_settings))
}

/// Notification history endpoints
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(handlers::notification::list_notifications),
        )
        .route(
            "/notifications/read",
            post(handlers::notification::mark_read),
        )
}
