//! # pronotif-api
//!
//! Thin HTTP surface for the mobile app, built on Axum.
//!
//! Exposes account login, device registration and settings, and the
//! notification history. Requests after login carry a bearer token bound to
//! the account and the device token. No synchronization logic lives here.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::serve;
pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
