//! Request extractors.

pub mod auth;
pub mod json;

pub use auth::AuthAccount;
pub use json::ValidatedJson;
