//! # pronotif-core
//!
//! Core crate for Pronote Notifications. Contains configuration schemas,
//! the account key type shared by every layer, and the unified error system.
//!
//! This crate has **no** internal dependencies on other pronotif crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
pub use types::AccountKey;
