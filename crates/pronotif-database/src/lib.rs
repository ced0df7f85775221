//! # pronotif-database
//!
//! PostgreSQL connection management, concrete repositories, and the
//! [`SyncStore`]/[`AccountStore`] interfaces consumed by the sync engine
//! and the account service.

#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod pool;
pub mod repositories;
pub mod store;

pub use pool::Database;
pub use store::{AccountStore, PgStore, SyncStore};
