//! Shared value types.

pub mod account_key;

pub use account_key::AccountKey;
