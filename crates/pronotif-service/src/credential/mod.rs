//! Per-account credential validity.

pub mod tracker;

pub use tracker::{CredentialState, CredentialTracker};
