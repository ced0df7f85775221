//! Account lifecycle: login, devices, settings, notification history.

pub mod service;

pub use service::{AccountService, LoginOutcome, LoginRequest};
