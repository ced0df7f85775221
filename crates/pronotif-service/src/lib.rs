//! # pronotif-service
//!
//! Business logic of the sync engine: the snapshot diff engine, the
//! credential validity tracker, the notification dispatcher, and the account
//! service used by the app API.
//!
//! Services follow constructor injection. All collaborators are provided at
//! construction time via `Arc` references.

pub mod account;
pub mod credential;
pub mod notification;
pub mod snapshot;

pub use account::{AccountService, LoginOutcome, LoginRequest};
pub use credential::{CredentialState, CredentialTracker};
pub use notification::NotificationDispatcher;
pub use snapshot::{DiffOutcome, DiffPolicy, SnapshotDiff};
