//! # pronotif-push
//!
//! Push delivery for notification batches. [`PushTransport`] is the seam the
//! dispatcher sends through; [`FcmTransport`] implements it against Firebase
//! Cloud Messaging.

pub mod fcm;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod transport;

pub use fcm::FcmTransport;
pub use transport::{DeliveryResult, PushError, PushMessage, PushTransport};
