//! Push device registrations.

pub mod model;

pub use model::{DeviceToken, TokenSettings};
