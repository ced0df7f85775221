//! Portal account entities.

pub mod auth_variant;
pub mod model;

pub use auth_variant::AuthVariant;
pub use model::{Account, AccountProfile, CreateAccount};
