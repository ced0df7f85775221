//! Notification domain entities.

pub mod category;
pub mod model;

pub use category::NotificationCategory;
pub use model::{NotificationEvent, NotificationRecord};
