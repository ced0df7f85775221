//! Notification fan-out to device tokens.

pub mod dispatcher;

pub use dispatcher::NotificationDispatcher;
