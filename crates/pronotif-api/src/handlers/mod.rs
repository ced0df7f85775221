//! Route handlers.

pub mod account;
pub mod health;
pub mod notification;
