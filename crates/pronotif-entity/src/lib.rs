//! # pronotif-entity
//!
//! Domain entity models for Pronote Notifications. Every struct in this
//! crate represents a database table row or a domain value object. Database
//! entities additionally derive `sqlx::FromRow`.

pub mod account;
pub mod audit;
pub mod device;
pub mod notification;
pub mod snapshot;
