//! Background synchronization for Pronote Notifications.
//!
//! This crate provides:
//! - The [`Synchronizer`], which runs the periodic sync cycle and the
//!   invalidation-recheck cycle
//! - The [`SyncScheduler`], which drives both cycles on fixed intervals

pub mod scheduler;
pub mod synchronizer;

pub use scheduler::SyncScheduler;
pub use synchronizer::{RecheckReport, SyncReport, SyncScope, Synchronizer};
