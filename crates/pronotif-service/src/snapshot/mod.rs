//! Change detection between two academic snapshots.

pub mod diff;

pub use diff::{DiffOutcome, DiffPolicy, SnapshotDiff};
