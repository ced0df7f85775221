//! Cached academic state used as the diff baseline.

pub mod assignment;
pub mod grade;
pub mod model;

pub use assignment::Assignment;
pub use grade::{Grade, GradeSet, Subject};
pub use model::{AcademicSnapshot, SnapshotRow};
