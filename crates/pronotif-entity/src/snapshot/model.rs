//! Snapshot entity and its database row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use super::assignment::Assignment;
use super::grade::GradeSet;

/// Last-observed academic state of an account.
///
/// Either half may be absent when the account has never been polled
/// successfully.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AcademicSnapshot {
    /// Cached assignments, in portal order.
    pub assignments: Option<Vec<Assignment>>,
    /// Cached grades.
    pub grades: Option<GradeSet>,
}

impl AcademicSnapshot {
    /// Whether the cached grades can serve as a diff baseline.
    pub fn has_grade_baseline(&self) -> bool {
        self.grades.as_ref().is_some_and(|g| !g.empty)
    }
}

/// `account_snapshots` table row.
#[derive(Debug, Clone, FromRow)]
pub struct SnapshotRow {
    /// Owning account username.
    pub username: String,
    /// Owning account portal URL.
    pub url: String,
    /// Cached assignments as JSON.
    pub assignments: Option<Json<Vec<Assignment>>>,
    /// Cached grades as JSON.
    pub grades: Option<Json<GradeSet>>,
    /// When the snapshot was last replaced.
    pub last_update_at: Option<DateTime<Utc>>,
}

impl From<SnapshotRow> for AcademicSnapshot {
    fn from(row: SnapshotRow) -> Self {
        Self {
            assignments: row.assignments.map(|Json(a)| a),
            grades: row.grades.map(|Json(g)| g),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_baseline() {
        assert!(!AcademicSnapshot::default().has_grade_baseline());

        let empty = AcademicSnapshot {
            assignments: None,
            grades: Some(GradeSet::empty()),
        };
        assert!(!empty.has_grade_baseline());

        let filled = AcademicSnapshot {
            assignments: None,
            grades: Some(GradeSet::default()),
        };
        assert!(filled.has_grade_baseline());
    }

    #[test]
    fn test_grade_json_tolerates_missing_value() {
        let raw = r#"{"subjects":[{"name":"SVT","grades":[{"id":"g3","scale":20}]}]}"#;
        let set: GradeSet = serde_json::from_str(raw).unwrap();
        assert!(!set.empty);
        assert_eq!(set.grade_count(), 1);
        assert_eq!(set.subjects[0].grades[0].value, None);
    }
}
