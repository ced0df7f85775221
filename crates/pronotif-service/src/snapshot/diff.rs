//! Snapshot diff engine.
//!
//! Compares freshly fetched assignments and grades with the cached snapshot
//! and produces the notifications to send. The cache is always replaced by
//! the fetched data, whether or not anything was notified.
//!
//! Bursts are withheld: when a poll reveals many new items at once they are
//! most likely a bulk import, not organic publication. The assignment limit
//! is inclusive while the grade limit is exclusive.

use pronotif_core::config::SyncConfig;
use pronotif_entity::notification::{NotificationCategory, NotificationEvent};
use pronotif_entity::snapshot::{AcademicSnapshot, Assignment, Grade, GradeSet, Subject};

/// Burst suppression thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffPolicy {
    /// Largest number of new assignments still notified.
    pub assignment_burst_limit: usize,
    /// Number of new grades from which nothing is notified.
    pub grade_burst_limit: usize,
}

impl Default for DiffPolicy {
    fn default() -> Self {
        Self {
            assignment_burst_limit: 3,
            grade_burst_limit: 3,
        }
    }
}

impl From<&SyncConfig> for DiffPolicy {
    fn from(config: &SyncConfig) -> Self {
        Self {
            assignment_burst_limit: config.assignment_burst_limit,
            grade_burst_limit: config.grade_burst_limit,
        }
    }
}

impl DiffPolicy {
    fn notify_assignments(&self, count: usize) -> bool {
        count > 0 && count <= self.assignment_burst_limit
    }

    fn notify_grades(&self, count: usize) -> bool {
        count > 0 && count < self.grade_burst_limit
    }
}

/// Result of one diff pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffOutcome {
    /// Notifications to send, assignments first.
    pub events: Vec<NotificationEvent>,
    /// Snapshot to persist.
    pub snapshot: AcademicSnapshot,
    /// New assignments detected, notified or not.
    pub new_assignments: usize,
    /// New grades detected, notified or not.
    pub new_grades: usize,
}

/// Pure diff engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotDiff {
    policy: DiffPolicy,
}

impl SnapshotDiff {
    /// Creates an engine with the given thresholds.
    pub fn new(policy: DiffPolicy) -> Self {
        Self { policy }
    }

    /// Returns the thresholds in use.
    pub fn policy(&self) -> DiffPolicy {
        self.policy
    }

    /// Diffs fetched data against the cached snapshot.
    ///
    /// `grades` is `None` when the portal returned no grade data; the new
    /// snapshot then records an empty grade set.
    pub fn diff(
        &self,
        old: &AcademicSnapshot,
        assignments: Vec<Assignment>,
        grades: Option<GradeSet>,
    ) -> DiffOutcome {
        let mut events = Vec::new();

        let mut new_assignments = 0;
        if let Some(cached) = &old.assignments {
            let fresh: Vec<&Assignment> = assignments
                .iter()
                .filter(|a| !cached.iter().any(|c| c.description == a.description))
                .collect();
            new_assignments = fresh.len();
            if self.policy.notify_assignments(new_assignments) {
                events.extend(fresh.into_iter().map(assignment_event));
            }
        }

        let grades = grades.unwrap_or_else(GradeSet::empty);
        let mut new_grades = 0;
        if let Some(cached) = old.grades.as_ref().filter(|g| !g.empty) {
            let fresh = new_grades_since(cached, &grades);
            new_grades = fresh.len();
            if self.policy.notify_grades(new_grades) {
                events.extend(
                    fresh
                        .into_iter()
                        .map(|(subject, grade)| grade_event(subject, grade)),
                );
            }
        }

        DiffOutcome {
            events,
            snapshot: AcademicSnapshot {
                assignments: Some(assignments),
                grades: Some(grades),
            },
            new_assignments,
            new_grades,
        }
    }
}

/// Grades of `fresh` that the cache does not know, in portal order.
///
/// A subject absent from the cache contributes all of its grades.
fn new_grades_since<'a>(cached: &GradeSet, fresh: &'a GradeSet) -> Vec<(&'a Subject, &'a Grade)> {
    let mut found = Vec::new();
    for subject in &fresh.subjects {
        match cached.subject(&subject.name) {
            Some(known) => found.extend(
                subject
                    .grades
                    .iter()
                    .filter(|g| !known.has_grade(&g.id))
                    .map(|g| (subject, g)),
            ),
            None => found.extend(subject.grades.iter().map(|g| (subject, g))),
        }
    }
    found
}

fn assignment_event(assignment: &Assignment) -> NotificationEvent {
    NotificationEvent::new(
        NotificationCategory::Assignment,
        format!("Nouveau devoir en {}", assignment.subject),
        assignment.description.clone(),
    )
}

fn grade_event(subject: &Subject, grade: &Grade) -> NotificationEvent {
    let mut body = String::new();
    if let Some(value) = grade.value {
        body.push_str(&format!("Note: {value}/{}\n", grade.scale));
    }
    if let Some(average) = grade.average {
        body.push_str(&format!("Moyenne de la classe: {average}/{}", grade.scale));
    }
    NotificationEvent::new(
        NotificationCategory::Grade,
        format!("Nouvelle note en {}", subject.name),
        body.trim_end().to_string(),
    )
}
