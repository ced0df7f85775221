//! Grade value objects.

use serde::{Deserialize, Serialize};

/// A single grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    /// Portal identifier of the grade.
    pub id: String,
    /// Numeric value. Absent when the student was exempted or the grade is pending.
    #[serde(default)]
    pub value: Option<f64>,
    /// Grading scale (e.g. 20).
    pub scale: f64,
    /// Class average for this evaluation.
    #[serde(default)]
    pub average: Option<f64>,
}

/// All grades of one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject name.
    pub name: String,
    /// Grades recorded for the subject.
    #[serde(default)]
    pub grades: Vec<Grade>,
}

impl Subject {
    /// Whether a grade with this identifier is present.
    pub fn has_grade(&self, id: &str) -> bool {
        self.grades.iter().any(|g| g.id == id)
    }
}

/// Grades of a period, grouped by subject.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GradeSet {
    /// Subjects in portal order.
    #[serde(default)]
    pub subjects: Vec<Subject>,
    /// Set when the portal returned no grade data at all.
    #[serde(default)]
    pub empty: bool,
}

impl GradeSet {
    /// A grade set standing for "portal returned nothing".
    pub fn empty() -> Self {
        Self {
            subjects: Vec::new(),
            empty: true,
        }
    }

    /// Looks up a subject by name.
    pub fn subject(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.name == name)
    }

    /// Total number of grades across all subjects.
    pub fn grade_count(&self) -> usize {
        self.subjects.iter().map(|s| s.grades.len()).sum()
    }
}
