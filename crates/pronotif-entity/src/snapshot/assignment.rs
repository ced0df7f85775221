//! Homework assignment value object.

use serde::{Deserialize, Serialize};

/// A homework assignment as published on the portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Subject the assignment belongs to.
    pub subject: String,
    /// Assignment text. Used as the identity when diffing.
    pub description: String,
}

impl Assignment {
    /// Creates a new assignment.
    pub fn new(subject: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            description: description.into(),
        }
    }
}
