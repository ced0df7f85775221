//! Notification category enumeration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What kind of academic change a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    /// A new homework assignment.
    Assignment,
    /// A new grade.
    Grade,
}

impl NotificationCategory {
    /// Returns the category as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assignment => "assignment",
            Self::Grade => "grade",
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assignment" | "homework" => Ok(Self::Assignment),
            "grade" | "mark" => Ok(Self::Grade),
            other => Err(format!("Unknown notification category: '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_legacy_names() {
        assert_eq!(
            "homework".parse::<NotificationCategory>().unwrap(),
            NotificationCategory::Assignment
        );
        assert_eq!(
            "mark".parse::<NotificationCategory>().unwrap(),
            NotificationCategory::Grade
        );
        assert!("email".parse::<NotificationCategory>().is_err());
    }
}
