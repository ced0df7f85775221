//! Authentication variant (CAS) a portal instance delegates login to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the authentication backend used by a portal instance.
///
/// The sentinel `"none"` means the portal authenticates directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthVariant(String);

impl AuthVariant {
    /// Sentinel value for portals that need no delegated authentication.
    pub const NONE: &'static str = "none";

    /// Wraps a variant name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The direct-login sentinel.
    pub fn none() -> Self {
        Self(Self::NONE.to_string())
    }

    /// Whether this is the direct-login sentinel.
    pub fn is_none(&self) -> bool {
        self.0 == Self::NONE
    }

    /// Returns the variant name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AuthVariant {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_sentinel() {
        assert!(AuthVariant::none().is_none());
        assert!(!AuthVariant::new("ac-toulouse").is_none());
        assert_eq!(AuthVariant::none().as_str(), "none");
    }
}
