//! Identity of a portal account.
//!
//! An account is identified by the pair (username, portal base URL): the
//! same username may exist on several school portals.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Composite key identifying a portal account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountKey {
    /// Portal login name.
    pub username: String,
    /// Portal base URL.
    pub url: String,
}

impl AccountKey {
    /// Creates a new account key.
    pub fn new(username: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            url: url.into(),
        }
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.url)
    }
}
