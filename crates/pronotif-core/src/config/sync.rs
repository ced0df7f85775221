//! Synchronization timers and diff thresholds.

use serde::{Deserialize, Serialize};

/// Settings for the polling cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Whether the recurring timers are started.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval between two periodic sync cycles, in seconds.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// Interval between two invalidation-recheck cycles, in seconds.
    #[serde(default = "default_recheck_interval")]
    pub recheck_interval_seconds: u64,
    /// Pause between two accounts within a cycle, in milliseconds.
    #[serde(default = "default_account_delay")]
    pub account_delay_ms: u64,
    /// Largest number of new assignments still notified (inclusive).
    #[serde(default = "default_burst_limit")]
    pub assignment_burst_limit: usize,
    /// Number of new grades from which notifications are withheld (exclusive).
    #[serde(default = "default_burst_limit")]
    pub grade_burst_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: default_interval(),
            recheck_interval_seconds: default_recheck_interval(),
            account_delay_ms: default_account_delay(),
            assignment_burst_limit: default_burst_limit(),
            grade_burst_limit: default_burst_limit(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_interval() -> u64 {
    1800
}

fn default_recheck_interval() -> u64 {
    21_600
}

fn default_account_delay() -> u64 {
    1500
}

fn default_burst_limit() -> usize {
    3
}
