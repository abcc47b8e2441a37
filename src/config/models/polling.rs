//! Polling configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler and node defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Interval between scheduler scans in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Maximum node passes in flight at once
    #[serde(default = "default_max_concurrent_passes")]
    pub max_concurrent_passes: usize,
    /// Minimum seconds between passes of one node
    #[serde(default = "default_min_interval_secs")]
    pub default_min_interval_secs: u64,
    /// Consecutive failed passes before a node backs off
    #[serde(default = "default_fails_before_backoff")]
    pub default_fails_before_backoff: u32,
    /// Backoff after repeated failed passes, in seconds
    #[serde(default = "default_backoff_secs")]
    pub default_backoff_secs: u64,
    /// Fetch deadline in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub default_fetch_timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_concurrent_passes: default_max_concurrent_passes(),
            default_min_interval_secs: default_min_interval_secs(),
            default_fails_before_backoff: default_fails_before_backoff(),
            default_backoff_secs: default_backoff_secs(),
            default_fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl PollingConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.default_min_interval_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.default_backoff_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.default_fetch_timeout_secs)
    }
}
