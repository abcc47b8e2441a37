//! Issue report configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Caching of the merged issue list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuesConfig {
    /// Fresh window in seconds
    #[serde(default = "default_issues_cache_secs")]
    pub cache_secs: u64,
    /// How long a stale list may still be served, in seconds
    #[serde(default = "default_issues_stale_secs")]
    pub stale_secs: u64,
}

impl Default for IssuesConfig {
    fn default() -> Self {
        Self {
            cache_secs: default_issues_cache_secs(),
            stale_secs: default_issues_stale_secs(),
        }
    }
}

impl IssuesConfig {
    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_secs)
    }

    pub fn stale_window(&self) -> Duration {
        Duration::from_secs(self.stale_secs)
    }
}
