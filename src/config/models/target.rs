//! Probe target configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An HTTP endpoint probed by the bundled binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpTargetConfig {
    /// Unique name of the target
    pub name: String,
    /// URL fetched with GET
    pub url: String,
    /// Seconds a successful probe stays fresh
    #[serde(default = "default_target_interval_secs")]
    pub interval_secs: u64,
    /// Per-probe deadline; falls back to the polling default
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Latency above which the target reports a warning
    #[serde(default = "default_latency_warning_ms")]
    pub latency_warning_ms: u64,
    /// Whether the target represents a whole cluster
    #[serde(default)]
    pub cluster: bool,
}

impl HttpTargetConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            interval_secs: default_target_interval_secs(),
            timeout_secs: None,
            latency_warning_ms: default_latency_warning_ms(),
            cluster: false,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn latency_warning(&self) -> Duration {
        Duration::from_millis(self.latency_warning_ms)
    }
}
