//! Node type definitions

use crate::core::cache::CacheInfo;
use crate::core::status::MonitorStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default minimum time between two passes of a node
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of consecutive failed passes before backing off
pub const DEFAULT_FAILS_BEFORE_BACKOFF: u32 = 3;

/// Default backoff after too many failed passes
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(120);

/// Registry identity of a node: the concrete target type plus a key unique
/// within that type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub kind: String,
    pub key: String,
}

impl NodeKey {
    pub fn new(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.key)
    }
}

/// What the domain reports about a node beyond its caches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainStatus {
    /// Individual domain checks; the node status is the worst of them
    pub statuses: Vec<MonitorStatus>,
    /// Explanation shown when the result is not `Good`
    pub reason: Option<String>,
}

impl DomainStatus {
    /// A single check with an optional reason
    pub fn single(status: MonitorStatus, reason: Option<String>) -> Self {
        Self {
            statuses: vec![status],
            reason,
        }
    }

    /// Everything checked out
    pub fn good() -> Self {
        Self::single(MonitorStatus::Good, None)
    }
}

/// Domain status hook evaluated when the node's caches are all healthy
pub type StatusHook = Arc<dyn Fn() -> DomainStatus + Send + Sync>;

/// Counts for one completed pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Entries dispatched for refresh
    pub dispatched: usize,
    /// Refreshes that stored fresh data
    pub succeeded: usize,
    /// Refreshes that failed, timed out or panicked
    pub failed: usize,
    /// Refreshes that found a racer had already done the work
    pub skipped: usize,
    #[serde(skip)]
    pub duration: Duration,
}

impl PassReport {
    /// A pass fails only when every refresh it ran failed
    pub fn is_failure(&self) -> bool {
        self.failed > 0 && self.succeeded == 0 && self.skipped == 0
    }
}

/// Result of asking a node to run a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Another pass was already running; nothing was done
    AlreadyPolling,
    /// The pass ran to completion
    Completed(PassReport),
}

impl PassOutcome {
    pub fn ran(&self) -> bool {
        matches!(self, PassOutcome::Completed(_))
    }

    pub fn report(&self) -> Option<&PassReport> {
        match self {
            PassOutcome::Completed(report) => Some(report),
            PassOutcome::AlreadyPolling => None,
        }
    }
}

/// Read-only snapshot of a node for presentation layers
#[derive(Debug, Clone, Serialize)]
pub struct NodeInfo {
    pub kind: String,
    pub key: String,
    pub status: MonitorStatus,
    pub reason: Option<String>,
    pub is_cluster: bool,
    pub is_polling: bool,
    pub in_backoff: bool,
    pub last_poll: Option<DateTime<Utc>>,
    pub last_poll_duration_ms: Option<u64>,
    pub consecutive_failures: u32,
    pub passes_total: u64,
    pub passes_failed: u64,
    pub caches: Vec<CacheInfo>,
}
