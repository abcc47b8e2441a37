//! Cache type definitions

use crate::core::registry::InFlightGuard;
use crate::core::status::{MonitorStatus, MonitorStatusSource};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Future returned by a fetch closure
pub type FetchFuture<T> = BoxFuture<'static, Result<T>>;

/// Caller-owned fetch closure for a cache entry
pub type FetchFn<T> = Arc<dyn Fn() -> FetchFuture<T> + Send + Sync>;

/// What a refresh attempt did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// The fetch succeeded and the data was replaced
    Success,
    /// The fetch failed or timed out; prior data was kept
    Failed,
    /// A concurrent refresh already did the work
    Skipped,
}

impl RefreshOutcome {
    /// Whether the attempt stored fresh data
    pub fn is_success(self) -> bool {
        self == RefreshOutcome::Success
    }

    /// Whether a fetch actually ran
    pub fn ran(self) -> bool {
        self != RefreshOutcome::Skipped
    }
}

/// Receives completion notices from the caches it owns
pub trait CacheOwner: Send + Sync {
    /// Called when an owned cache starts a fetch; the guard is held until
    /// the fetch finishes
    fn refresh_started(&self) -> Option<InFlightGuard> {
        None
    }

    /// Called after every completed (not skipped) refresh of an owned cache
    fn cache_completed(&self, cache_id: Uuid, outcome: RefreshOutcome);
}

/// Read-only snapshot of a cache entry for presentation layers
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub id: Uuid,
    pub name: String,
    pub status: MonitorStatus,
    pub reason: Option<String>,
    pub has_data: bool,
    pub is_polling: bool,
    pub last_poll: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_poll_duration_ms: Option<u64>,
    pub polls_total: u64,
    pub polls_successful: u64,
    pub consecutive_failures: u32,
    pub error_message: Option<String>,
}

/// Type-erased view of a cache entry, independent of its payload type
///
/// Nodes schedule and report on their caches through this trait.
#[async_trait]
pub trait Pollable: MonitorStatusSource + Send + Sync {
    /// Unique id of the cache
    fn id(&self) -> Uuid;

    /// Display name of the cache
    fn name(&self) -> &str;

    /// Whether the cache is due for a refresh
    fn should_poll(&self) -> bool;

    /// Whether a refresh is currently running
    fn is_polling(&self) -> bool;

    /// Whether this cache counts toward its node's aggregate status
    fn affects_node_status(&self) -> bool;

    /// Wall-clock time of the last completed attempt
    fn last_poll_at(&self) -> Option<DateTime<Utc>>;

    /// Run the single-flight refresh
    async fn refresh(&self, force: bool) -> RefreshOutcome;

    /// Attach the node that should hear about completed refreshes
    fn set_owner(&self, owner: Weak<dyn CacheOwner>);

    /// Snapshot for presentation layers
    fn info(&self) -> CacheInfo;
}
