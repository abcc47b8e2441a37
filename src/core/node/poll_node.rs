//! Poll node implementation

use super::types::{
    DEFAULT_BACKOFF, DEFAULT_FAILS_BEFORE_BACKOFF, DEFAULT_MIN_INTERVAL, DomainStatus, NodeInfo,
    NodeKey, PassOutcome, PassReport, StatusHook,
};
use crate::config::PollingConfig;
use crate::core::cache::{CacheOwner, Pollable, RefreshOutcome};
use crate::core::issues::{Issue, IssueProvider};
use crate::core::registry::{InFlightGuard, PollingRegistry, RegistryStats};
use crate::core::status::{MonitorStatus, MonitorStatusSource, worst_of};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::RwLock;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};
use uuid::Uuid;

#[derive(Default)]
struct NodeState {
    last_poll: Option<Instant>,
    last_poll_at: Option<DateTime<Utc>>,
    last_poll_duration: Option<Duration>,
    consecutive_failures: u32,
}

struct StatusMemo {
    generation: u64,
    status: MonitorStatus,
    reason: Option<String>,
}

/// Clears the pass flag when the pass ends, however it ends
struct PassFlag<'a>(&'a AtomicBool);

impl Drop for PassFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A named group of cache entries representing one monitored target
///
/// The node decides when a pass is due, refreshes its stale entries in
/// parallel and rolls their health up into one memoized status. Nodes are
/// identified by their [`NodeKey`]; two nodes with the same kind and key are
/// equal.
pub struct PollNode {
    id: NodeKey,
    label: String,
    caches: Vec<Arc<dyn Pollable>>,
    min_interval: Duration,
    fails_before_backoff: u32,
    backoff: Duration,
    status_hook: Option<StatusHook>,
    is_cluster: bool,
    state: RwLock<NodeState>,
    is_polling: AtomicBool,
    generation: AtomicU64,
    memo: RwLock<Option<StatusMemo>>,
    passes_total: AtomicU64,
    passes_failed: AtomicU64,
    stats: OnceLock<Arc<RegistryStats>>,
}

/// Builder for [`PollNode`]
pub struct PollNodeBuilder {
    id: NodeKey,
    caches: Vec<Arc<dyn Pollable>>,
    min_interval: Duration,
    fails_before_backoff: u32,
    backoff: Duration,
    status_hook: Option<StatusHook>,
    is_cluster: bool,
}

impl PollNodeBuilder {
    /// Add a cache entry; entries keep their insertion order
    pub fn with_cache(mut self, cache: Arc<dyn Pollable>) -> Self {
        self.caches.push(cache);
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn with_fails_before_backoff(mut self, fails: u32) -> Self {
        self.fails_before_backoff = fails;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Take interval and backoff defaults from configuration
    pub fn with_polling_config(self, config: &PollingConfig) -> Self {
        self.with_min_interval(config.min_interval())
            .with_fails_before_backoff(config.default_fails_before_backoff)
            .with_backoff(config.backoff())
    }

    /// Domain status consulted when every status-affecting cache is `Good`
    pub fn with_status_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> DomainStatus + Send + Sync + 'static,
    {
        self.status_hook = Some(Arc::new(hook));
        self
    }

    /// Mark the node as cluster-level; its issues sort first
    pub fn with_cluster(mut self, is_cluster: bool) -> Self {
        self.is_cluster = is_cluster;
        self
    }

    /// Build the node and attach it as the owner of its caches
    pub fn build(self) -> Arc<PollNode> {
        Arc::new_cyclic(|weak: &Weak<PollNode>| {
            let owner: Weak<dyn CacheOwner> = weak.clone();
            for cache in &self.caches {
                cache.set_owner(owner.clone());
            }

            PollNode {
                label: self.id.to_string(),
                id: self.id,
                caches: self.caches,
                min_interval: self.min_interval,
                fails_before_backoff: self.fails_before_backoff,
                backoff: self.backoff,
                status_hook: self.status_hook,
                is_cluster: self.is_cluster,
                state: RwLock::new(NodeState::default()),
                is_polling: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                memo: RwLock::new(None),
                passes_total: AtomicU64::new(0),
                passes_failed: AtomicU64::new(0),
                stats: OnceLock::new(),
            }
        })
    }
}

impl PollNode {
    /// Start building a node of the given kind and key
    pub fn builder(kind: impl Into<String>, key: impl Into<String>) -> PollNodeBuilder {
        PollNodeBuilder {
            id: NodeKey::new(kind, key),
            caches: Vec::new(),
            min_interval: DEFAULT_MIN_INTERVAL,
            fails_before_backoff: DEFAULT_FAILS_BEFORE_BACKOFF,
            backoff: DEFAULT_BACKOFF,
            status_hook: None,
            is_cluster: false,
        }
    }

    /// Insert this node into the registry.
    ///
    /// Returns `false` when another node with the same kind and key won;
    /// the caller must then discard this instance.
    pub fn try_register(self: &Arc<Self>, registry: &PollingRegistry) -> bool {
        registry.try_add(Arc::clone(self))
    }

    pub fn node_key(&self) -> &NodeKey {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.id.kind
    }

    pub fn key(&self) -> &str {
        &self.id.key
    }

    pub fn is_cluster(&self) -> bool {
        self.is_cluster
    }

    pub fn caches(&self) -> &[Arc<dyn Pollable>] {
        &self.caches
    }

    /// Look up one of the node's caches by id
    pub fn cache(&self, id: Uuid) -> Option<&Arc<dyn Pollable>> {
        self.caches.iter().find(|c| c.id() == id)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn fails_before_backoff(&self) -> u32 {
        self.fails_before_backoff
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub fn is_polling(&self) -> bool {
        self.is_polling.load(Ordering::Acquire)
    }

    pub fn last_poll(&self) -> Option<Instant> {
        self.state.read().last_poll
    }

    pub fn last_poll_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_poll_at
    }

    pub fn last_poll_duration(&self) -> Option<Duration> {
        self.state.read().last_poll_duration
    }

    /// Consecutive failed passes
    pub fn consecutive_failures(&self) -> u32 {
        self.state.read().consecutive_failures
    }

    pub fn passes_total(&self) -> u64 {
        self.passes_total.load(Ordering::Relaxed)
    }

    pub fn passes_failed(&self) -> u64 {
        self.passes_failed.load(Ordering::Relaxed)
    }

    /// Whether the scheduler should start a pass now.
    ///
    /// A pass is due once `min_interval` has elapsed since the last one,
    /// unless the node has failed too many passes in a row and is still
    /// inside its backoff window. Windows that run past the clock's range
    /// never elapse.
    pub fn needs_poll(&self) -> bool {
        let state = self.state.read();
        let Some(last) = state.last_poll else {
            return true;
        };
        let now = Instant::now();
        let interval_elapsed = match last.checked_add(self.min_interval) {
            Some(due) => now >= due,
            None => false,
        };
        interval_elapsed && !self.backing_off(&state, now)
    }

    /// Whether the node is suppressing passes after repeated failures
    pub fn in_backoff(&self) -> bool {
        self.backing_off(&self.state.read(), Instant::now())
    }

    fn backing_off(&self, state: &NodeState, now: Instant) -> bool {
        match state.last_poll {
            Some(last) if state.consecutive_failures >= self.fails_before_backoff => {
                match last.checked_add(self.backoff) {
                    Some(until) => now < until,
                    None => true,
                }
            }
            Some(_) => false,
            None => false,
        }
    }

    /// Whether any cache is due for a refresh
    pub fn has_due_caches(&self) -> bool {
        self.caches.iter().any(|c| c.should_poll())
    }

    pub(crate) fn attach_stats(&self, stats: Arc<RegistryStats>) {
        let _ = self.stats.set(stats);
    }

    /// Run one pass over the node's caches.
    ///
    /// Every cache that is due (or all of them with `force`) refreshes in
    /// its own task, so a failing or panicking sibling cannot cancel the
    /// others. Returns [`PassOutcome::AlreadyPolling`] without doing
    /// anything if a pass is already running.
    pub async fn poll(&self, force: bool) -> PassOutcome {
        if self
            .is_polling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(node = %self.label, "Pass already running");
            return PassOutcome::AlreadyPolling;
        }
        let _flag = PassFlag(&self.is_polling);
        let started = Instant::now();

        let handles: Vec<_> = self
            .caches
            .iter()
            .filter(|cache| force || cache.should_poll())
            .map(|cache| {
                let cache = Arc::clone(cache);
                tokio::spawn(async move { cache.refresh(force).await })
            })
            .collect();

        let mut report = PassReport {
            dispatched: handles.len(),
            ..PassReport::default()
        };
        for result in join_all(handles).await {
            match result {
                Ok(RefreshOutcome::Success) => report.succeeded += 1,
                Ok(RefreshOutcome::Failed) => report.failed += 1,
                Ok(RefreshOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    error!(node = %self.label, "Cache refresh task failed: {}", e);
                    report.failed += 1;
                }
            }
        }
        report.duration = started.elapsed();

        self.finish_pass(&report);
        PassOutcome::Completed(report)
    }

    fn finish_pass(&self, report: &PassReport) {
        let failed = report.is_failure();
        {
            let mut state = self.state.write();
            state.last_poll = Some(Instant::now());
            state.last_poll_at = Some(Utc::now());
            state.last_poll_duration = Some(report.duration);
            if failed {
                state.consecutive_failures += 1;
                if state.consecutive_failures == self.fails_before_backoff {
                    warn!(
                        node = %self.label,
                        failures = state.consecutive_failures,
                        backoff_secs = self.backoff.as_secs(),
                        "Backing off after repeated failed passes"
                    );
                }
            }
        }

        self.passes_total.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.passes_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.invalidate_status();

        debug!(
            node = %self.label,
            dispatched = report.dispatched,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            duration_ms = report.duration.as_millis() as u64,
            "Pass complete"
        );
    }

    /// Force-refresh a single cache, reporting whether it now holds good data
    pub async fn poll_cache(&self, id: Uuid) -> bool {
        let Some(cache) = self.cache(id) else {
            debug!(node = %self.label, cache_id = %id, "No such cache");
            return false;
        };
        match cache.refresh(true).await {
            RefreshOutcome::Success => true,
            RefreshOutcome::Failed => false,
            RefreshOutcome::Skipped => cache.monitor_status().is_good(),
        }
    }

    /// Drop the memoized status so the next read recomputes it
    pub fn invalidate_status(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn aggregate(&self) -> (MonitorStatus, Option<String>) {
        let generation = self.generation.load(Ordering::Acquire);
        if let Some(memo) = self.memo.read().as_ref() {
            if memo.generation == generation {
                return (memo.status, memo.reason.clone());
            }
        }

        let (status, reason) = self.compute_status();
        let mut memo = self.memo.write();
        if self.generation.load(Ordering::Acquire) == generation {
            *memo = Some(StatusMemo {
                generation,
                status,
                reason: reason.clone(),
            });
        }
        (status, reason)
    }

    fn compute_status(&self) -> (MonitorStatus, Option<String>) {
        let mut unhealthy: Vec<(MonitorStatus, &str, Option<String>)> = self
            .caches
            .iter()
            .filter(|c| c.affects_node_status())
            .filter_map(|c| {
                let status = c.monitor_status();
                (!status.is_good()).then(|| (status, c.name(), c.monitor_status_reason()))
            })
            .collect();

        if !unhealthy.is_empty() {
            let status = worst_of(unhealthy.iter().map(|(s, _, _)| *s));
            unhealthy.sort_by(|a, b| b.0.cmp(&a.0));
            let groups: Vec<String> = unhealthy
                .chunk_by(|a, b| a.0 == b.0)
                .map(|group| {
                    let names = group
                        .iter()
                        .map(|(_, name, reason)| match reason {
                            Some(reason) => format!("{} ({})", name, reason),
                            None => name.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{}: {}", group[0].0, names)
                })
                .collect();
            return (status, Some(groups.join("; ")));
        }

        let Some(hook) = &self.status_hook else {
            return (MonitorStatus::Good, None);
        };
        match std::panic::catch_unwind(AssertUnwindSafe(|| hook())) {
            Ok(domain) => {
                let empty = domain.statuses.is_empty();
                let status = worst_of(domain.statuses);
                if status.is_good() {
                    (status, None)
                } else if empty {
                    (
                        status,
                        Some(domain.reason.unwrap_or_else(|| "No status reported".into())),
                    )
                } else {
                    (status, Some(domain.reason.unwrap_or_else(|| status.to_string())))
                }
            }
            Err(_) => {
                error!(node = %self.label, "Status hook panicked");
                (
                    MonitorStatus::Unknown,
                    Some("Status check panicked".to_string()),
                )
            }
        }
    }

    /// The node as an issue, if it is not `Good`
    pub fn issue(&self) -> Option<Issue> {
        let (status, reason) = self.aggregate();
        if status.is_good() {
            return None;
        }
        Some(Issue {
            title: self.id.key.clone(),
            description: reason.unwrap_or_default(),
            is_cluster: self.is_cluster,
            date: self.last_poll_at().unwrap_or_else(Utc::now),
            status,
            source: self.id.kind.clone(),
        })
    }

    /// Snapshot for presentation layers
    pub fn info(&self) -> NodeInfo {
        let (status, reason) = self.aggregate();
        let state = self.state.read();
        NodeInfo {
            kind: self.id.kind.clone(),
            key: self.id.key.clone(),
            status,
            reason,
            is_cluster: self.is_cluster,
            is_polling: self.is_polling(),
            in_backoff: self.backing_off(&state, Instant::now()),
            last_poll: state.last_poll_at,
            last_poll_duration_ms: state.last_poll_duration.map(|d| d.as_millis() as u64),
            consecutive_failures: state.consecutive_failures,
            passes_total: self.passes_total(),
            passes_failed: self.passes_failed(),
            caches: self.caches.iter().map(|c| c.info()).collect(),
        }
    }
}

impl MonitorStatusSource for PollNode {
    fn monitor_status(&self) -> MonitorStatus {
        self.aggregate().0
    }

    fn monitor_status_reason(&self) -> Option<String> {
        self.aggregate().1
    }
}

impl CacheOwner for PollNode {
    fn refresh_started(&self) -> Option<InFlightGuard> {
        self.stats.get().map(RegistryStats::track_refresh)
    }

    fn cache_completed(&self, cache_id: Uuid, outcome: RefreshOutcome) {
        if outcome.is_success() {
            self.state.write().consecutive_failures = 0;
        }
        self.invalidate_status();
        debug!(node = %self.label, cache_id = %cache_id, ?outcome, "Cache refresh completed");
    }
}

#[async_trait]
impl IssueProvider for PollNode {
    fn name(&self) -> &str {
        &self.label
    }

    async fn issues(&self) -> Vec<Issue> {
        self.issue().into_iter().collect()
    }
}

impl PartialEq for PollNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PollNode {}

impl Hash for PollNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for PollNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollNode")
            .field("kind", &self.id.kind)
            .field("key", &self.id.key)
            .field("caches", &self.caches.len())
            .field("min_interval", &self.min_interval)
            .field("fails_before_backoff", &self.fails_before_backoff)
            .field("backoff", &self.backoff)
            .field("is_cluster", &self.is_cluster)
            .field("is_polling", &self.is_polling())
            .finish()
    }
}
