//! Polling registry implementation

use super::scheduler;
use super::types::{RegistryConfig, RegistryStats, StatsSnapshot};
use crate::core::issues::{Issue, IssueProvider};
use crate::core::node::{NodeKey, PollNode};
use crate::utils::error::{PollError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

struct SchedulerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }
}

pub(super) struct RegistryInner {
    pub(super) config: RegistryConfig,
    pub(super) nodes: DashMap<NodeKey, Arc<PollNode>>,
    pub(super) stats: Arc<RegistryStats>,
    pub(super) permits: Arc<Semaphore>,
    scheduler: Mutex<Option<SchedulerHandle>>,
}

/// The deduplicated set of poll nodes plus the scheduler that drives them
///
/// Cloning is cheap; clones share the same nodes and scheduler.
#[derive(Clone)]
pub struct PollingRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for PollingRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl PollingRegistry {
    /// Create an empty registry; the scheduler is not started
    pub fn new(config: RegistryConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_passes.max(1)));
        Self {
            inner: Arc::new(RegistryInner {
                config,
                nodes: DashMap::new(),
                stats: Arc::new(RegistryStats::default()),
                permits,
                scheduler: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Insert a node unless one with the same kind and key is already present
    pub fn try_add(&self, node: Arc<PollNode>) -> bool {
        match self.inner.nodes.entry(node.node_key().clone()) {
            Entry::Occupied(_) => {
                debug!(node = %node.node_key(), "Node already registered");
                false
            }
            Entry::Vacant(slot) => {
                node.attach_stats(Arc::clone(&self.inner.stats));
                info!(node = %node.node_key(), caches = node.caches().len(), "Registered node");
                slot.insert(node);
                true
            }
        }
    }

    /// Like [`try_add`](Self::try_add), but losing the race is an error
    pub fn register(&self, node: Arc<PollNode>) -> Result<Arc<PollNode>> {
        if self.try_add(Arc::clone(&node)) {
            Ok(node)
        } else {
            Err(PollError::registration_conflict(node.kind(), node.key()))
        }
    }

    /// Remove this exact node instance; a different node under the same key
    /// is left alone
    pub fn try_remove(&self, node: &Arc<PollNode>) -> bool {
        let removed = self
            .inner
            .nodes
            .remove_if(node.node_key(), |_, current| Arc::ptr_eq(current, node))
            .is_some();
        if removed {
            info!(node = %node.node_key(), "Removed node");
        }
        removed
    }

    /// Remove whatever node is registered under `kind` and `key`
    pub fn remove(&self, kind: &str, key: &str) -> Option<Arc<PollNode>> {
        self.inner
            .nodes
            .remove(&NodeKey::new(kind, key))
            .map(|(_, node)| node)
    }

    pub fn get(&self, kind: &str, key: &str) -> Option<Arc<PollNode>> {
        self.inner
            .nodes
            .get(&NodeKey::new(kind, key))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// All registered nodes, ordered by kind then key
    pub fn nodes(&self) -> Vec<Arc<PollNode>> {
        let mut nodes: Vec<_> = self
            .inner
            .nodes
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        nodes.sort_by(|a, b| a.node_key().cmp(b.node_key()));
        nodes
    }

    pub fn nodes_of_kind(&self, kind: &str) -> Vec<Arc<PollNode>> {
        self.nodes()
            .into_iter()
            .filter(|node| node.kind() == kind)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.nodes.is_empty()
    }

    /// Manually poll a node.
    ///
    /// With `cache_id`, only that cache is force-refreshed and the result is
    /// whether it succeeded. Without it, a forced pass runs over the whole
    /// node and the result is whether the pass ran.
    pub async fn force_poll(&self, kind: &str, key: &str, cache_id: Option<Uuid>) -> bool {
        let Some(node) = self.get(kind, key) else {
            warn!("Force poll requested for unknown node {}:{}", kind, key);
            return false;
        };

        match cache_id {
            Some(id) => node.poll_cache(id).await,
            None => node.poll(true).await.ran(),
        }
    }

    /// Run a pass on every node and wait for all of them; returns how many ran
    pub async fn poll_all(&self, force: bool) -> usize {
        let nodes = self.nodes();
        let outcomes = join_all(nodes.iter().map(|node| node.poll(force))).await;
        outcomes.iter().filter(|outcome| outcome.ran()).count()
    }

    /// Run one scheduler scan now; returns the number of passes dispatched
    pub fn scan(&self) -> usize {
        scheduler::scan(&self.inner)
    }

    /// Start the scheduler. Returns `false` if it was already running.
    pub fn start(&self) -> bool {
        let mut scheduler = self.inner.scheduler.lock();
        if scheduler.as_ref().is_some_and(SchedulerHandle::is_running) {
            debug!("Scheduler already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(scheduler::run(
            Arc::downgrade(&self.inner),
            cancel.clone(),
            self.inner.config.tick_interval,
        ));
        *scheduler = Some(SchedulerHandle { cancel, task });
        info!(
            tick_ms = self.inner.config.tick_interval.as_millis() as u64,
            max_concurrent_passes = self.inner.config.max_concurrent_passes,
            "Polling scheduler started"
        );
        true
    }

    /// Ask the scheduler to stop at its next tick boundary.
    ///
    /// In-flight refreshes are left to finish on their own.
    pub fn stop(&self) {
        if let Some(scheduler) = self.inner.scheduler.lock().as_ref() {
            scheduler.cancel.cancel();
            info!("Polling scheduler stop requested");
        }
    }

    /// Stop the scheduler and wait for its task to exit
    pub async fn shutdown(&self) {
        let handle = self.inner.scheduler.lock().take();
        let Some(handle) = handle else {
            return;
        };
        handle.cancel.cancel();
        if let Err(e) = handle.task.await {
            warn!("Scheduler task ended abnormally: {}", e);
        }
        info!("Polling scheduler shut down");
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .scheduler
            .lock()
            .as_ref()
            .is_some_and(SchedulerHandle::is_running)
    }

    /// Snapshot of the registry counters
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot(self.len())
    }
}

#[async_trait]
impl IssueProvider for PollingRegistry {
    fn name(&self) -> &str {
        "registry"
    }

    async fn issues(&self) -> Vec<Issue> {
        self.nodes()
            .iter()
            .filter_map(|node| node.issue())
            .collect()
    }
}

impl std::fmt::Debug for PollingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingRegistry")
            .field("config", &self.inner.config)
            .field("nodes", &self.len())
            .field("running", &self.is_running())
            .finish()
    }
}
