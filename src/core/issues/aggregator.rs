//! Issue aggregation

use super::types::{Issue, IssueProvider, display_order};
use crate::config::IssuesConfig;
use crate::core::cache::CacheEntry;
use crate::core::status::MonitorStatus;
use futures::FutureExt;
use futures::future::join_all;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Cache key of the merged issue list
pub const ISSUES_CACHE_KEY: &str = "issues:all";

/// Default fresh window of the merged list
pub const DEFAULT_ISSUES_CACHE: Duration = Duration::from_secs(15);

/// Default window during which a stale list is still served
pub const DEFAULT_ISSUES_STALE: Duration = Duration::from_secs(4 * 60 * 60);

type Providers = Arc<RwLock<Vec<Arc<dyn IssueProvider>>>>;

/// Merges issues from every registered provider and caches the sorted result
pub struct IssueAggregator {
    providers: Providers,
    cache: Arc<CacheEntry<Vec<Issue>>>,
    stale_window: Duration,
}

impl Default for IssueAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_ISSUES_CACHE, DEFAULT_ISSUES_STALE)
    }
}

impl IssueAggregator {
    pub fn new(cache_duration: Duration, stale_window: Duration) -> Self {
        let providers: Providers = Arc::new(RwLock::new(Vec::new()));
        let source = Arc::clone(&providers);
        let cache = CacheEntry::new(ISSUES_CACHE_KEY, cache_duration, move || {
            let providers = source.read().clone();
            async move { Ok(collect(providers).await) }
        });

        Self {
            providers,
            cache,
            stale_window,
        }
    }

    pub fn from_config(config: &IssuesConfig) -> Self {
        Self::new(config.cache_duration(), config.stale_window())
    }

    pub fn add_provider(&self, provider: Arc<dyn IssueProvider>) {
        debug!(provider = provider.name(), "Added issue provider");
        self.providers.write().push(provider);
    }

    pub fn provider_count(&self) -> usize {
        self.providers.read().len()
    }

    /// The merged issue list.
    ///
    /// A list younger than the stale window is returned at once, with a
    /// background refresh when it is past its fresh window. An older list,
    /// or no list at all, is rebuilt before returning.
    pub async fn issues(&self) -> Arc<Vec<Issue>> {
        let servable = self
            .cache
            .last_success()
            .is_some_and(|at| at.elapsed() < self.stale_window);

        let issues = if servable {
            self.cache.poll(false).await
        } else {
            self.cache.poll_wait(false).await
        };
        issues.unwrap_or_default()
    }

    /// Rebuild the list now, bypassing the cache
    pub async fn refresh(&self) -> Arc<Vec<Issue>> {
        self.cache.poll_wait(true).await.unwrap_or_default()
    }

    /// The backing cache entry
    pub fn cache(&self) -> &Arc<CacheEntry<Vec<Issue>>> {
        &self.cache
    }
}

async fn collect(providers: Vec<Arc<dyn IssueProvider>>) -> Vec<Issue> {
    let enabled: Vec<_> = providers.into_iter().filter(|p| p.enabled()).collect();
    let results = join_all(
        enabled
            .iter()
            .map(|provider| AssertUnwindSafe(provider.issues()).catch_unwind()),
    )
    .await;

    let mut issues = Vec::new();
    for (provider, result) in enabled.iter().zip(results) {
        match result {
            Ok(found) => issues.extend(found),
            Err(_) => error!(provider = provider.name(), "Issue provider panicked, skipping"),
        }
    }
    issues.sort_by(display_order);
    issues
}

/// Number of issues at each status
pub fn count_by_status(issues: &[Issue]) -> BTreeMap<MonitorStatus, usize> {
    let mut counts = BTreeMap::new();
    for issue in issues {
        *counts.entry(issue.status).or_insert(0) += 1;
    }
    counts
}
