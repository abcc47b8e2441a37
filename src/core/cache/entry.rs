//! Cache entry implementation
//!
//! This module contains `CacheEntry<T>`, a single data point's cache with
//! staleness tracking and a single-flight refresh gate.

use super::types::{CacheInfo, CacheOwner, FetchFn, Pollable, RefreshOutcome};
use crate::core::status::{MonitorStatus, MonitorStatusSource};
use crate::utils::error::{PollError, Result};
use crate::utils::time::to_relative_time;
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default fresh window for a cache entry
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(60);

/// Scheduling and error state, written only by the gate holder
#[derive(Default)]
struct PollState {
    last_poll: Option<Instant>,
    last_poll_at: Option<DateTime<Utc>>,
    last_success: Option<Instant>,
    last_success_at: Option<DateTime<Utc>>,
    next_poll: Option<Instant>,
    last_poll_duration: Option<Duration>,
    consecutive_failures: u32,
    last_error: Option<Arc<PollError>>,
}

/// Raises the polling flag for the lifetime of the guard
struct PollingFlag<'a>(&'a AtomicBool);

impl<'a> PollingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for PollingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A single data point's cache with staleness tracking and single-flight refresh
///
/// `data` is only replaced by a successful fetch; a failed fetch keeps the
/// previous value visible. `next_poll` is computed from the completion time
/// of the most recent attempt.
pub struct CacheEntry<T> {
    id: Uuid,
    name: String,
    cache_duration: Duration,
    failure_duration: Option<Duration>,
    timeout: Option<Duration>,
    affects_node_status: bool,
    fetch: FetchFn<T>,
    data: ArcSwapOption<T>,
    state: RwLock<PollState>,
    gate: Mutex<()>,
    is_polling: AtomicBool,
    polls_total: AtomicU64,
    polls_successful: AtomicU64,
    /// Completed attempts; doubles as the ticket for forced refreshes
    completed: AtomicU64,
    owner: RwLock<Option<Weak<dyn CacheOwner>>>,
}

/// Builder for [`CacheEntry`]
pub struct CacheEntryBuilder<T> {
    name: String,
    cache_duration: Duration,
    failure_duration: Option<Duration>,
    timeout: Option<Duration>,
    affects_node_status: bool,
    _data: PhantomData<fn() -> T>,
}

impl<T> CacheEntryBuilder<T>
where
    T: Send + Sync + 'static,
{
    /// Fresh window after a successful fetch
    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.cache_duration = duration;
        self
    }

    /// Retry window after a failed fetch (defaults to the cache duration)
    pub fn with_failure_duration(mut self, duration: Duration) -> Self {
        self.failure_duration = Some(duration);
        self
    }

    /// Deadline for a single fetch
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether failures of this cache count toward the node's status
    pub fn with_affects_node_status(mut self, affects: bool) -> Self {
        self.affects_node_status = affects;
        self
    }

    /// Build the entry around its fetch closure
    pub fn build<F, Fut>(self, fetch: F) -> Arc<CacheEntry<T>>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let fetch: FetchFn<T> = Arc::new(move || fetch().boxed());
        Arc::new(CacheEntry {
            id: Uuid::new_v4(),
            name: self.name,
            cache_duration: self.cache_duration,
            failure_duration: self.failure_duration,
            timeout: self.timeout,
            affects_node_status: self.affects_node_status,
            fetch,
            data: ArcSwapOption::empty(),
            state: RwLock::new(PollState::default()),
            gate: Mutex::new(()),
            is_polling: AtomicBool::new(false),
            polls_total: AtomicU64::new(0),
            polls_successful: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            owner: RwLock::new(None),
        })
    }
}

impl<T> CacheEntry<T>
where
    T: Send + Sync + 'static,
{
    /// Start building a cache entry with the given display name
    pub fn builder(name: impl Into<String>) -> CacheEntryBuilder<T> {
        CacheEntryBuilder {
            name: name.into(),
            cache_duration: DEFAULT_CACHE_DURATION,
            failure_duration: None,
            timeout: None,
            affects_node_status: true,
            _data: PhantomData,
        }
    }

    /// Create an entry with a fresh window and no timeout
    pub fn new<F, Fut>(name: impl Into<String>, cache_duration: Duration, fetch: F) -> Arc<Self>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self::builder(name)
            .with_cache_duration(cache_duration)
            .build(fetch)
    }

    /// Get the cached data, refreshing as needed.
    ///
    /// With no data yet, or with `force`, the caller waits for the refresh.
    /// Fresh data is returned without any I/O. Stale data is returned as-is
    /// while a refresh runs in the background.
    pub async fn poll(self: &Arc<Self>, force: bool) -> Option<Arc<T>> {
        let current = self.data.load_full();
        if force || current.is_none() {
            self.refresh(force).await;
            return self.data.load_full();
        }

        if self.should_poll() && !self.is_polling() {
            let entry = Arc::clone(self);
            tokio::spawn(async move {
                entry.refresh(false).await;
            });
        }

        current
    }

    /// Get the cached data, waiting for a refresh if the entry is stale or forced
    pub async fn poll_wait(&self, force: bool) -> Option<Arc<T>> {
        if force || self.should_poll() {
            self.refresh(force).await;
        }
        self.data.load_full()
    }

    /// Run the single-flight refresh.
    ///
    /// Only one refresh runs at a time per entry. A caller that waited on the
    /// gate re-checks under it and skips the fetch when a racer already
    /// refreshed: a non-forced caller skips if the entry is fresh, a forced
    /// caller skips if an attempt completed while it waited.
    pub async fn refresh(&self, force: bool) -> RefreshOutcome {
        let ticket = self.completed.load(Ordering::Acquire);
        let gate = self.gate.lock().await;

        let raced = if force {
            self.completed.load(Ordering::Acquire) != ticket
        } else {
            !self.should_poll()
        };
        if raced {
            debug!(cache = %self.name, force, "Refresh skipped, already refreshed by a racer");
            return RefreshOutcome::Skipped;
        }

        let polling = PollingFlag::raise(&self.is_polling);
        let tracked = self.owner().and_then(|owner| owner.refresh_started());
        let started = Instant::now();

        let attempt = AssertUnwindSafe(async { (self.fetch)().await }).catch_unwind();
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, attempt).await {
                Ok(result) => result,
                Err(_) => Ok(Err(PollError::Timeout(limit))),
            },
            None => attempt.await,
        };
        let result = result.unwrap_or_else(|panic| {
            Err(PollError::fetch(format!(
                "Fetch panicked: {}",
                panic_message(panic.as_ref())
            )))
        });

        let outcome = self.record(result, started);

        drop(tracked);
        drop(polling);
        drop(gate);
        self.notify_owner(outcome);
        outcome
    }

    fn record(&self, result: Result<T>, started: Instant) -> RefreshOutcome {
        let now = Instant::now();
        let wall = Utc::now();
        self.polls_total.fetch_add(1, Ordering::Relaxed);

        let outcome = {
            let mut state = self.state.write();
            state.last_poll = Some(now);
            state.last_poll_at = Some(wall);
            state.last_poll_duration = Some(now.saturating_duration_since(started));

            match result {
                Ok(value) => {
                    self.data.store(Some(Arc::new(value)));
                    state.last_success = Some(now);
                    state.last_success_at = Some(wall);
                    state.next_poll = now.checked_add(self.cache_duration);
                    state.consecutive_failures = 0;
                    state.last_error = None;
                    self.polls_successful.fetch_add(1, Ordering::Relaxed);
                    debug!(cache = %self.name, "Poll succeeded");
                    RefreshOutcome::Success
                }
                Err(error) => {
                    state.next_poll = now.checked_add(self.failure_duration());
                    state.consecutive_failures += 1;
                    warn!(
                        cache = %self.name,
                        consecutive_failures = state.consecutive_failures,
                        timeout = error.is_timeout(),
                        "Poll failed: {}",
                        error
                    );
                    state.last_error = Some(Arc::new(error));
                    RefreshOutcome::Failed
                }
            }
        };

        self.completed.fetch_add(1, Ordering::Release);
        outcome
    }

    fn owner(&self) -> Option<Arc<dyn CacheOwner>> {
        self.owner.read().as_ref().and_then(Weak::upgrade)
    }

    fn notify_owner(&self, outcome: RefreshOutcome) {
        if let Some(owner) = self.owner() {
            owner.cache_completed(self.id, outcome);
        }
    }

    /// Unique id of the entry
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Display name of the entry
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Currently cached data, without triggering a refresh
    pub fn data(&self) -> Option<Arc<T>> {
        self.data.load_full()
    }

    /// Whether the entry has ever been populated
    pub fn has_data(&self) -> bool {
        self.data.load().is_some()
    }

    /// Whether the entry is due for a refresh.
    ///
    /// A polled entry whose window runs past the clock's range has no
    /// `next_poll` and stays fresh.
    pub fn should_poll(&self) -> bool {
        let state = self.state.read();
        match (state.last_poll, state.next_poll) {
            (None, _) => true,
            (Some(_), Some(next)) => Instant::now() >= next,
            (Some(_), None) => false,
        }
    }

    /// Whether a refresh is currently running
    pub fn is_polling(&self) -> bool {
        self.is_polling.load(Ordering::Acquire)
    }

    /// Fresh window after success
    pub fn cache_duration(&self) -> Duration {
        self.cache_duration
    }

    /// Retry window after failure
    pub fn failure_duration(&self) -> Duration {
        self.failure_duration.unwrap_or(self.cache_duration)
    }

    /// Fetch deadline, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn last_poll(&self) -> Option<Instant> {
        self.state.read().last_poll
    }

    pub fn last_poll_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_poll_at
    }

    pub fn last_success(&self) -> Option<Instant> {
        self.state.read().last_success
    }

    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_success_at
    }

    /// When the entry goes stale; `None` before the first attempt or when
    /// the window does not fit the clock
    pub fn next_poll(&self) -> Option<Instant> {
        self.state.read().next_poll
    }

    pub fn last_poll_duration(&self) -> Option<Duration> {
        self.state.read().last_poll_duration
    }

    /// Whether the most recent attempt succeeded
    pub fn last_poll_successful(&self) -> bool {
        let state = self.state.read();
        state.last_poll.is_some() && state.last_error.is_none()
    }

    /// Error of the most recent attempt, cleared by the next success
    pub fn error(&self) -> Option<Arc<PollError>> {
        self.state.read().last_error.clone()
    }

    pub fn error_message(&self) -> Option<String> {
        self.state.read().last_error.as_ref().map(|e| e.to_string())
    }

    pub fn polls_total(&self) -> u64 {
        self.polls_total.load(Ordering::Relaxed)
    }

    pub fn polls_successful(&self) -> u64 {
        self.polls_successful.load(Ordering::Relaxed)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.state.read().consecutive_failures
    }

    /// Snapshot for presentation layers
    pub fn info(&self) -> CacheInfo {
        let state = self.state.read();
        CacheInfo {
            id: self.id,
            name: self.name.clone(),
            status: status_of(&state),
            reason: reason_of(&state),
            has_data: self.has_data(),
            is_polling: self.is_polling(),
            last_poll: state.last_poll_at,
            last_success: state.last_success_at,
            last_poll_duration_ms: state.last_poll_duration.map(|d| d.as_millis() as u64),
            polls_total: self.polls_total(),
            polls_successful: self.polls_successful(),
            consecutive_failures: state.consecutive_failures,
            error_message: state.last_error.as_ref().map(|e| e.to_string()),
        }
    }
}

fn status_of(state: &PollState) -> MonitorStatus {
    if state.last_poll.is_none() {
        MonitorStatus::Unknown
    } else if state.last_error.is_some() {
        MonitorStatus::Critical
    } else {
        MonitorStatus::Good
    }
}

fn reason_of(state: &PollState) -> Option<String> {
    if state.last_poll.is_none() {
        return Some("Never polled".to_string());
    }
    let error = state.last_error.as_ref()?;
    let when = state
        .last_poll_at
        .map(to_relative_time)
        .unwrap_or_else(|| "recently".to_string());
    Some(format!("Poll {} failed: {}", when, error))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl<T> MonitorStatusSource for CacheEntry<T> {
    fn monitor_status(&self) -> MonitorStatus {
        status_of(&self.state.read())
    }

    fn monitor_status_reason(&self) -> Option<String> {
        reason_of(&self.state.read())
    }
}

#[async_trait]
impl<T> Pollable for CacheEntry<T>
where
    T: Send + Sync + 'static,
{
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn should_poll(&self) -> bool {
        CacheEntry::should_poll(self)
    }

    fn is_polling(&self) -> bool {
        CacheEntry::is_polling(self)
    }

    fn affects_node_status(&self) -> bool {
        self.affects_node_status
    }

    fn last_poll_at(&self) -> Option<DateTime<Utc>> {
        CacheEntry::last_poll_at(self)
    }

    async fn refresh(&self, force: bool) -> RefreshOutcome {
        CacheEntry::refresh(self, force).await
    }

    fn set_owner(&self, owner: Weak<dyn CacheOwner>) {
        *self.owner.write() = Some(owner);
    }

    fn info(&self) -> CacheInfo {
        CacheEntry::info(self)
    }
}

impl<T> fmt::Debug for CacheEntryBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntryBuilder")
            .field("name", &self.name)
            .field("cache_duration", &self.cache_duration)
            .field("failure_duration", &self.failure_duration)
            .field("timeout", &self.timeout)
            .field("affects_node_status", &self.affects_node_status)
            .finish()
    }
}

impl<T> fmt::Debug for CacheEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("CacheEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("cache_duration", &self.cache_duration)
            .field("failure_duration", &self.failure_duration)
            .field("timeout", &self.timeout)
            .field("has_data", &self.data.load().is_some())
            .field("is_polling", &self.is_polling.load(Ordering::Relaxed))
            .field("next_poll", &state.next_poll)
            .field("consecutive_failures", &state.consecutive_failures)
            .finish()
    }
}
