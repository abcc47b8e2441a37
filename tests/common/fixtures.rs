//! Test fixtures
//!
//! A `ControlledFetch` backs a cache entry with a fetch whose result, latency
//! and call count the test controls.

use opwatch::core::cache::CacheEntry;
use opwatch::utils::error::PollError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

/// Shared state behind a controllable fetch
#[derive(Default)]
pub struct ControlledFetch {
    calls: AtomicU32,
    failing: AtomicBool,
    delay: Mutex<Duration>,
    value: Mutex<String>,
}

impl ControlledFetch {
    /// A fetch that succeeds immediately with `value`
    pub fn new(value: &str) -> Arc<Self> {
        let fetch = Arc::new(Self::default());
        fetch.set_value(value);
        fetch
    }

    /// A fetch that always fails
    pub fn failing() -> Arc<Self> {
        let fetch = Self::new("");
        fetch.set_failing(true);
        fetch
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn set_value(&self, value: &str) {
        *self.value.lock() = value.to_string();
    }

    /// Build a cache entry backed by this fetch
    pub fn entry(
        self: &Arc<Self>,
        name: &str,
        cache_duration: Duration,
        failure_duration: Option<Duration>,
    ) -> Arc<CacheEntry<String>> {
        let mut builder = CacheEntry::<String>::builder(name).with_cache_duration(cache_duration);
        if let Some(failure_duration) = failure_duration {
            builder = builder.with_failure_duration(failure_duration);
        }

        let fetch = Arc::clone(self);
        builder.build(move || {
            let fetch = Arc::clone(&fetch);
            async move {
                fetch.calls.fetch_add(1, Ordering::SeqCst);
                let delay = *fetch.delay.lock();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if fetch.failing.load(Ordering::SeqCst) {
                    Err(PollError::fetch("backend unavailable"))
                } else {
                    Ok(fetch.value.lock().clone())
                }
            }
        })
    }
}
