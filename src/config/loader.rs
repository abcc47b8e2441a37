//! Environment overrides
//!
//! Every `OPWATCH_*` variable overrides the matching file setting.

use super::Config;
use crate::utils::error::{PollError, Result};
use std::str::FromStr;
use tracing::debug;

fn parse<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| PollError::config(format!("Invalid {}: {}", name, e)))
}

impl Config {
    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0usize;
        let mut get = |name: &str| {
            let value = lookup(name);
            if value.is_some() {
                applied += 1;
            }
            value
        };

        if let Some(v) = get("OPWATCH_TICK_INTERVAL_MS") {
            self.polling.tick_interval_ms = parse("OPWATCH_TICK_INTERVAL_MS", &v)?;
        }
        if let Some(v) = get("OPWATCH_MAX_CONCURRENT_PASSES") {
            self.polling.max_concurrent_passes = parse("OPWATCH_MAX_CONCURRENT_PASSES", &v)?;
        }
        if let Some(v) = get("OPWATCH_MIN_INTERVAL_SECS") {
            self.polling.default_min_interval_secs = parse("OPWATCH_MIN_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = get("OPWATCH_FAILS_BEFORE_BACKOFF") {
            self.polling.default_fails_before_backoff =
                parse("OPWATCH_FAILS_BEFORE_BACKOFF", &v)?;
        }
        if let Some(v) = get("OPWATCH_BACKOFF_SECS") {
            self.polling.default_backoff_secs = parse("OPWATCH_BACKOFF_SECS", &v)?;
        }
        if let Some(v) = get("OPWATCH_FETCH_TIMEOUT_SECS") {
            self.polling.default_fetch_timeout_secs = parse("OPWATCH_FETCH_TIMEOUT_SECS", &v)?;
        }

        if let Some(v) = get("OPWATCH_ISSUES_CACHE_SECS") {
            self.issues.cache_secs = parse("OPWATCH_ISSUES_CACHE_SECS", &v)?;
        }
        if let Some(v) = get("OPWATCH_ISSUES_STALE_SECS") {
            self.issues.stale_secs = parse("OPWATCH_ISSUES_STALE_SECS", &v)?;
        }

        if let Some(v) = get("OPWATCH_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = get("OPWATCH_LOG_JSON") {
            self.logging.json = parse("OPWATCH_LOG_JSON", &v)?;
        }

        debug!(applied, "Applied environment overrides");
        Ok(())
    }
}
