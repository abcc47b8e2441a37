//! Section validators

use super::trait_def::Validate;
use crate::config::models::*;
use std::collections::HashSet;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Longest interval, window or timeout accepted from configuration
pub const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

fn check_window(label: &str, secs: u64) -> Result<(), String> {
    if secs > MAX_WINDOW_SECS {
        return Err(format!(
            "{} ({}s) must not exceed {}s",
            label, secs, MAX_WINDOW_SECS
        ));
    }
    Ok(())
}

impl Validate for PollingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.tick_interval_ms == 0 {
            return Err("Tick interval must be greater than 0".to_string());
        }

        if self.max_concurrent_passes == 0 {
            return Err("Max concurrent passes must be greater than 0".to_string());
        }

        if self.default_fails_before_backoff == 0 {
            return Err("Fails before backoff must be at least 1".to_string());
        }

        if self.default_fetch_timeout_secs == 0 {
            return Err("Fetch timeout must be greater than 0".to_string());
        }

        check_window("Tick interval", self.tick_interval_ms / 1000)?;
        check_window("Min interval", self.default_min_interval_secs)?;
        check_window("Backoff", self.default_backoff_secs)?;
        check_window("Fetch timeout", self.default_fetch_timeout_secs)?;

        Ok(())
    }
}

impl Validate for IssuesConfig {
    fn validate(&self) -> Result<(), String> {
        if self.cache_secs == 0 {
            return Err("Issue cache duration must be greater than 0".to_string());
        }

        if self.stale_secs < self.cache_secs {
            return Err(format!(
                "Issue stale window ({}s) must not be shorter than the cache duration ({}s)",
                self.stale_secs, self.cache_secs
            ));
        }

        check_window("Issue stale window", self.stale_secs)
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        EnvFilter::try_new(&self.level)
            .map(|_| ())
            .map_err(|e| format!("Invalid log level '{}': {}", self.level, e))
    }
}

impl Validate for HttpTargetConfig {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Target name cannot be empty".to_string());
        }

        let url = Url::parse(&self.url)
            .map_err(|e| format!("Target '{}' has invalid URL: {}", self.name, e))?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(format!(
                    "Target '{}' must use http:// or https://, got: {}",
                    self.name, scheme
                ));
            }
        }

        if self.interval_secs == 0 {
            return Err(format!("Target '{}' interval must be greater than 0", self.name));
        }

        if self.timeout_secs == Some(0) {
            return Err(format!("Target '{}' timeout must be greater than 0", self.name));
        }

        check_window(&format!("Target '{}' interval", self.name), self.interval_secs)?;
        if let Some(timeout) = self.timeout_secs {
            check_window(&format!("Target '{}' timeout", self.name), timeout)?;
        }

        Ok(())
    }
}

impl Validate for [HttpTargetConfig] {
    fn validate(&self) -> Result<(), String> {
        let mut names = HashSet::new();
        for target in self {
            target.validate()?;
            if !names.insert(target.name.as_str()) {
                return Err(format!("Duplicate target name: {}", target.name));
            }
        }
        Ok(())
    }
}
