//! Issue type definitions

use crate::core::status::MonitorStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single problem reported by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub title: String,
    pub description: String,
    /// Cluster-wide issues sort ahead of per-instance ones
    pub is_cluster: bool,
    pub date: DateTime<Utc>,
    pub status: MonitorStatus,
    /// Name of whatever reported the issue
    pub source: String,
}

impl Issue {
    pub fn new(title: impl Into<String>, description: impl Into<String>, status: MonitorStatus) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            is_cluster: false,
            date: Utc::now(),
            status,
            source: String::new(),
        }
    }

    pub fn with_cluster(mut self, is_cluster: bool) -> Self {
        self.is_cluster = is_cluster;
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Display order: cluster issues first, then worst status, newest, and title
pub fn display_order(a: &Issue, b: &Issue) -> Ordering {
    b.is_cluster
        .cmp(&a.is_cluster)
        .then_with(|| b.status.cmp(&a.status))
        .then_with(|| b.date.cmp(&a.date))
        .then_with(|| a.title.cmp(&b.title))
}

/// Anything that can report issues to the aggregator
#[async_trait]
pub trait IssueProvider: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Disabled providers are skipped
    fn enabled(&self) -> bool {
        true
    }

    /// Current issues
    async fn issues(&self) -> Vec<Issue>;
}
