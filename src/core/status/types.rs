//! Monitor status levels and roll-up helpers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered severity of a monitored entity
///
/// Variants are declared in rank order, so the derived `Ord` is the severity
/// order: `Good < Unknown < Maintenance < Warning < Critical`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    /// Everything checked out
    #[default]
    Good = 0,
    /// Not enough information to judge
    Unknown = 1,
    /// Intentionally out of service
    Maintenance = 2,
    /// Degraded but operational
    Warning = 3,
    /// Failing
    Critical = 4,
}

impl MonitorStatus {
    /// Numeric severity rank (higher is worse)
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Check if the status is the best outcome
    pub fn is_good(self) -> bool {
        self == MonitorStatus::Good
    }

    /// Name of the status as displayed to operators
    pub fn as_str(self) -> &'static str {
        match self {
            MonitorStatus::Good => "Good",
            MonitorStatus::Unknown => "Unknown",
            MonitorStatus::Maintenance => "Maintenance",
            MonitorStatus::Warning => "Warning",
            MonitorStatus::Critical => "Critical",
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that reports a monitor status
pub trait MonitorStatusSource {
    /// Current status
    fn monitor_status(&self) -> MonitorStatus;

    /// Why the status is not `Good`; `None` when it is
    fn monitor_status_reason(&self) -> Option<String>;
}

impl<T: MonitorStatusSource + ?Sized> MonitorStatusSource for std::sync::Arc<T> {
    fn monitor_status(&self) -> MonitorStatus {
        (**self).monitor_status()
    }

    fn monitor_status_reason(&self) -> Option<String> {
        (**self).monitor_status_reason()
    }
}

/// Worst status in `statuses`, or `Unknown` when there are none
pub fn worst_of<I>(statuses: I) -> MonitorStatus
where
    I: IntoIterator<Item = MonitorStatus>,
{
    statuses.into_iter().max().unwrap_or(MonitorStatus::Unknown)
}

/// Worst status across a set of status sources
pub fn worst_status<'a, T, I>(items: I) -> MonitorStatus
where
    T: MonitorStatusSource + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
{
    worst_of(items.into_iter().map(|i| i.monitor_status()))
}

/// Items whose status is anything other than `Good`
pub fn non_good<'a, T, I>(items: I) -> Vec<&'a T>
where
    T: MonitorStatusSource + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items
        .into_iter()
        .filter(|i| !i.monitor_status().is_good())
        .collect()
}

/// Reasons of the non-`Good` items joined with ", "
pub fn reason_summary<'a, T, I>(items: I) -> String
where
    T: MonitorStatusSource + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
{
    non_good(items)
        .into_iter()
        .filter_map(|i| i.monitor_status_reason())
        .filter(|r| !r.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
