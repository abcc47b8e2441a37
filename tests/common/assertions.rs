//! Custom test assertions
//!
//! Provides domain-specific assertions for opwatch components.

use opwatch::core::status::{MonitorStatus, MonitorStatusSource};

/// Assertions for anything that reports a monitor status
pub trait StatusAssertions {
    /// Assert the status and that a reason is present exactly when it is not `Good`
    fn assert_status(&self, expected: MonitorStatus);
}

impl<T: MonitorStatusSource + ?Sized> StatusAssertions for T {
    fn assert_status(&self, expected: MonitorStatus) {
        let status = self.monitor_status();
        assert_eq!(status, expected, "reason: {:?}", self.monitor_status_reason());
        if expected.is_good() {
            assert!(
                self.monitor_status_reason().is_none(),
                "Expected no reason for a Good status"
            );
        } else {
            assert!(
                self.monitor_status_reason().is_some(),
                "Expected a reason for status {}",
                expected
            );
        }
    }
}
