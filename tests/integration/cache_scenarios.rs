//! Cache timing scenarios
//!
//! Walks cache entries through fresh, stale and failing phases and checks
//! data, scheduling and status at each step.

#[cfg(test)]
mod tests {
    use crate::common::ControlledFetch;
    use crate::common::assertions::StatusAssertions;
    use opwatch::core::status::MonitorStatus;
    use std::time::Duration;
    use tokio::time::{Instant, advance};

    const SECOND: Duration = Duration::from_secs(1);

    /// 5 s cache: value A at t=0, A again at t=3 without a fetch, B at t=6
    #[tokio::test(start_paused = true)]
    async fn test_five_second_cache_scenario() {
        let fetch = ControlledFetch::new("A");
        let entry = fetch.entry("scenario", 5 * SECOND, None);
        let t0 = Instant::now();

        assert_eq!(entry.poll_wait(false).await.as_deref().map(String::as_str), Some("A"));
        assert_eq!(entry.next_poll(), Some(t0 + 5 * SECOND));

        fetch.set_value("B");
        advance(3 * SECOND).await;
        assert_eq!(entry.poll_wait(false).await.as_deref().map(String::as_str), Some("A"));
        assert_eq!(fetch.calls(), 1);

        advance(3 * SECOND).await;
        assert_eq!(entry.poll_wait(false).await.as_deref().map(String::as_str), Some("B"));
        assert_eq!(fetch.calls(), 2);
        assert_eq!(entry.next_poll(), Some(t0 + 11 * SECOND));
        entry.assert_status(MonitorStatus::Good);
    }

    /// 10 s cache with a 15 s failure window
    #[tokio::test(start_paused = true)]
    async fn test_failure_window_scenario() {
        let fetch = ControlledFetch::new("v1");
        let entry = fetch.entry("scenario", 10 * SECOND, Some(15 * SECOND));
        let t0 = Instant::now();

        entry.poll_wait(false).await;
        assert_eq!(entry.next_poll(), Some(t0 + 10 * SECOND));

        fetch.set_failing(true);
        advance(10 * SECOND).await;
        let data = entry.poll_wait(false).await;
        assert_eq!(data.as_deref().map(String::as_str), Some("v1"));
        assert_eq!(entry.next_poll(), Some(t0 + 25 * SECOND));
        assert_eq!(entry.last_success(), Some(t0));
        assert_eq!(entry.last_poll(), Some(t0 + 10 * SECOND));
        entry.assert_status(MonitorStatus::Critical);
        assert_eq!(entry.error_message().as_deref(), Some("backend unavailable"));

        advance(14 * SECOND).await;
        entry.poll_wait(false).await;
        assert_eq!(fetch.calls(), 2, "still inside the failure window");

        fetch.set_failing(false);
        fetch.set_value("v2");
        advance(SECOND).await;
        let data = entry.poll_wait(false).await;
        assert_eq!(data.as_deref().map(String::as_str), Some("v2"));
        assert_eq!(entry.next_poll(), Some(t0 + 35 * SECOND));
        assert_eq!(entry.polls_total(), 3);
        assert_eq!(entry.polls_successful(), 2);
        entry.assert_status(MonitorStatus::Good);
    }

    /// Concurrent readers share one fetch and see the same value
    #[tokio::test(start_paused = true)]
    async fn test_concurrent_readers_share_one_fetch() {
        let fetch = ControlledFetch::new("shared");
        fetch.set_delay(Duration::from_millis(250));
        let entry = fetch.entry("shared", 30 * SECOND, None);

        let results = futures::future::join_all((0..16).map(|_| entry.poll(false))).await;

        assert_eq!(fetch.calls(), 1);
        let first = results[0].clone().unwrap();
        for result in &results {
            assert!(std::sync::Arc::ptr_eq(result.as_ref().unwrap(), &first));
        }
    }

    /// A failure with no prior data leaves the entry empty but scheduled
    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_failure() {
        let fetch = ControlledFetch::failing();
        let entry = fetch.entry("cold", 30 * SECOND, Some(5 * SECOND));

        assert!(entry.poll(false).await.is_none());
        assert!(!entry.should_poll());
        entry.assert_status(MonitorStatus::Critical);

        advance(5 * SECOND).await;
        assert!(entry.should_poll());
    }
}
