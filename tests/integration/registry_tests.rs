//! Registry integration tests
//!
//! Runs the scheduler against real nodes and checks scheduling, backoff,
//! manual polls and shutdown.

#[cfg(test)]
mod tests {
    use crate::common::ControlledFetch;
    use crate::common::assertions::StatusAssertions;
    use opwatch::core::node::{DomainStatus, PollNode};
    use opwatch::core::registry::{PollingRegistry, RegistryConfig};
    use opwatch::core::status::{MonitorStatus, MonitorStatusSource};
    use std::time::Duration;
    use tokio::time::sleep;
    use tokio_test::assert_ok;

    const SECOND: Duration = Duration::from_secs(1);

    fn registry() -> PollingRegistry {
        PollingRegistry::new(RegistryConfig {
            tick_interval: SECOND,
            max_concurrent_passes: 8,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_backs_off_failing_node() {
        let registry = registry();
        let fetch = ControlledFetch::failing();
        let node = PollNode::builder("db", "primary")
            .with_cache(fetch.entry("health", 30 * SECOND, Some(SECOND)))
            .with_min_interval(SECOND)
            .with_fails_before_backoff(3)
            .with_backoff(120 * SECOND)
            .build();
        assert_ok!(registry.register(node.clone()));

        registry.start();
        sleep(Duration::from_millis(10_500)).await;
        assert_eq!(fetch.calls(), 3);
        assert!(node.in_backoff());
        node.assert_status(MonitorStatus::Critical);

        sleep(115 * SECOND).await;
        assert_eq!(fetch.calls(), 4, "one pass once the backoff elapsed");

        registry.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovering_node_leaves_backoff() {
        let registry = registry();
        let fetch = ControlledFetch::failing();
        let node = PollNode::builder("db", "replica")
            .with_cache(fetch.entry("health", 5 * SECOND, Some(SECOND)))
            .with_fails_before_backoff(2)
            .with_backoff(10 * SECOND)
            .build();
        registry.try_add(node.clone());

        registry.start();
        sleep(Duration::from_millis(1_500)).await;
        assert!(node.in_backoff());

        fetch.set_failing(false);
        sleep(10 * SECOND).await;
        assert_eq!(node.consecutive_failures(), 0);
        assert!(!node.in_backoff());
        node.assert_status(MonitorStatus::Good);

        registry.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_nodes_refresh_independently() {
        let registry = registry();
        let fast = ControlledFetch::new("fast");
        let slow = ControlledFetch::new("slow");
        registry.try_add(
            PollNode::builder("svc", "fast")
                .with_cache(fast.entry("value", 2 * SECOND, None))
                .build(),
        );
        registry.try_add(
            PollNode::builder("svc", "slow")
                .with_cache(slow.entry("value", 10 * SECOND, None))
                .build(),
        );

        registry.start();
        sleep(Duration::from_millis(10_500)).await;

        assert_eq!(fast.calls(), 6);
        assert_eq!(slow.calls(), 2);
        registry.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_domain_hook_feeds_node_status() {
        let registry = registry();
        let fetch = ControlledFetch::new("42");
        let entry = fetch.entry("lag", 30 * SECOND, None);
        let hook_entry = entry.clone();
        let node = PollNode::builder("db", "replica")
            .with_cache(entry)
            .with_status_hook(move || match hook_entry.data() {
                Some(lag) if lag.parse::<u32>().unwrap_or(0) > 10 => DomainStatus::single(
                    MonitorStatus::Warning,
                    Some(format!("Replication lag {}s", lag)),
                ),
                _ => DomainStatus::good(),
            })
            .build();
        registry.try_add(node.clone());

        assert_eq!(registry.poll_all(false).await, 1);
        node.assert_status(MonitorStatus::Warning);
        assert_eq!(
            node.monitor_status_reason().as_deref(),
            Some("Replication lag 42s")
        );

        fetch.set_value("3");
        assert!(registry.force_poll("db", "replica", None).await);
        node.assert_status(MonitorStatus::Good);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_poll_single_cache() {
        let registry = registry();
        let a = ControlledFetch::new("a");
        let b = ControlledFetch::new("b");
        let entry_a = a.entry("a", 60 * SECOND, None);
        registry.try_add(
            PollNode::builder("svc", "pair")
                .with_cache(entry_a.clone())
                .with_cache(b.entry("b", 60 * SECOND, None))
                .build(),
        );

        assert!(registry.force_poll("svc", "pair", Some(entry_a.id())).await);
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_node_is_no_longer_polled() {
        let registry = registry();
        let fetch = ControlledFetch::new("x");
        let node = PollNode::builder("svc", "temp")
            .with_cache(fetch.entry("x", SECOND, None))
            .build();
        registry.try_add(node.clone());

        registry.start();
        sleep(Duration::from_millis(2_500)).await;
        let before = fetch.calls();
        assert!(before >= 2);

        assert!(registry.try_remove(&node));
        sleep(5 * SECOND).await;
        assert_eq!(fetch.calls(), before);
        registry.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_track_scheduler_activity() {
        let registry = registry();
        let fetch = ControlledFetch::new("x");
        fetch.set_delay(2 * SECOND);
        registry.try_add(
            PollNode::builder("svc", "stats")
                .with_cache(fetch.entry("x", 60 * SECOND, None))
                .build(),
        );

        registry.start();
        sleep(Duration::from_millis(500)).await;
        let during = registry.stats();
        assert_eq!(during.nodes, 1);
        assert_eq!(during.in_flight, 1);
        assert_eq!(during.passes_dispatched, 1);

        sleep(3 * SECOND).await;
        let after = registry.stats();
        assert_eq!(after.in_flight, 0);
        assert_eq!(after.refreshes_total, 1);
        assert_eq!(after.scheduler_faults, 0);
        assert!(after.ticks >= 4);
        registry.shutdown().await;
    }
}
