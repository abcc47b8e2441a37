//! Tests for the polling registry

#[cfg(test)]
mod tests {
    use crate::core::cache::{CacheEntry, CacheInfo, CacheOwner, Pollable, RefreshOutcome};
    use crate::core::issues::IssueProvider;
    use crate::core::node::PollNode;
    use crate::core::registry::{PollingRegistry, RegistryConfig};
    use crate::core::status::{MonitorStatus, MonitorStatusSource};
    use crate::utils::error::PollError;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Weak};
    use std::time::Duration;
    use tokio::time::sleep;
    use uuid::Uuid;

    fn registry(max_concurrent_passes: usize) -> PollingRegistry {
        PollingRegistry::new(RegistryConfig {
            tick_interval: Duration::from_secs(1),
            max_concurrent_passes,
        })
    }

    fn counting_node(
        key: &str,
        cache_duration: Duration,
        delay: Duration,
    ) -> (Arc<PollNode>, Arc<CacheEntry<u32>>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let entry = CacheEntry::new("value", cache_duration, move || {
            let counter = counter.clone();
            async move {
                sleep(delay).await;
                Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
            }
        });
        let node = PollNode::builder("test", key)
            .with_cache(entry.clone())
            .build();
        (node, entry, calls)
    }

    #[test]
    fn test_try_add_keeps_first_node() {
        let registry = PollingRegistry::default();
        let first = PollNode::builder("redis", "cache-01").build();
        let second = PollNode::builder("redis", "cache-01").build();

        assert!(first.try_register(&registry));
        assert!(!second.try_register(&registry));
        assert_eq!(registry.len(), 1);

        let stored = registry.get("redis", "cache-01").unwrap();
        assert!(Arc::ptr_eq(&stored, &first));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_try_add_has_one_winner() {
        let registry = PollingRegistry::default();
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let node = PollNode::builder("sql", "db-01").build();
                    registry.try_add(node)
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_conflict_is_an_error() {
        let registry = PollingRegistry::default();
        registry
            .register(PollNode::builder("sql", "db-01").build())
            .unwrap();

        let error = registry
            .register(PollNode::builder("sql", "db-01").build())
            .unwrap_err();
        assert!(matches!(error, PollError::RegistrationConflict { .. }));
    }

    #[test]
    fn test_try_remove_only_removes_same_instance() {
        let registry = PollingRegistry::default();
        let registered = PollNode::builder("sql", "db-01").build();
        let impostor = PollNode::builder("sql", "db-01").build();
        registry.try_add(registered.clone());

        assert!(!registry.try_remove(&impostor));
        assert_eq!(registry.len(), 1);
        assert!(registry.try_remove(&registered));
        assert!(registry.is_empty());
        assert!(!registry.try_remove(&registered));
    }

    #[test]
    fn test_lookup_helpers() {
        let registry = PollingRegistry::default();
        registry.try_add(PollNode::builder("sql", "b").build());
        registry.try_add(PollNode::builder("sql", "a").build());
        registry.try_add(PollNode::builder("redis", "c").build());

        let keys: Vec<_> = registry
            .nodes()
            .iter()
            .map(|n| n.node_key().to_string())
            .collect();
        assert_eq!(keys, vec!["redis:c", "sql:a", "sql:b"]);
        assert_eq!(registry.nodes_of_kind("sql").len(), 2);
        assert!(registry.get("sql", "missing").is_none());
        assert!(registry.remove("redis", "c").is_some());
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_polls_due_nodes() {
        let registry = registry(8);
        let (node, entry, calls) =
            counting_node("a", Duration::from_secs(5), Duration::ZERO);
        registry.try_add(node);

        assert!(registry.start());
        sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(entry.data().as_deref(), Some(&1));

        sleep(Duration::from_secs(3)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "fresh cache is not refetched");

        sleep(Duration::from_secs(3)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(registry.stats().ticks >= 6);

        registry.shutdown().await;
        assert!(!registry.is_running());
        sleep(Duration::from_secs(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let registry = registry(8);
        assert!(registry.start());
        assert!(!registry.start());
        assert!(registry.is_running());

        registry.stop();
        assert!(!registry.is_running());
        registry.shutdown().await;

        assert!(registry.start());
        registry.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_leaves_in_flight_refreshes_alone() {
        let registry = registry(8);
        let (node, entry, _calls) =
            counting_node("slow", Duration::from_secs(60), Duration::from_secs(5));
        registry.try_add(node);

        registry.start();
        sleep(Duration::from_millis(100)).await;
        assert!(entry.is_polling());
        assert_eq!(registry.stats().in_flight, 1);

        registry.shutdown().await;
        sleep(Duration::from_secs(6)).await;
        assert_eq!(entry.data().as_deref(), Some(&1));
        assert_eq!(registry.stats().in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_respects_pass_limit() {
        let registry = registry(1);
        let (a, _, _) = counting_node("a", Duration::from_secs(60), Duration::from_secs(10));
        let (b, _, _) = counting_node("b", Duration::from_secs(60), Duration::from_secs(10));
        registry.try_add(a);
        registry.try_add(b);

        assert_eq!(registry.scan(), 1);
        tokio::task::yield_now().await;
        assert_eq!(registry.scan(), 0, "permit still held and running node skipped");

        sleep(Duration::from_secs(11)).await;
        assert_eq!(registry.scan(), 1);
        assert_eq!(registry.stats().passes_dispatched, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_skips_fresh_nodes() {
        let registry = registry(8);
        let (node, _, calls) = counting_node("a", Duration::from_secs(60), Duration::ZERO);
        registry.try_add(node);

        assert_eq!(registry.poll_all(false).await, 1);
        sleep(Duration::from_secs(2)).await;
        assert_eq!(registry.scan(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_poll() {
        let registry = registry(8);
        let (node, entry, calls) = counting_node("a", Duration::from_secs(60), Duration::ZERO);
        registry.try_add(node);

        assert!(registry.force_poll("test", "a", None).await);
        assert!(registry.force_poll("test", "a", Some(entry.id())).await);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(!registry.force_poll("test", "a", Some(Uuid::new_v4())).await);
        assert!(!registry.force_poll("test", "missing", None).await);
    }

    struct ExplodingPollable {
        id: Uuid,
    }

    impl MonitorStatusSource for ExplodingPollable {
        fn monitor_status(&self) -> MonitorStatus {
            MonitorStatus::Good
        }

        fn monitor_status_reason(&self) -> Option<String> {
            None
        }
    }

    #[async_trait]
    impl Pollable for ExplodingPollable {
        fn id(&self) -> Uuid {
            self.id
        }

        fn name(&self) -> &str {
            "exploding"
        }

        fn should_poll(&self) -> bool {
            panic!("should_poll exploded")
        }

        fn is_polling(&self) -> bool {
            false
        }

        fn affects_node_status(&self) -> bool {
            false
        }

        fn last_poll_at(&self) -> Option<DateTime<Utc>> {
            None
        }

        async fn refresh(&self, _force: bool) -> RefreshOutcome {
            RefreshOutcome::Skipped
        }

        fn set_owner(&self, _owner: Weak<dyn CacheOwner>) {}

        fn info(&self) -> CacheInfo {
            CacheInfo {
                id: self.id,
                name: "exploding".into(),
                status: MonitorStatus::Good,
                reason: None,
                has_data: false,
                is_polling: false,
                last_poll: None,
                last_success: None,
                last_poll_duration_ms: None,
                polls_total: 0,
                polls_successful: 0,
                consecutive_failures: 0,
                error_message: None,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_survives_scan_faults() {
        let registry = registry(8);
        let node = PollNode::builder("test", "broken")
            .with_cache(Arc::new(ExplodingPollable { id: Uuid::new_v4() }))
            .build();
        registry.try_add(node);

        registry.start();
        sleep(Duration::from_millis(3500)).await;

        let stats = registry.stats();
        assert_eq!(stats.scheduler_faults, 4);
        assert!(registry.is_running());
        registry.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_reports_unhealthy_nodes_as_issues() {
        let registry = registry(8);
        let failing = CacheEntry::<u32>::new("health", Duration::from_secs(60), || async {
            Err(PollError::fetch("refused"))
        });
        registry.try_add(PollNode::builder("sql", "db-01").with_cache(failing).build());
        let (healthy, _, _) = counting_node("ok", Duration::from_secs(60), Duration::ZERO);
        registry.try_add(healthy);

        registry.poll_all(false).await;
        let issues = registry.issues().await;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].title, "db-01");
        assert_eq!(issues[0].status, MonitorStatus::Critical);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_interval_does_not_stall_scan() {
        let registry = registry(8);
        let idle = CacheEntry::<u32>::new("value", Duration::from_millis(1), || async { Ok(7) });
        let huge = PollNode::builder("test", "huge")
            .with_cache(idle)
            .with_min_interval(Duration::from_secs(u64::MAX))
            .build();
        registry.try_add(huge);
        let (normal, _, calls) = counting_node("normal", Duration::from_millis(1), Duration::ZERO);
        registry.try_add(normal);

        assert_eq!(registry.poll_all(false).await, 2);
        sleep(Duration::from_secs(2)).await;

        assert_eq!(registry.scan(), 1);
        sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(registry.stats().scheduler_faults, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_isolates_faulty_node() {
        let registry = registry(8);
        let broken = PollNode::builder("test", "broken")
            .with_cache(Arc::new(ExplodingPollable { id: Uuid::new_v4() }))
            .build();
        registry.try_add(broken);
        let (healthy, _, calls) = counting_node("healthy", Duration::from_secs(60), Duration::ZERO);
        registry.try_add(healthy);

        assert_eq!(registry.scan(), 1);
        sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.stats().scheduler_faults, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reader_refresh_counts_as_in_flight() {
        let registry = registry(8);
        let (node, entry, _calls) =
            counting_node("a", Duration::from_secs(5), Duration::from_secs(2));
        registry.try_add(node);

        assert_eq!(registry.poll_all(false).await, 1);
        assert_eq!(registry.stats().refreshes_total, 1);
        sleep(Duration::from_secs(6)).await;

        assert_eq!(entry.poll(false).await.as_deref(), Some(&1));
        sleep(Duration::from_millis(100)).await;
        let stats = registry.stats();
        assert_eq!(stats.in_flight, 1);
        assert_eq!(stats.refreshes_total, 2);

        sleep(Duration::from_secs(3)).await;
        assert_eq!(registry.stats().in_flight, 0);
        assert_eq!(entry.data().as_deref(), Some(&2));
    }
}
