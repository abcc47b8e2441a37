//! Issue aggregation integration tests

#[cfg(test)]
mod tests {
    use crate::common::ControlledFetch;
    use opwatch::core::issues::{Issue, IssueAggregator, IssueProvider};
    use opwatch::core::node::PollNode;
    use opwatch::core::registry::{PollingRegistry, RegistryConfig};
    use opwatch::core::status::MonitorStatus;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::advance;

    const SECOND: Duration = Duration::from_secs(1);

    struct Maintenance;

    #[async_trait::async_trait]
    impl IssueProvider for Maintenance {
        fn name(&self) -> &str {
            "maintenance"
        }

        async fn issues(&self) -> Vec<Issue> {
            vec![
                Issue::new("Planned upgrade", "Cluster upgrade window", MonitorStatus::Maintenance)
                    .with_cluster(true)
                    .with_source("maintenance"),
            ]
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_and_custom_providers_merge() {
        let registry = PollingRegistry::new(RegistryConfig::default());
        let broken = ControlledFetch::failing();
        let healthy = ControlledFetch::new("ok");
        registry.try_add(
            PollNode::builder("sql", "db-01")
                .with_cache(broken.entry("health", 30 * SECOND, None))
                .build(),
        );
        registry.try_add(
            PollNode::builder("sql", "db-02")
                .with_cache(healthy.entry("health", 30 * SECOND, None))
                .build(),
        );
        registry.poll_all(false).await;

        let aggregator = IssueAggregator::new(15 * SECOND, 60 * SECOND);
        aggregator.add_provider(Arc::new(registry.clone()));
        aggregator.add_provider(Arc::new(Maintenance));

        let issues = aggregator.issues().await;
        let titles: Vec<_> = issues.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Planned upgrade", "db-01"]);
        assert_eq!(issues[1].source, "sql");
        assert!(issues[1].description.contains("backend unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovered_node_drops_out_after_cache_window() {
        let registry = PollingRegistry::new(RegistryConfig::default());
        let fetch = ControlledFetch::failing();
        registry.try_add(
            PollNode::builder("svc", "api")
                .with_cache(fetch.entry("health", 5 * SECOND, None))
                .build(),
        );
        registry.poll_all(false).await;

        let aggregator = IssueAggregator::new(15 * SECOND, 60 * SECOND);
        aggregator.add_provider(Arc::new(registry.clone()));
        assert_eq!(aggregator.issues().await.len(), 1);

        fetch.set_failing(false);
        advance(6 * SECOND).await;
        registry.poll_all(false).await;
        assert_eq!(aggregator.issues().await.len(), 1, "cached list still fresh");

        advance(10 * SECOND).await;
        assert!(aggregator.refresh().await.is_empty());
    }
}
