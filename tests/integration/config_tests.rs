//! Configuration file integration tests

#[cfg(test)]
mod tests {
    use opwatch::config::Config;
    use opwatch::core::registry::RegistryConfig;
    use opwatch::targets::HttpTarget;
    use opwatch::core::registry::PollingRegistry;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const EXAMPLE: &str = include_str!("../../config/opwatch.yaml.example");

    #[test]
    fn test_example_config_is_valid() {
        let config = Config::from_yaml(EXAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[1].timeout_secs, Some(5));
        assert!(config.targets[1].cluster);

        let registry_config = RegistryConfig::from(&config.polling);
        assert_eq!(registry_config.tick_interval, Duration::from_secs(1));
        assert_eq!(registry_config.max_concurrent_passes, 32);
    }

    #[tokio::test]
    async fn test_configured_targets_register_once() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE.as_bytes()).unwrap();
        let config = Config::from_file(file.path()).await.unwrap();

        let registry = PollingRegistry::new(RegistryConfig::from(&config.polling));
        let client = reqwest::Client::new();
        for target in &config.targets {
            HttpTarget::new(target.clone(), &config.polling, client.clone())
                .register(&registry)
                .unwrap();
        }

        assert_eq!(registry.len(), 2);
        let node = registry.get("http", "status-page").unwrap();
        assert!(node.is_cluster());
        assert_eq!(node.backoff(), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_duplicate_targets_fail_validation() {
        let yaml = r#"
targets:
  - name: "api"
    url: "https://a.example.com"
  - name: "api"
    url: "https://b.example.com"
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let err = Config::from_file(file.path()).await.unwrap_err();
        assert!(err.to_string().contains("Duplicate target name"));
    }
}
