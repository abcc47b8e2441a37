//! HTTP endpoint probe

use crate::config::{HttpTargetConfig, PollingConfig};
use crate::core::cache::CacheEntry;
use crate::core::node::{DomainStatus, PollNode};
use crate::core::registry::PollingRegistry;
use crate::core::status::MonitorStatus;
use crate::utils::error::{PollError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Node kind of HTTP targets
pub const HTTP_KIND: &str = "http";

/// Outcome of one GET against a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpProbe {
    pub status_code: u16,
    #[serde(with = "millis")]
    pub latency: Duration,
    pub checked_at: DateTime<Utc>,
}

impl HttpProbe {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

mod millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}

/// A configured HTTP endpoint backed by one poll node
pub struct HttpTarget {
    config: HttpTargetConfig,
    node: Arc<PollNode>,
    probe: Arc<CacheEntry<HttpProbe>>,
}

impl HttpTarget {
    /// Build the node for `config`; nothing is registered yet
    pub fn new(config: HttpTargetConfig, polling: &PollingConfig, client: reqwest::Client) -> Self {
        let url = config.url.clone();
        let probe = CacheEntry::<HttpProbe>::builder(format!("GET {}", config.url))
            .with_cache_duration(config.interval())
            .with_timeout(
                config
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| polling.fetch_timeout()),
            )
            .build(move || send_probe(client.clone(), url.clone()));

        let hook_probe = Arc::clone(&probe);
        let latency_warning = config.latency_warning();
        let node = PollNode::builder(HTTP_KIND, config.name.clone())
            .with_polling_config(polling)
            .with_cache(probe.clone())
            .with_cluster(config.cluster)
            .with_status_hook(move || assess(hook_probe.data().as_deref(), latency_warning))
            .build();

        Self {
            config,
            node,
            probe,
        }
    }

    /// Register the target's node, failing if the name is taken
    pub fn register(&self, registry: &PollingRegistry) -> Result<()> {
        registry.register(Arc::clone(&self.node)).map(|_| ())
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn node(&self) -> &Arc<PollNode> {
        &self.node
    }

    /// Latest probe result, if any
    pub fn last_probe(&self) -> Option<Arc<HttpProbe>> {
        self.probe.data()
    }
}

async fn send_probe(client: reqwest::Client, url: String) -> Result<HttpProbe> {
    let started = Instant::now();
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| PollError::fetch(format!("GET {} failed: {}", url, e)))?;

    let probe = HttpProbe {
        status_code: response.status().as_u16(),
        latency: started.elapsed(),
        checked_at: Utc::now(),
    };
    debug!(url = %url, status = probe.status_code, latency_ms = probe.latency.as_millis() as u64, "Probed");
    Ok(probe)
}

/// Domain status of a probe result
pub fn assess(probe: Option<&HttpProbe>, latency_warning: Duration) -> DomainStatus {
    let Some(probe) = probe else {
        return DomainStatus::single(MonitorStatus::Unknown, Some("No probe yet".to_string()));
    };

    if !probe.is_success() {
        return DomainStatus::single(
            MonitorStatus::Critical,
            Some(format!("HTTP {}", probe.status_code)),
        );
    }

    if probe.latency > latency_warning {
        return DomainStatus::single(
            MonitorStatus::Warning,
            Some(format!(
                "Slow response: {}ms (threshold {}ms)",
                probe.latency.as_millis(),
                latency_warning.as_millis()
            )),
        );
    }

    DomainStatus::good()
}
