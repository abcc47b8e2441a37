//! opwatch - poll, cache and report the health of monitored targets

#![allow(missing_docs)]

use anyhow::Context;
use clap::Parser;
use opwatch::config::Config;
use opwatch::core::issues::{IssueAggregator, count_by_status};
use opwatch::core::registry::{PollingRegistry, RegistryConfig};
use opwatch::core::status::MonitorStatus;
use opwatch::targets::HttpTarget;
use opwatch::utils::logging::init_tracing;
use opwatch::utils::shutdown::shutdown_signal;
use opwatch::{VERSION, build_info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "opwatch", version, about = "Poll, cache and report the health of monitored targets")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "OPWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, overriding the configured level
    #[arg(long)]
    log_level: Option<String>,

    /// Run one warm-up pass, print issues as JSON and exit
    #[arg(long)]
    once: bool,

    /// Seconds between status summaries in the log
    #[arg(long, default_value_t = 60)]
    report_interval_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path).await?,
        None => Config::from_env()?,
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    init_tracing(&config.logging)?;
    info!(version = VERSION, git = build_info().git_hash, "Starting opwatch");

    let registry = PollingRegistry::new(RegistryConfig::from(&config.polling));
    let aggregator = IssueAggregator::from_config(&config.issues);
    aggregator.add_provider(Arc::new(registry.clone()));

    let client = reqwest::Client::builder()
        .user_agent(format!("opwatch/{}", VERSION))
        .build()
        .context("Failed to build HTTP client")?;
    for target_config in &config.targets {
        let target = HttpTarget::new(target_config.clone(), &config.polling, client.clone());
        if let Err(e) = target.register(&registry) {
            warn!("Skipping target {}: {}", target.name(), e);
        }
    }
    info!(targets = registry.len(), "Targets registered");

    let warmed = registry.poll_all(false).await;
    info!(passes = warmed, "Warm-up complete");

    if cli.once {
        let issues = aggregator.refresh().await;
        println!("{}", serde_json::to_string_pretty(issues.as_slice())?);
        return Ok(());
    }

    registry.start();

    let mut report = tokio::time::interval(Duration::from_secs(cli.report_interval_secs.max(1)));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = report.tick() => log_summary(&registry, &aggregator).await,
        }
    }

    registry.shutdown().await;
    info!("opwatch stopped");
    Ok(())
}

async fn log_summary(registry: &PollingRegistry, aggregator: &IssueAggregator) {
    let issues = aggregator.issues().await;
    let counts = count_by_status(&issues);
    let stats = registry.stats();
    info!(
        nodes = stats.nodes,
        issues = issues.len(),
        critical = counts.get(&MonitorStatus::Critical).copied().unwrap_or(0),
        warning = counts.get(&MonitorStatus::Warning).copied().unwrap_or(0),
        in_flight = stats.in_flight,
        ticks = stats.ticks,
        "Status summary"
    );
    for issue in issues.iter().filter(|i| i.status == MonitorStatus::Critical) {
        warn!(source = %issue.source, "{}: {}", issue.title, issue.description);
    }
}
