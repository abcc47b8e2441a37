//! Background scheduler
//!
//! One coordinator task wakes on a fixed tick, scans the registry and
//! dispatches passes for due nodes as detached tasks. The scan itself never
//! waits on a node.

use super::polling_registry::RegistryInner;
use crate::core::node::{PassOutcome, PollNode};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

pub(super) async fn run(registry: Weak<RegistryInner>, cancel: CancellationToken, tick: Duration) {
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(inner) = registry.upgrade() else {
            debug!("Registry dropped, scheduler exiting");
            break;
        };

        if std::panic::catch_unwind(AssertUnwindSafe(|| scan(&inner))).is_err() {
            inner.stats.record_fault();
            error!("Scheduler scan panicked; continuing on next tick");
        }
    }

    info!("Polling scheduler stopped");
}

/// Dispatch a pass for every node that is due, idle and has stale caches.
///
/// Nodes that cannot get a permit are left for a later tick. A node whose
/// checks panic is skipped for this tick and counted as a fault.
pub(super) fn scan(inner: &Arc<RegistryInner>) -> usize {
    inner.stats.record_tick();

    let due: Vec<Arc<PollNode>> = inner
        .nodes
        .iter()
        .filter(|entry| is_due(inner, entry.value()))
        .map(|entry| Arc::clone(entry.value()))
        .collect();

    let mut dispatched = 0;
    for node in due {
        let Ok(permit) = Arc::clone(&inner.permits).try_acquire_owned() else {
            debug!(
                pending = inner.nodes.len(),
                "Pass limit reached, deferring remaining nodes"
            );
            break;
        };

        inner.stats.record_dispatch();
        dispatched += 1;
        tokio::spawn(async move {
            let _permit = permit;
            match AssertUnwindSafe(node.poll(false)).catch_unwind().await {
                Ok(PassOutcome::Completed(report)) => {
                    trace!(node = %node.node_key(), ?report, "Scheduled pass finished");
                }
                Ok(PassOutcome::AlreadyPolling) => {
                    trace!(node = %node.node_key(), "Scheduled pass skipped, already polling");
                }
                Err(_) => {
                    error!(node = %node.node_key(), "Scheduled pass panicked");
                }
            }
        });
    }

    dispatched
}

fn is_due(inner: &RegistryInner, node: &PollNode) -> bool {
    let check = std::panic::catch_unwind(AssertUnwindSafe(|| {
        node.needs_poll() && !node.is_polling() && node.has_due_caches()
    }));
    match check {
        Ok(due) => due,
        Err(_) => {
            inner.stats.record_fault();
            error!(node = %node.node_key(), "Scheduling check panicked, skipping node");
            false
        }
    }
}
