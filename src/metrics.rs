//! # Reconciliation Metrics
//!
//! OpenTelemetry counters for the background services. Recording is
//! best-effort: without an installed meter provider these are no-ops.
//!
//! ```rust
//! use fleet_reconciler::metrics::*;
//! use opentelemetry::KeyValue;
//!
//! prune_jobs_submitted_total().add(1, &[KeyValue::new("domain", "audit_log")]);
//! ```

use opentelemetry::metrics::{Counter, Meter};
use std::sync::OnceLock;

static RECONCILER_METER: OnceLock<Meter> = OnceLock::new();

fn meter() -> &'static Meter {
    RECONCILER_METER.get_or_init(|| opentelemetry::global::meter("fleet-reconciler"))
}

/// Completed cycles
///
/// Labels:
/// - service: maintenance | cache_refresh
/// - outcome: ok | error
pub fn cycles_total() -> Counter<u64> {
    meter()
        .u64_counter("reconciler.cycles.total")
        .with_description("Total number of reconciliation cycles run")
        .build()
}

/// Labels:
/// - domain: retention domain
pub fn prune_jobs_submitted_total() -> Counter<u64> {
    meter()
        .u64_counter("reconciler.prune_jobs.submitted.total")
        .with_description("Retention pruning jobs submitted")
        .build()
}

pub fn expired_task_removals_total() -> Counter<u64> {
    meter()
        .u64_counter("reconciler.expired_tasks.removals.total")
        .with_description("Removal jobs submitted for expired run-once tasks")
        .build()
}

/// Labels:
/// - component: status_aggregation
pub fn owner_status_refreshes_total() -> Counter<u64> {
    meter()
        .u64_counter("reconciler.owner_status.refreshes.total")
        .with_description("Site and client cached status rewrites")
        .build()
}

/// Labels:
/// - operation: create | modify | delete
/// - result: synced | removed | failed
pub fn task_sync_outcomes_total() -> Counter<u64> {
    meter()
        .u64_counter("reconciler.task_sync.outcomes.total")
        .with_description("Scheduled task sync attempts by outcome")
        .build()
}

/// Labels:
/// - result: attempted | failed
pub fn alert_resolutions_total() -> Counter<u64> {
    meter()
        .u64_counter("reconciler.alert_resolutions.total")
        .with_description("Alert resolution attempts by outcome")
        .build()
}

pub fn agent_updates_finalized_total() -> Counter<u64> {
    meter()
        .u64_counter("reconciler.agent_updates.finalized.total")
        .with_description("Pending agent update actions marked completed")
        .build()
}
