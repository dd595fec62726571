//! # Background Services
//!
//! Two periodic services drive the four components:
//!
//! - [`MaintenanceService`]: expired run-once reaping, then retention pruning
//! - [`CacheRefreshService`]: site and client status aggregation, then agent reconciliation
//!
//! Each service serializes its own cycles behind an async mutex, so a manual
//! `run_once` can never overlap a scheduled one and two writers never touch
//! the same agent's cached fields at once. A failed component is logged and
//! reported; the loop keeps ticking.
//!
//! ```rust,ignore
//! let service = CacheRefreshService::new(aggregator, reconciler, snapshot, config);
//! let (tx, rx) = tokio::sync::watch::channel(false);
//! let handle = tokio::spawn(async move { service.run(rx).await });
//! // ...
//! tx.send(true)?;
//! handle.await?;
//! ```

use chrono::Utc;
use opentelemetry::KeyValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use uuid::Uuid;

use super::agent_reconciler::{AgentReconciler, ReconciliationReport};
use super::expired_task_reaper::{ExpiredTaskReaper, ReaperReport};
use super::retention_pruning::{PruneDispatchReport, RetentionPruningDispatcher};
use super::status_aggregation::{AggregationReport, StatusAggregator};
use crate::config::{CacheRefreshConfig, MaintenanceConfig, ReconcileSnapshot};
use crate::errors::ReconcileResult;
use crate::{log_cycle, metrics};

pub const MAINTENANCE_SERVICE: &str = "maintenance";
pub const CACHE_REFRESH_SERVICE: &str = "cache_refresh";

fn record_cycle(service: &'static str, ok: bool) {
    metrics::cycles_total().add(
        1,
        &[
            KeyValue::new("service", service),
            KeyValue::new("outcome", if ok { "ok" } else { "error" }),
        ],
    );
}

fn log_component_error<T>(
    service: &'static str,
    component: &'static str,
    cycle_id: Uuid,
    result: &ReconcileResult<T>,
) {
    if let Err(e) = result {
        error!(
            service = service,
            component = component,
            cycle_id = %cycle_id,
            error = %e,
            "Reconciliation component failed"
        );
    }
}

/// Tick on `period` until the shutdown flag flips, running a full cycle per tick
///
/// A cycle that has started always runs to completion.
async fn drive<F, Fut>(
    service: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut cycle: F,
) where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        service = service,
        interval_seconds = period.as_secs(),
        "Starting reconciliation service"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => cycle().await,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    // sender dropped
                    break;
                }
            }
        }
    }

    info!(service = service, "Reconciliation service stopped");
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceCycleReport {
    pub cycle_id: Uuid,
    pub reaper: ReconcileResult<ReaperReport>,
    pub pruning: ReconcileResult<PruneDispatchReport>,
}

impl MaintenanceCycleReport {
    pub fn is_ok(&self) -> bool {
        self.reaper.is_ok() && self.pruning.is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct MaintenanceService {
    reaper: ExpiredTaskReaper,
    pruning: RetentionPruningDispatcher,
    config: MaintenanceConfig,
    cycle_guard: Arc<Mutex<()>>,
}

impl MaintenanceService {
    pub fn new(
        reaper: ExpiredTaskReaper,
        pruning: RetentionPruningDispatcher,
        config: MaintenanceConfig,
    ) -> Self {
        Self {
            reaper,
            pruning,
            config,
            cycle_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Run the reaper and then the pruning dispatcher once
    ///
    /// The two components are independent; one failing does not skip the other.
    pub async fn run_once(&self) -> MaintenanceCycleReport {
        let _guard = self.cycle_guard.lock().await;
        let cycle_id = Uuid::new_v4();
        log_cycle!(debug, MAINTENANCE_SERVICE, cycle_id);

        let reaper = self.reaper.reap(Utc::now()).await;
        log_component_error(MAINTENANCE_SERVICE, "expired_task_reaper", cycle_id, &reaper);

        let pruning = self.pruning.dispatch().await;
        log_component_error(MAINTENANCE_SERVICE, "retention_pruning", cycle_id, &pruning);

        let report = MaintenanceCycleReport {
            cycle_id,
            reaper,
            pruning,
        };
        record_cycle(MAINTENANCE_SERVICE, report.is_ok());
        log_cycle!(
            info,
            MAINTENANCE_SERVICE,
            cycle_id,
            ok: report.is_ok(),
            removals: report.reaper.as_ref().map(|r| r.submitted_task_ids().len()).unwrap_or(0),
            prune_jobs: report.pruning.as_ref().map(|r| r.submitted()).unwrap_or(0),
        );

        report
    }

    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        drive(MAINTENANCE_SERVICE, self.config.interval(), shutdown, move || async move {
            self.run_once().await;
        })
        .await;
    }

    pub fn config(&self) -> &MaintenanceConfig {
        &self.config
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheRefreshCycleReport {
    pub cycle_id: Uuid,
    pub aggregation: ReconcileResult<AggregationReport>,
    pub reconciliation: ReconcileResult<ReconciliationReport>,
}

impl CacheRefreshCycleReport {
    pub fn is_ok(&self) -> bool {
        self.aggregation.is_ok() && self.reconciliation.is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct CacheRefreshService {
    aggregator: StatusAggregator,
    reconciler: AgentReconciler,
    snapshot: ReconcileSnapshot,
    config: CacheRefreshConfig,
    cycle_guard: Arc<Mutex<()>>,
}

impl CacheRefreshService {
    pub fn new(
        aggregator: StatusAggregator,
        reconciler: AgentReconciler,
        snapshot: ReconcileSnapshot,
        config: CacheRefreshConfig,
    ) -> Self {
        Self {
            aggregator,
            reconciler,
            snapshot,
            config,
            cycle_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Aggregate site and client status, then reconcile every agent
    pub async fn run_once(&self) -> CacheRefreshCycleReport {
        let _guard = self.cycle_guard.lock().await;
        let cycle_id = Uuid::new_v4();
        log_cycle!(debug, CACHE_REFRESH_SERVICE, cycle_id);

        let aggregation = self.aggregator.run().await;
        log_component_error(CACHE_REFRESH_SERVICE, "status_aggregation", cycle_id, &aggregation);

        let reconciliation = self.reconciler.reconcile_all(&self.snapshot).await;
        log_component_error(
            CACHE_REFRESH_SERVICE,
            "agent_reconciliation",
            cycle_id,
            &reconciliation,
        );

        let report = CacheRefreshCycleReport {
            cycle_id,
            aggregation,
            reconciliation,
        };
        record_cycle(CACHE_REFRESH_SERVICE, report.is_ok());
        log_cycle!(
            info,
            CACHE_REFRESH_SERVICE,
            cycle_id,
            ok: report.is_ok(),
            agents: report.reconciliation.as_ref().map(|r| r.agents.len()).unwrap_or(0),
            tasks_failed: report.reconciliation.as_ref().map(|r| r.tasks_failed()).unwrap_or(0),
        );

        report
    }

    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        drive(CACHE_REFRESH_SERVICE, self.config.interval(), shutdown, move || async move {
            self.run_once().await;
        })
        .await;
    }

    pub fn snapshot(&self) -> &ReconcileSnapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &CacheRefreshConfig {
        &self.config
    }
}
