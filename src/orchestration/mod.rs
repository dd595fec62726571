//! # Reconciliation Components
//!
//! The four periodic components of the reconciliation core and the services
//! that run them.
//!
//! - [`RetentionPruningDispatcher`]: one pruning job per enabled retention domain
//! - [`ExpiredTaskReaper`]: removal jobs for run-once tasks past their fire time
//! - [`StatusAggregator`]: cached failing status and agent count per site and client
//! - [`AgentReconciler`]: update finalization, task sync, alert resolution, cache refresh
//!
//! Each component reads current state from a [`FleetStore`](crate::store::FleetStore),
//! takes any process-wide settings as an explicit argument, and returns a report
//! describing what it did per item.

pub mod agent_reconciler;
pub mod bootstrap;
pub mod expired_task_reaper;
pub mod retention_pruning;
pub mod services;
pub mod status_aggregation;

pub use agent_reconciler::{
    AgentReconcileOutcome, AgentReconciler, AlertOutcome, Eligibility, ReconciliationReport,
    TaskSyncOutcome, TaskSyncResult,
};
pub use bootstrap::{ReconcilerDependencies, ReconcilerSystem, ReconcilerSystemHandle};
pub use expired_task_reaper::{
    evaluate_candidate, resolve_fire_instant, ExpiredTaskReaper, ReapCandidateOutcome,
    ReapOutcome, ReaperReport,
};
pub use retention_pruning::{
    planned_prune_jobs, PruneDispatchReport, PruneDisposition, PruneDomainOutcome,
    RetentionPruningDispatcher,
};
pub use services::{
    CacheRefreshCycleReport, CacheRefreshService, MaintenanceCycleReport, MaintenanceService,
};
pub use status_aggregation::{
    fold_failing_status, AggregationReport, FailingStatusFold, FoldOutcome, OwnerAggregate,
    StatusAggregator,
};
