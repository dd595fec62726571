//! # Retention Pruning Dispatcher
//!
//! Reads the retention thresholds from the core settings record and submits one
//! pruning job per enabled domain. Submissions are fire-and-forget; a rejected
//! submission is recorded in the report and the remaining domains still go out.

use opentelemetry::KeyValue;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::errors::{ReconcileError, ReconcileResult};
use crate::jobs::{JobDispatcher, JobRequest};
use crate::metrics;
use crate::models::{CoreSettings, RetentionDomain};
use crate::store::FleetStore;

/// What happened to one retention domain this cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PruneDisposition {
    Submitted,
    /// Threshold is zero or negative
    Disabled,
    SubmitFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneDomainOutcome {
    pub domain: RetentionDomain,
    pub retention_days: i32,
    pub disposition: PruneDisposition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneDispatchReport {
    pub outcomes: Vec<PruneDomainOutcome>,
}

impl PruneDispatchReport {
    pub fn submitted(&self) -> usize {
        self.count(|d| matches!(d, PruneDisposition::Submitted))
    }

    pub fn disabled(&self) -> usize {
        self.count(|d| matches!(d, PruneDisposition::Disabled))
    }

    pub fn failed(&self) -> usize {
        self.count(|d| matches!(d, PruneDisposition::SubmitFailed(_)))
    }

    pub fn outcome(&self, domain: RetentionDomain) -> Option<&PruneDomainOutcome> {
        self.outcomes.iter().find(|o| o.domain == domain)
    }

    fn count(&self, predicate: impl Fn(&PruneDisposition) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|o| predicate(&o.disposition))
            .count()
    }
}

/// The job requests a settings record calls for, in domain order
pub fn planned_prune_jobs(settings: &CoreSettings) -> Vec<(RetentionDomain, JobRequest)> {
    RetentionDomain::ALL
        .iter()
        .filter_map(|domain| {
            let days = settings.retention_days(*domain);
            (days > 0).then(|| (*domain, JobRequest::prune(*domain, days)))
        })
        .collect()
}

#[derive(Clone)]
pub struct RetentionPruningDispatcher {
    store: Arc<dyn FleetStore>,
    jobs: Arc<dyn JobDispatcher>,
}

impl std::fmt::Debug for RetentionPruningDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetentionPruningDispatcher")
            .finish_non_exhaustive()
    }
}

impl RetentionPruningDispatcher {
    pub fn new(store: Arc<dyn FleetStore>, jobs: Arc<dyn JobDispatcher>) -> Self {
        Self { store, jobs }
    }

    /// Submit pruning jobs for every domain with a positive threshold
    ///
    /// # Errors
    ///
    /// [`ReconcileError::MissingCoreSettings`] when the settings record does not
    /// exist; no job is submitted in that case. Store failures propagate.
    pub async fn dispatch(&self) -> ReconcileResult<PruneDispatchReport> {
        let settings = self
            .store
            .core_settings()
            .await?
            .ok_or(ReconcileError::MissingCoreSettings)?;

        Ok(self.dispatch_with(&settings))
    }

    /// Submit against an already-loaded settings record
    pub fn dispatch_with(&self, settings: &CoreSettings) -> PruneDispatchReport {
        let mut report = PruneDispatchReport::default();

        for domain in RetentionDomain::ALL {
            let retention_days = settings.retention_days(domain);

            let disposition = if retention_days <= 0 {
                PruneDisposition::Disabled
            } else {
                match self.jobs.submit(JobRequest::prune(domain, retention_days)) {
                    Ok(()) => {
                        metrics::prune_jobs_submitted_total()
                            .add(1, &[KeyValue::new("domain", domain.job_name())]);
                        PruneDisposition::Submitted
                    }
                    Err(e) => {
                        warn!(
                            job = domain.job_name(),
                            retention_days = retention_days,
                            error = %e,
                            "Failed to submit pruning job"
                        );
                        PruneDisposition::SubmitFailed(e.to_string())
                    }
                }
            };

            report.outcomes.push(PruneDomainOutcome {
                domain,
                retention_days,
                disposition,
            });
        }

        if report.submitted() > 0 || report.failed() > 0 {
            info!(
                submitted = report.submitted(),
                disabled = report.disabled(),
                failed = report.failed(),
                "Retention pruning dispatched"
            );
        } else {
            debug!("All retention domains disabled; nothing to prune");
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::ChannelJobDispatcher;
    use crate::store::InMemoryFleetStore;

    fn settings() -> CoreSettings {
        CoreSettings {
            check_history_prune_days: 30,
            resolved_alerts_prune_days: 0,
            agent_history_prune_days: -5,
            debug_log_prune_days: 7,
            audit_log_prune_days: 0,
            clear_faults_days: 14,
            ..CoreSettings::default()
        }
    }

    #[test]
    fn test_planned_jobs_skip_non_positive_thresholds() {
        let jobs = planned_prune_jobs(&settings());
        let names: Vec<&str> = jobs.iter().map(|(_, r)| r.job.as_str()).collect();
        assert_eq!(
            names,
            vec!["prune_check_history", "prune_debug_log", "clear_faults"]
        );
    }

    #[tokio::test]
    async fn test_missing_settings_is_fatal() {
        let store = Arc::new(InMemoryFleetStore::new());
        let (jobs, mut rx) = ChannelJobDispatcher::channel(8);
        let dispatcher = RetentionPruningDispatcher::new(store, Arc::new(jobs));

        let result = dispatcher.dispatch().await;
        assert_eq!(result, Err(ReconcileError::MissingCoreSettings));
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_dispatch_submits_exact_thresholds() {
        let store = Arc::new(InMemoryFleetStore::new());
        store.set_core_settings(Some(settings()));
        let (jobs, mut rx) = ChannelJobDispatcher::channel(8);
        let dispatcher = RetentionPruningDispatcher::new(store, Arc::new(jobs));

        let report = dispatcher.dispatch().await.unwrap();
        assert_eq!(report.submitted(), 3);
        assert_eq!(report.disabled(), 3);
        assert_eq!(report.failed(), 0);

        let first = rx.try_recv().unwrap();
        assert_eq!(first, JobRequest::prune(RetentionDomain::CheckHistory, 30));
        assert_eq!(rx.try_recv().unwrap().args, vec![serde_json::Value::from(7)]);
        assert_eq!(rx.try_recv().unwrap().job, "clear_faults");
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_full_channel_records_failure_and_continues() {
        let store = Arc::new(InMemoryFleetStore::new());
        store.set_core_settings(Some(settings()));
        let (jobs, _rx) = ChannelJobDispatcher::channel(1);
        let dispatcher = RetentionPruningDispatcher::new(store, Arc::new(jobs));

        let report = dispatcher.dispatch().await.unwrap();
        assert_eq!(report.submitted(), 1);
        assert_eq!(report.failed(), 2);
        assert!(matches!(
            report.outcome(RetentionDomain::FaultClearing).unwrap().disposition,
            PruneDisposition::SubmitFailed(_)
        ));
    }
}
