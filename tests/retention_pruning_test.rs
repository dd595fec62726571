mod common;

use common::*;
use serde_json::Value;
use std::sync::Arc;

use fleet_reconciler::errors::ReconcileError;
use fleet_reconciler::models::{CoreSettings, RetentionDomain};
use fleet_reconciler::orchestration::{PruneDisposition, RetentionPruningDispatcher};
use fleet_reconciler::store::InMemoryFleetStore;

fn all_enabled() -> CoreSettings {
    CoreSettings {
        check_history_prune_days: 30,
        resolved_alerts_prune_days: 60,
        agent_history_prune_days: 45,
        debug_log_prune_days: 7,
        audit_log_prune_days: 365,
        clear_faults_days: 14,
        ..CoreSettings::default()
    }
}

#[tokio::test]
async fn test_each_positive_threshold_submits_exactly_one_job() {
    let store = Arc::new(InMemoryFleetStore::new());
    store.set_core_settings(Some(all_enabled()));
    let jobs = Arc::new(RecordingJobDispatcher::new());

    let report = RetentionPruningDispatcher::new(store, jobs.clone())
        .dispatch()
        .await
        .unwrap();

    assert_eq!(report.submitted(), 6);
    let submitted = jobs.submitted();
    let expected = [
        ("prune_check_history", 30),
        ("prune_resolved_alerts", 60),
        ("prune_agent_history", 45),
        ("prune_debug_log", 7),
        ("prune_audit_log", 365),
        ("clear_faults", 14),
    ];
    assert_eq!(submitted.len(), expected.len());
    for (request, (job, days)) in submitted.iter().zip(expected) {
        assert_eq!(request.job, job);
        assert_eq!(request.args, vec![Value::from(days)]);
    }
}

#[tokio::test]
async fn test_zero_and_negative_thresholds_submit_nothing() {
    let store = Arc::new(InMemoryFleetStore::new());
    store.set_core_settings(Some(CoreSettings {
        check_history_prune_days: 0,
        resolved_alerts_prune_days: -1,
        audit_log_prune_days: 90,
        ..CoreSettings::default()
    }));
    let jobs = Arc::new(RecordingJobDispatcher::new());

    let report = RetentionPruningDispatcher::new(store, jobs.clone())
        .dispatch()
        .await
        .unwrap();

    assert_eq!(jobs.job_names(), vec!["prune_audit_log".to_string()]);
    assert_eq!(report.disabled(), 5);
    assert_eq!(
        report.outcome(RetentionDomain::ResolvedAlerts).unwrap().disposition,
        PruneDisposition::Disabled
    );
}

#[tokio::test]
async fn test_missing_settings_aborts_without_submissions() {
    let store = Arc::new(InMemoryFleetStore::new());
    let jobs = Arc::new(RecordingJobDispatcher::new());

    let result = RetentionPruningDispatcher::new(store, jobs.clone())
        .dispatch()
        .await;

    assert_eq!(result.unwrap_err(), ReconcileError::MissingCoreSettings);
    assert!(jobs.submitted().is_empty());
}

#[tokio::test]
async fn test_rejected_submission_does_not_block_other_domains() {
    let store = Arc::new(InMemoryFleetStore::new());
    store.set_core_settings(Some(all_enabled()));
    let jobs = Arc::new(RecordingJobDispatcher::rejecting(&["prune_agent_history"]));

    let report = RetentionPruningDispatcher::new(store, jobs.clone())
        .dispatch()
        .await
        .unwrap();

    assert_eq!(report.submitted(), 5);
    assert_eq!(report.failed(), 1);
    assert!(!jobs.job_names().contains(&"prune_agent_history".to_string()));
    assert!(jobs.job_names().contains(&"clear_faults".to_string()));
}
