mod common;

use chrono::{NaiveDate, Utc};
use common::*;
use std::sync::Arc;
use std::time::Duration;

use fleet_reconciler::config::ReconcilerConfig;
use fleet_reconciler::errors::ReconcileError;
use fleet_reconciler::models::{CoreSettings, FailingStatus, PatchAction};
use fleet_reconciler::orchestration::{ReconcilerDependencies, ReconcilerSystem};
use fleet_reconciler::state_machine::SyncStatus;
use fleet_reconciler::store::InMemoryFleetStore;

fn config() -> ReconcilerConfig {
    let mut config = ReconcilerConfig::default();
    config.deployment.latest_agent_version = "2.4.0".to_string();
    config
}

fn dependencies(
    store: Arc<InMemoryFleetStore>,
    jobs: Arc<RecordingJobDispatcher>,
    remote: Arc<ScriptedTaskRemote>,
) -> ReconcilerDependencies {
    ReconcilerDependencies {
        store,
        jobs,
        remote,
        alerts: Arc::new(ScriptedAlertResolver::new()),
    }
}

#[tokio::test]
async fn test_maintenance_cycle_runs_reaper_and_pruning() {
    let store = single_site_store();
    store.set_core_settings(Some(CoreSettings {
        debug_log_prune_days: 3,
        ..CoreSettings::default()
    }));
    store.insert_agent(AgentBuilder::new(1, 10).build());
    let past = NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    store.insert_task(TaskBuilder::new(5, 1).run_once_at(past).last_run(Utc::now()).build());

    let jobs = Arc::new(RecordingJobDispatcher::new());
    let system = ReconcilerSystem::build(
        &config(),
        dependencies(store, jobs.clone(), Arc::new(ScriptedTaskRemote::new())),
    )
    .unwrap();

    let report = system.maintenance.run_once().await;
    assert!(report.is_ok());
    assert_eq!(
        jobs.job_names(),
        vec!["delete_task_schedule".to_string(), "prune_debug_log".to_string()]
    );
}

#[tokio::test]
async fn test_missing_settings_fails_both_maintenance_components() {
    let store = Arc::new(InMemoryFleetStore::new());
    let jobs = Arc::new(RecordingJobDispatcher::new());
    let system = ReconcilerSystem::build(
        &config(),
        dependencies(store, jobs.clone(), Arc::new(ScriptedTaskRemote::new())),
    )
    .unwrap();

    let report = system.maintenance.run_once().await;
    assert!(!report.is_ok());
    assert_eq!(report.reaper, Err(ReconcileError::MissingCoreSettings));
    assert_eq!(report.pruning, Err(ReconcileError::MissingCoreSettings));
    assert!(jobs.submitted().is_empty());
}

#[tokio::test]
async fn test_cache_refresh_cycle_aggregates_then_reconciles() {
    let store = single_site_store();
    store.insert_agent(AgentBuilder::new(1, 10).checks(true, true, false).build());
    store.insert_agent(AgentBuilder::new(2, 10).version("1.0.0").build());
    store.insert_task(TaskBuilder::new(1, 1).sync_status(SyncStatus::NotSynced).build());
    store.insert_patch(patch(1, 2, PatchAction::Approve, false));

    let remote = Arc::new(ScriptedTaskRemote::new());
    let system = ReconcilerSystem::build(
        &config(),
        dependencies(store.clone(), Arc::new(RecordingJobDispatcher::new()), remote.clone()),
    )
    .unwrap();

    let first = system.cache_refresh.run_once().await;
    let second = system.cache_refresh.run_once().await;
    assert!(first.is_ok() && second.is_ok());
    assert_ne!(first.cycle_id, second.cycle_id);

    assert_eq!(
        store.site(10).unwrap().failing_checks,
        FailingStatus {
            error: false,
            warning: true
        }
    );
    assert_eq!(store.client(1).unwrap().agent_count, 2);
    assert_eq!(store.task(1).unwrap().sync_status, SyncStatus::Synced);
    assert!(store.agent(2).unwrap().has_patches_pending);

    // Synced on the first cycle, nothing left to push on the second
    assert_eq!(remote.calls().len(), 1);
}

#[tokio::test]
async fn test_started_services_tick_and_stop() {
    let store = single_site_store();
    store.insert_agent(AgentBuilder::new(1, 10).build());
    store.insert_task(TaskBuilder::new(1, 1).sync_status(SyncStatus::Initial).build());

    let mut config = config();
    config.maintenance.enabled = false;
    let (deps, _receiver) = ReconcilerDependencies::with_job_channel(
        &config,
        store.clone(),
        Arc::new(ScriptedTaskRemote::new()),
        Arc::new(ScriptedAlertResolver::new()),
    );

    let mut handle = ReconcilerSystem::build(&config, deps).unwrap().start();
    assert_eq!(handle.service_count(), 1);

    // The first interval tick fires immediately
    let mut synced = false;
    for _ in 0..50 {
        if store.task(1).unwrap().sync_status == SyncStatus::Synced {
            synced = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(synced);

    handle.stop().await.unwrap();
    assert!(!handle.is_running());
}
