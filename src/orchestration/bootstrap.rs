//! # Reconciler Bootstrap
//!
//! Wires the four components to their collaborators from a validated
//! [`ReconcilerConfig`] and spawns the enabled background services.
//!
//! ```rust,ignore
//! let system = ReconcilerSystem::build(&config, dependencies)?;
//! let mut handle = system.start();
//! // ...
//! handle.stop().await?;
//! ```

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::agent_reconciler::AgentReconciler;
use super::expired_task_reaper::ExpiredTaskReaper;
use super::retention_pruning::RetentionPruningDispatcher;
use super::services::{CacheRefreshService, MaintenanceService};
use super::status_aggregation::StatusAggregator;
use crate::config::ReconcilerConfig;
use crate::errors::{ReconcileError, ReconcileResult};
use crate::jobs::{ChannelJobDispatcher, JobDispatcher, JobReceiver};
use crate::remote::{AlertResolver, TaskRemote};
use crate::store::FleetStore;

/// External collaborators the reconciliation core calls into
#[derive(Clone)]
pub struct ReconcilerDependencies {
    pub store: Arc<dyn FleetStore>,
    pub jobs: Arc<dyn JobDispatcher>,
    pub remote: Arc<dyn TaskRemote>,
    pub alerts: Arc<dyn AlertResolver>,
}

impl std::fmt::Debug for ReconcilerDependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcilerDependencies")
            .finish_non_exhaustive()
    }
}

impl ReconcilerDependencies {
    /// Submit jobs onto a bounded channel sized from `config.jobs`; the host drains the receiver
    pub fn with_job_channel(
        config: &ReconcilerConfig,
        store: Arc<dyn FleetStore>,
        remote: Arc<dyn TaskRemote>,
        alerts: Arc<dyn AlertResolver>,
    ) -> (Self, JobReceiver) {
        let (jobs, receiver) = ChannelJobDispatcher::from_config(&config.jobs);
        let deps = Self {
            store,
            jobs: Arc::new(jobs),
            remote,
            alerts,
        };
        (deps, receiver)
    }
}

/// Both background services, built but not yet running
#[derive(Debug, Clone)]
pub struct ReconcilerSystem {
    pub maintenance: MaintenanceService,
    pub cache_refresh: CacheRefreshService,
    maintenance_enabled: bool,
    cache_refresh_enabled: bool,
}

impl ReconcilerSystem {
    pub fn build(
        config: &ReconcilerConfig,
        deps: ReconcilerDependencies,
    ) -> ReconcileResult<Self> {
        config.validate()?;
        let snapshot = config.snapshot()?;

        let maintenance = MaintenanceService::new(
            ExpiredTaskReaper::new(deps.store.clone(), deps.jobs.clone()),
            RetentionPruningDispatcher::new(deps.store.clone(), deps.jobs.clone()),
            config.maintenance.clone(),
        );

        let cache_refresh = CacheRefreshService::new(
            StatusAggregator::new(deps.store.clone()),
            AgentReconciler::new(deps.store, deps.remote, deps.alerts),
            snapshot,
            config.cache_refresh.clone(),
        );

        Ok(Self {
            maintenance,
            cache_refresh,
            maintenance_enabled: config.maintenance.enabled,
            cache_refresh_enabled: config.cache_refresh.enabled,
        })
    }

    /// Spawn every enabled service on the current runtime
    pub fn start(self) -> ReconcilerSystemHandle {
        let (shutdown_sender, shutdown_receiver) = watch::channel(false);
        let mut handles = Vec::new();

        if self.maintenance_enabled {
            let service = self.maintenance.clone();
            let shutdown = shutdown_receiver.clone();
            handles.push(tokio::spawn(async move { service.run(shutdown).await }));
        } else {
            info!("Maintenance service disabled");
        }

        if self.cache_refresh_enabled {
            let service = self.cache_refresh.clone();
            let shutdown = shutdown_receiver.clone();
            handles.push(tokio::spawn(async move { service.run(shutdown).await }));
        } else {
            info!("Cache refresh service disabled");
        }

        info!(services = handles.len(), "Reconciler started");

        ReconcilerSystemHandle {
            shutdown_sender: Some(shutdown_sender),
            handles,
        }
    }
}

pub struct ReconcilerSystemHandle {
    /// Some while running
    shutdown_sender: Option<watch::Sender<bool>>,
    handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for ReconcilerSystemHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcilerSystemHandle")
            .field("is_running", &self.is_running())
            .field("services", &self.handles.len())
            .finish()
    }
}

impl ReconcilerSystemHandle {
    pub fn is_running(&self) -> bool {
        self.shutdown_sender.is_some()
    }

    pub fn service_count(&self) -> usize {
        self.handles.len()
    }

    /// Signal shutdown and wait for in-flight cycles to finish
    pub async fn stop(&mut self) -> ReconcileResult<()> {
        let Some(sender) = self.shutdown_sender.take() else {
            warn!("Reconciler already stopped");
            return Ok(());
        };

        // receivers may already be gone if a service exited on its own
        let _ = sender.send(true);

        for handle in self.handles.drain(..) {
            handle.await.map_err(|e| {
                ReconcileError::InvalidState(format!("service task failed: {e}"))
            })?;
        }

        info!("Reconciler shutdown completed");
        Ok(())
    }
}
