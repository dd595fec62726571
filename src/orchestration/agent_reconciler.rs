//! # Agent Reconciliation Loop
//!
//! Walks every agent once per cycle. Agents that are online and run a supported
//! version get three remote-facing steps:
//!
//! - finalizing agent update actions once the reported version is the latest
//! - pushing unsynced scheduled tasks through the sync state machine
//! - asking the alert subsystem to close an open alert
//!
//! Every agent, eligible or not, then has its cached pending-action count and
//! pending-patch flag recomputed.
//!
//! Remote and alert failures are recorded per item and never stop the loop.
//! Store failures abort the cycle.

use opentelemetry::KeyValue;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ReconcileSnapshot;
use crate::errors::ReconcileResult;
use crate::metrics;
use crate::models::{Agent, AgentCachedFields, AutomatedTask, PendingActionType};
use crate::remote::{AlertResolver, TaskRemote};
use crate::state_machine::{transition, RemoteOperation, SyncEvent, SyncStatus, SyncTarget};
use crate::store::FleetStore;

/// Whether an agent takes part in the remote-facing steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Eligibility {
    Eligible,
    UnsupportedVersion,
    /// Reported version could not be parsed; treated as unsupported
    UnparsableVersion,
    NotOnline,
}

impl Eligibility {
    pub fn of(agent: &Agent, snapshot: &ReconcileSnapshot) -> Self {
        match agent.parsed_version() {
            None => Self::UnparsableVersion,
            Some(version) if !snapshot.is_supported(&version) => Self::UnsupportedVersion,
            Some(_) if !agent.is_online() => Self::NotOnline,
            Some(_) => Self::Eligible,
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TaskSyncResult {
    Synced,
    Removed,
    /// Remote call failed; sync status left unchanged
    RemoteFailed(String),
    /// Remote call succeeded but the store write did not
    PersistFailed(String),
    /// No edge for this status in the transition table
    Rejected(String),
}

impl TaskSyncResult {
    fn label(&self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Removed => "removed",
            Self::RemoteFailed(_) => "remote_failed",
            Self::PersistFailed(_) => "persist_failed",
            Self::Rejected(_) => "rejected",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Synced | Self::Removed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSyncOutcome {
    pub task_id: i64,
    pub operation: RemoteOperation,
    pub from: SyncStatus,
    pub result: TaskSyncResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AlertOutcome {
    NoOpenAlert,
    /// The resolver ran; whether it closed the alert is its own decision
    Attempted,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentReconcileOutcome {
    pub agent_id: i64,
    pub eligibility: Eligibility,
    pub updates_finalized: u64,
    pub task_sync: Vec<TaskSyncOutcome>,
    /// `None` for agents that skipped the remote-facing steps
    pub alert: Option<AlertOutcome>,
    pub cached_fields: AgentCachedFields,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub agents: Vec<AgentReconcileOutcome>,
}

impl ReconciliationReport {
    pub fn agent(&self, agent_id: i64) -> Option<&AgentReconcileOutcome> {
        self.agents.iter().find(|a| a.agent_id == agent_id)
    }

    pub fn eligible_agents(&self) -> usize {
        self.agents
            .iter()
            .filter(|a| a.eligibility.is_eligible())
            .count()
    }

    pub fn task_outcomes(&self) -> impl Iterator<Item = &TaskSyncOutcome> {
        self.agents.iter().flat_map(|a| a.task_sync.iter())
    }

    pub fn tasks_succeeded(&self) -> usize {
        self.task_outcomes().filter(|t| t.result.is_success()).count()
    }

    pub fn tasks_failed(&self) -> usize {
        self.task_outcomes().filter(|t| !t.result.is_success()).count()
    }

    pub fn updates_finalized(&self) -> u64 {
        self.agents.iter().map(|a| a.updates_finalized).sum()
    }
}

#[derive(Clone)]
pub struct AgentReconciler {
    store: Arc<dyn FleetStore>,
    remote: Arc<dyn TaskRemote>,
    alerts: Arc<dyn AlertResolver>,
}

impl std::fmt::Debug for AgentReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentReconciler").finish_non_exhaustive()
    }
}

impl AgentReconciler {
    pub fn new(
        store: Arc<dyn FleetStore>,
        remote: Arc<dyn TaskRemote>,
        alerts: Arc<dyn AlertResolver>,
    ) -> Self {
        Self {
            store,
            remote,
            alerts,
        }
    }

    /// Reconcile every agent against the given deployment snapshot
    pub async fn reconcile_all(
        &self,
        snapshot: &ReconcileSnapshot,
    ) -> ReconcileResult<ReconciliationReport> {
        let agents = self.store.list_agents().await?;
        let mut report = ReconciliationReport::default();

        for agent in &agents {
            report.agents.push(self.reconcile_agent(agent, snapshot).await?);
        }

        info!(
            agents = report.agents.len(),
            eligible = report.eligible_agents(),
            updates_finalized = report.updates_finalized(),
            tasks_succeeded = report.tasks_succeeded(),
            tasks_failed = report.tasks_failed(),
            "Agent reconciliation completed"
        );

        Ok(report)
    }

    pub async fn reconcile_agent(
        &self,
        agent: &Agent,
        snapshot: &ReconcileSnapshot,
    ) -> ReconcileResult<AgentReconcileOutcome> {
        let eligibility = Eligibility::of(agent, snapshot);

        let mut outcome = AgentReconcileOutcome {
            agent_id: agent.id,
            eligibility,
            updates_finalized: 0,
            task_sync: Vec::new(),
            alert: None,
            cached_fields: AgentCachedFields::default(),
        };

        if eligibility.is_eligible() {
            outcome.updates_finalized = self.finalize_agent_update(agent, snapshot).await?;
            outcome.task_sync = self.sync_tasks(agent).await?;
            outcome.alert = Some(self.resolve_alert(agent).await?);
        } else {
            debug!(
                agent_id = agent.id,
                version = %agent.version,
                status = %agent.status,
                eligibility = ?eligibility,
                "Agent skipped for remote reconciliation"
            );
        }

        outcome.cached_fields = self.refresh_cached_fields(agent).await?;
        Ok(outcome)
    }

    /// Complete pending agent update actions once the agent reports the latest version
    async fn finalize_agent_update(
        &self,
        agent: &Agent,
        snapshot: &ReconcileSnapshot,
    ) -> ReconcileResult<u64> {
        let is_latest = agent
            .parsed_version()
            .is_some_and(|v| snapshot.is_latest(&v));
        if !is_latest {
            return Ok(0);
        }

        if !self
            .store
            .has_pending_actions(agent.id, PendingActionType::AgentUpdate)
            .await?
        {
            return Ok(0);
        }

        let completed = self
            .store
            .complete_pending_actions(agent.id, PendingActionType::AgentUpdate)
            .await?;

        metrics::agent_updates_finalized_total().add(completed, &[]);
        info!(
            agent_id = agent.id,
            version = %agent.version,
            completed = completed,
            "Agent update actions finalized"
        );

        Ok(completed)
    }

    async fn sync_tasks(&self, agent: &Agent) -> ReconcileResult<Vec<TaskSyncOutcome>> {
        let tasks = self.store.unsynced_tasks(agent.id).await?;
        let mut outcomes = Vec::with_capacity(tasks.len());

        for task in &tasks {
            let Some(operation) = task.sync_status.required_operation() else {
                continue;
            };
            let result = self.sync_task(task, operation).await;

            metrics::task_sync_outcomes_total().add(
                1,
                &[
                    KeyValue::new("operation", operation.as_str()),
                    KeyValue::new("result", result.label()),
                ],
            );

            outcomes.push(TaskSyncOutcome {
                task_id: task.id,
                operation,
                from: task.sync_status,
                result,
            });
        }

        Ok(outcomes)
    }

    async fn sync_task(&self, task: &AutomatedTask, operation: RemoteOperation) -> TaskSyncResult {
        let event = match self.remote.execute(operation, task).await {
            Ok(()) => SyncEvent::RemoteSucceeded,
            Err(e) => SyncEvent::RemoteFailed(e.to_string()),
        };

        let target = match transition(task.sync_status, &event) {
            Ok(target) => target,
            Err(e) => {
                warn!(task_id = task.id, error = %e, "Task sync transition rejected");
                return TaskSyncResult::Rejected(e.to_string());
            }
        };

        if let Some(reason) = event.error_message() {
            warn!(
                task_id = task.id,
                agent_id = task.agent_id,
                operation = %operation,
                error = %reason,
                "Remote task operation failed; will retry next cycle"
            );
            return TaskSyncResult::RemoteFailed(reason.to_string());
        }

        let persisted = match target {
            SyncTarget::Removed => self
                .store
                .delete_task(task.id)
                .await
                .map(|_| TaskSyncResult::Removed),
            SyncTarget::Status(status) => self
                .store
                .update_task_sync_status(task.id, status)
                .await
                .map(|_| TaskSyncResult::Synced),
        };

        persisted.unwrap_or_else(|e| {
            warn!(
                task_id = task.id,
                operation = %operation,
                error = %e,
                "Remote task operation succeeded but sync status was not saved"
            );
            TaskSyncResult::PersistFailed(e.to_string())
        })
    }

    async fn resolve_alert(&self, agent: &Agent) -> ReconcileResult<AlertOutcome> {
        if !self.store.has_unresolved_alert(agent.id).await? {
            return Ok(AlertOutcome::NoOpenAlert);
        }

        let outcome = match self.alerts.resolve_if_eligible(agent).await {
            Ok(()) => AlertOutcome::Attempted,
            Err(e) => {
                warn!(agent_id = agent.id, error = %e, "Alert resolution failed");
                AlertOutcome::Failed(e.to_string())
            }
        };

        let label = match outcome {
            AlertOutcome::Failed(_) => "failed",
            _ => "attempted",
        };
        metrics::alert_resolutions_total().add(1, &[KeyValue::new("result", label)]);

        Ok(outcome)
    }

    async fn refresh_cached_fields(&self, agent: &Agent) -> ReconcileResult<AgentCachedFields> {
        let fields = AgentCachedFields {
            pending_actions_count: self.store.count_pending_actions(agent.id).await?,
            has_patches_pending: self.store.has_patches_pending(agent.id).await?,
        };
        if fields != agent.cached_fields() {
            debug!(
                agent_id = agent.id,
                pending_actions_count = fields.pending_actions_count,
                has_patches_pending = fields.has_patches_pending,
                "Agent cached fields changed"
            );
        }
        self.store
            .update_agent_cached_fields(agent.id, fields)
            .await?;
        Ok(fields)
    }
}
