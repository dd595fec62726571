//! Scripted stand-ins for the job system, the agent scheduler and alerting

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

use fleet_reconciler::errors::{ReconcileError, ReconcileResult};
use fleet_reconciler::jobs::{JobDispatcher, JobRequest};
use fleet_reconciler::models::{Agent, AutomatedTask};
use fleet_reconciler::remote::{AlertResolver, RemoteError, TaskRemote};
use fleet_reconciler::state_machine::RemoteOperation;
use fleet_reconciler::store::InMemoryFleetStore;

/// Records every accepted submission; rejects the job names it is told to
#[derive(Debug, Default)]
pub struct RecordingJobDispatcher {
    submitted: Mutex<Vec<JobRequest>>,
    rejected_jobs: HashSet<String>,
}

impl RecordingJobDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(jobs: &[&str]) -> Self {
        Self {
            submitted: Mutex::new(Vec::new()),
            rejected_jobs: jobs.iter().map(|j| j.to_string()).collect(),
        }
    }

    pub fn submitted(&self) -> Vec<JobRequest> {
        self.submitted.lock().clone()
    }

    pub fn job_names(&self) -> Vec<String> {
        self.submitted.lock().iter().map(|r| r.job.clone()).collect()
    }
}

impl JobDispatcher for RecordingJobDispatcher {
    fn submit(&self, request: JobRequest) -> ReconcileResult<()> {
        if self.rejected_jobs.contains(&request.job) {
            return Err(ReconcileError::JobDispatch {
                job: request.job,
                reason: "rejected by test".to_string(),
            });
        }
        self.submitted.lock().push(request);
        Ok(())
    }
}

/// Agent scheduler whose calls fail for the configured task ids
#[derive(Debug, Default)]
pub struct ScriptedTaskRemote {
    failing_tasks: HashSet<i64>,
    calls: Mutex<Vec<(RemoteOperation, i64)>>,
}

impl ScriptedTaskRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(task_ids: &[i64]) -> Self {
        Self {
            failing_tasks: task_ids.iter().copied().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(RemoteOperation, i64)> {
        self.calls.lock().clone()
    }

    fn record(&self, operation: RemoteOperation, task: &AutomatedTask) -> Result<(), RemoteError> {
        self.calls.lock().push((operation, task.id));
        if self.failing_tasks.contains(&task.id) {
            Err(RemoteError::new(format!("agent unreachable for task {}", task.id)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TaskRemote for ScriptedTaskRemote {
    async fn create_task(&self, task: &AutomatedTask) -> Result<(), RemoteError> {
        self.record(RemoteOperation::Create, task)
    }

    async fn modify_task(&self, task: &AutomatedTask) -> Result<(), RemoteError> {
        self.record(RemoteOperation::Modify, task)
    }

    async fn delete_task(&self, task: &AutomatedTask) -> Result<(), RemoteError> {
        self.record(RemoteOperation::Delete, task)
    }
}

/// Alert resolver that fails for the configured agent ids
#[derive(Debug, Default)]
pub struct ScriptedAlertResolver {
    failing_agents: HashSet<i64>,
    calls: Mutex<Vec<i64>>,
}

impl ScriptedAlertResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(agent_ids: &[i64]) -> Self {
        Self {
            failing_agents: agent_ids.iter().copied().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AlertResolver for ScriptedAlertResolver {
    async fn resolve_if_eligible(&self, agent: &Agent) -> Result<(), RemoteError> {
        self.calls.lock().push(agent.id);
        if self.failing_agents.contains(&agent.id) {
            Err(RemoteError::new("alert backend down"))
        } else {
            Ok(())
        }
    }
}

/// Alert resolver that deletes the agent from the store while the cycle is running,
/// as a concurrent decommission would
#[derive(Debug)]
pub struct DecommissioningAlertResolver {
    store: Arc<InMemoryFleetStore>,
    agent_ids: HashSet<i64>,
}

impl DecommissioningAlertResolver {
    pub fn new(store: Arc<InMemoryFleetStore>, agent_ids: &[i64]) -> Self {
        Self {
            store,
            agent_ids: agent_ids.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl AlertResolver for DecommissioningAlertResolver {
    async fn resolve_if_eligible(&self, agent: &Agent) -> Result<(), RemoteError> {
        if self.agent_ids.contains(&agent.id) {
            self.store.remove_agent(agent.id);
        }
        Ok(())
    }
}
