//! Fleet fixture builders backed by the in-memory store

use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::Arc;

use fleet_reconciler::models::{
    Agent, AgentStatus, Alert, AlertSeverity, AutomatedTask, ChecksSummary, Client, CoreSettings,
    FailingStatus, PatchAction, PatchUpdate, PendingAction, PendingActionStatus,
    PendingActionType, Site, TaskStatus, TaskType,
};
use fleet_reconciler::state_machine::SyncStatus;
use fleet_reconciler::store::InMemoryFleetStore;

pub fn client(id: i64) -> Client {
    Client {
        id,
        name: format!("client-{id}"),
        failing_checks: FailingStatus::HEALTHY,
        agent_count: 0,
    }
}

pub fn site(id: i64, client_id: i64) -> Site {
    Site {
        id,
        client_id,
        name: format!("site-{id}"),
        failing_checks: FailingStatus::HEALTHY,
        agent_count: 0,
    }
}

/// Builder pattern for test agents; defaults to a healthy, online, current agent
pub struct AgentBuilder {
    agent: Agent,
}

impl AgentBuilder {
    pub fn new(id: i64, site_id: i64) -> Self {
        Self {
            agent: Agent {
                id,
                site_id,
                hostname: format!("agent-{id}"),
                version: "2.4.0".to_string(),
                status: AgentStatus::Online,
                maintenance_mode: false,
                time_zone: None,
                checks: ChecksSummary::default(),
                overdue_email_alert: false,
                overdue_text_alert: false,
                pending_actions_count: 0,
                has_patches_pending: false,
            },
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.agent.version = version.to_string();
        self
    }

    pub fn status(mut self, status: AgentStatus) -> Self {
        self.agent.status = status;
        self
    }

    pub fn maintenance(mut self) -> Self {
        self.agent.maintenance_mode = true;
        self
    }

    pub fn overdue_with_alerting(mut self) -> Self {
        self.agent.status = AgentStatus::Overdue;
        self.agent.overdue_email_alert = true;
        self
    }

    pub fn checks(mut self, has_failing_checks: bool, warning: bool, failing: bool) -> Self {
        self.agent.checks = ChecksSummary {
            has_failing_checks,
            warning,
            failing,
        };
        self
    }

    pub fn time_zone(mut self, tz: &str) -> Self {
        self.agent.time_zone = Some(tz.to_string());
        self
    }

    pub fn stale_cache(mut self, pending_actions_count: i64, has_patches_pending: bool) -> Self {
        self.agent.pending_actions_count = pending_actions_count;
        self.agent.has_patches_pending = has_patches_pending;
        self
    }

    pub fn build(self) -> Agent {
        self.agent
    }
}

/// Builder pattern for test task definitions; defaults to a synced daily task
pub struct TaskBuilder {
    task: AutomatedTask,
}

impl TaskBuilder {
    pub fn new(id: i64, agent_id: i64) -> Self {
        Self {
            task: AutomatedTask {
                id,
                agent_id,
                name: format!("task-{id}"),
                task_type: TaskType::Daily,
                remove_if_not_scheduled: false,
                last_run: None,
                run_time_date: None,
                sync_status: SyncStatus::Synced,
                status: TaskStatus::Passing,
                alert_severity: AlertSeverity::Info,
            },
        }
    }

    pub fn sync_status(mut self, status: SyncStatus) -> Self {
        self.task.sync_status = status;
        self
    }

    pub fn failing_with(mut self, severity: AlertSeverity) -> Self {
        self.task.status = TaskStatus::Failing;
        self.task.alert_severity = severity;
        self
    }

    /// Run-once, self-removing, firing at the given wall-clock time
    pub fn run_once_at(mut self, run_time_date: NaiveDateTime) -> Self {
        self.task.task_type = TaskType::RunOnce;
        self.task.remove_if_not_scheduled = true;
        self.task.run_time_date = Some(run_time_date);
        self
    }

    pub fn keep_if_not_scheduled(mut self) -> Self {
        self.task.remove_if_not_scheduled = false;
        self
    }

    pub fn last_run(mut self, at: DateTime<Utc>) -> Self {
        self.task.last_run = Some(at);
        self
    }

    pub fn build(self) -> AutomatedTask {
        self.task
    }
}

/// A store with one client owning one site and core settings present
pub fn single_site_store() -> Arc<InMemoryFleetStore> {
    let store = Arc::new(InMemoryFleetStore::new());
    store.set_core_settings(Some(CoreSettings::default()));
    store.insert_client(client(1));
    store.insert_site(site(10, 1));
    store
}

pub fn pending_action(
    id: i64,
    agent_id: i64,
    action_type: PendingActionType,
    status: PendingActionStatus,
) -> PendingAction {
    PendingAction {
        id,
        agent_id,
        action_type,
        status,
    }
}

pub fn open_alert(id: i64, agent_id: i64) -> Alert {
    Alert {
        id,
        agent_id,
        resolved: false,
        resolved_on: None,
    }
}

pub fn patch(id: i64, agent_id: i64, action: PatchAction, installed: bool) -> PatchUpdate {
    PatchUpdate {
        id,
        agent_id,
        kb: format!("KB{id}"),
        action,
        installed,
    }
}
