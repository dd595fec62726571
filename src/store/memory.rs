//! In-memory [`FleetStore`].
//!
//! Tables are `BTreeMap`s keyed by id behind a single `parking_lot::RwLock`,
//! so member iteration order is id order and every update is atomic per row.
//! Updating a row that no longer exists is a no-op, as an SQL `UPDATE`
//! matching zero rows would be.
//! Used for embedding, local runs and tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

use super::{ExpiryCandidate, FleetStore};
use crate::errors::ReconcileResult;
use crate::models::{
    Agent, AgentCachedFields, AgentHealth, Alert, AutomatedTask, Client, CoreSettings,
    OwnerCachedFields, PatchUpdate, PendingAction, PendingActionStatus, PendingActionType, Site,
};
use crate::state_machine::SyncStatus;

#[derive(Debug, Default)]
struct FleetTables {
    core_settings: Option<CoreSettings>,
    clients: BTreeMap<i64, Client>,
    sites: BTreeMap<i64, Site>,
    agents: BTreeMap<i64, Agent>,
    tasks: BTreeMap<i64, AutomatedTask>,
    pending_actions: BTreeMap<i64, PendingAction>,
    alerts: BTreeMap<i64, Alert>,
    patches: BTreeMap<i64, PatchUpdate>,
}

impl FleetTables {
    fn agent_health(&self, agent: &Agent) -> AgentHealth {
        let tasks = self
            .tasks
            .values()
            .filter(|t| t.agent_id == agent.id)
            .map(AutomatedTask::health)
            .collect();
        AgentHealth::from_agent(agent, tasks)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryFleetStore {
    tables: RwLock<FleetTables>,
}

impl InMemoryFleetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_core_settings(&self, settings: Option<CoreSettings>) {
        self.tables.write().core_settings = settings;
    }

    pub fn insert_client(&self, client: Client) {
        self.tables.write().clients.insert(client.id, client);
    }

    pub fn insert_site(&self, site: Site) {
        self.tables.write().sites.insert(site.id, site);
    }

    pub fn insert_agent(&self, agent: Agent) {
        self.tables.write().agents.insert(agent.id, agent);
    }

    /// Remove an agent together with everything it owns
    pub fn remove_agent(&self, agent_id: i64) -> Option<Agent> {
        let mut tables = self.tables.write();
        tables.tasks.retain(|_, t| t.agent_id != agent_id);
        tables.pending_actions.retain(|_, a| a.agent_id != agent_id);
        tables.alerts.retain(|_, a| a.agent_id != agent_id);
        tables.patches.retain(|_, p| p.agent_id != agent_id);
        tables.agents.remove(&agent_id)
    }

    pub fn insert_task(&self, task: AutomatedTask) {
        self.tables.write().tasks.insert(task.id, task);
    }

    pub fn insert_pending_action(&self, action: PendingAction) {
        self.tables.write().pending_actions.insert(action.id, action);
    }

    pub fn insert_alert(&self, alert: Alert) {
        self.tables.write().alerts.insert(alert.id, alert);
    }

    pub fn insert_patch(&self, patch: PatchUpdate) {
        self.tables.write().patches.insert(patch.id, patch);
    }

    pub fn agent(&self, agent_id: i64) -> Option<Agent> {
        self.tables.read().agents.get(&agent_id).cloned()
    }

    pub fn site(&self, site_id: i64) -> Option<Site> {
        self.tables.read().sites.get(&site_id).cloned()
    }

    pub fn client(&self, client_id: i64) -> Option<Client> {
        self.tables.read().clients.get(&client_id).cloned()
    }

    pub fn task(&self, task_id: i64) -> Option<AutomatedTask> {
        self.tables.read().tasks.get(&task_id).cloned()
    }

    pub fn pending_actions_for(&self, agent_id: i64) -> Vec<PendingAction> {
        self.tables
            .read()
            .pending_actions
            .values()
            .filter(|a| a.agent_id == agent_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FleetStore for InMemoryFleetStore {
    async fn core_settings(&self) -> ReconcileResult<Option<CoreSettings>> {
        Ok(self.tables.read().core_settings.clone())
    }

    async fn list_sites(&self) -> ReconcileResult<Vec<Site>> {
        Ok(self.tables.read().sites.values().cloned().collect())
    }

    async fn list_clients(&self) -> ReconcileResult<Vec<Client>> {
        Ok(self.tables.read().clients.values().cloned().collect())
    }

    async fn site_agent_health(&self, site_id: i64) -> ReconcileResult<Vec<AgentHealth>> {
        let tables = self.tables.read();
        Ok(tables
            .agents
            .values()
            .filter(|a| a.site_id == site_id)
            .map(|a| tables.agent_health(a))
            .collect())
    }

    async fn client_agent_health(&self, client_id: i64) -> ReconcileResult<Vec<AgentHealth>> {
        let tables = self.tables.read();
        Ok(tables
            .agents
            .values()
            .filter(|a| {
                tables
                    .sites
                    .get(&a.site_id)
                    .is_some_and(|s| s.client_id == client_id)
            })
            .map(|a| tables.agent_health(a))
            .collect())
    }

    async fn update_site_cached_fields(
        &self,
        site_id: i64,
        fields: OwnerCachedFields,
    ) -> ReconcileResult<()> {
        match self.tables.write().sites.get_mut(&site_id) {
            Some(site) => {
                site.failing_checks = fields.failing_checks;
                site.agent_count = fields.agent_count;
            }
            None => debug!(site_id = site_id, "Site gone before cached fields were saved"),
        }
        Ok(())
    }

    async fn update_client_cached_fields(
        &self,
        client_id: i64,
        fields: OwnerCachedFields,
    ) -> ReconcileResult<()> {
        match self.tables.write().clients.get_mut(&client_id) {
            Some(client) => {
                client.failing_checks = fields.failing_checks;
                client.agent_count = fields.agent_count;
            }
            None => debug!(client_id = client_id, "Client gone before cached fields were saved"),
        }
        Ok(())
    }

    async fn list_agents(&self) -> ReconcileResult<Vec<Agent>> {
        Ok(self.tables.read().agents.values().cloned().collect())
    }

    async fn has_pending_actions(
        &self,
        agent_id: i64,
        action_type: PendingActionType,
    ) -> ReconcileResult<bool> {
        Ok(self.tables.read().pending_actions.values().any(|a| {
            a.agent_id == agent_id && a.action_type == action_type && a.is_pending()
        }))
    }

    async fn complete_pending_actions(
        &self,
        agent_id: i64,
        action_type: PendingActionType,
    ) -> ReconcileResult<u64> {
        let mut tables = self.tables.write();
        let mut updated = 0;
        for action in tables.pending_actions.values_mut().filter(|a| {
            a.agent_id == agent_id && a.action_type == action_type && a.is_pending()
        }) {
            action.status = PendingActionStatus::Completed;
            updated += 1;
        }
        Ok(updated)
    }

    async fn count_pending_actions(&self, agent_id: i64) -> ReconcileResult<i64> {
        let count = self
            .tables
            .read()
            .pending_actions
            .values()
            .filter(|a| a.agent_id == agent_id && a.is_pending())
            .count();
        Ok(count as i64)
    }

    async fn has_patches_pending(&self, agent_id: i64) -> ReconcileResult<bool> {
        Ok(self
            .tables
            .read()
            .patches
            .values()
            .any(|p| p.agent_id == agent_id && p.is_pending_install()))
    }

    async fn update_agent_cached_fields(
        &self,
        agent_id: i64,
        fields: AgentCachedFields,
    ) -> ReconcileResult<()> {
        match self.tables.write().agents.get_mut(&agent_id) {
            Some(agent) => {
                agent.pending_actions_count = fields.pending_actions_count;
                agent.has_patches_pending = fields.has_patches_pending;
            }
            None => debug!(agent_id = agent_id, "Agent gone before cached fields were saved"),
        }
        Ok(())
    }

    async fn unsynced_tasks(&self, agent_id: i64) -> ReconcileResult<Vec<AutomatedTask>> {
        Ok(self
            .tables
            .read()
            .tasks
            .values()
            .filter(|t| t.agent_id == agent_id && t.needs_sync())
            .cloned()
            .collect())
    }

    async fn update_task_sync_status(
        &self,
        task_id: i64,
        status: SyncStatus,
    ) -> ReconcileResult<()> {
        match self.tables.write().tasks.get_mut(&task_id) {
            Some(task) => task.sync_status = status,
            None => debug!(task_id = task_id, "Task gone before sync status was saved"),
        }
        Ok(())
    }

    async fn delete_task(&self, task_id: i64) -> ReconcileResult<()> {
        self.tables.write().tasks.remove(&task_id);
        Ok(())
    }

    async fn expiry_candidates(&self) -> ReconcileResult<Vec<ExpiryCandidate>> {
        let tables = self.tables.read();
        Ok(tables
            .tasks
            .values()
            .filter(|t| t.is_expiry_candidate())
            .map(|t| ExpiryCandidate {
                task_id: t.id,
                agent_id: t.agent_id,
                run_time_date: t.run_time_date,
                agent_time_zone: tables
                    .agents
                    .get(&t.agent_id)
                    .and_then(|a| a.time_zone.clone()),
            })
            .collect())
    }

    async fn has_unresolved_alert(&self, agent_id: i64) -> ReconcileResult<bool> {
        Ok(self
            .tables
            .read()
            .alerts
            .values()
            .any(|a| a.agent_id == agent_id && !a.resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AgentStatus, AlertSeverity, ChecksSummary, FailingStatus, TaskStatus, TaskType,
    };

    fn agent(id: i64, site_id: i64, time_zone: Option<&str>) -> Agent {
        Agent {
            id,
            site_id,
            hostname: format!("host-{id}"),
            version: "2.4.0".to_string(),
            status: AgentStatus::Online,
            maintenance_mode: false,
            time_zone: time_zone.map(str::to_string),
            checks: ChecksSummary::default(),
            overdue_email_alert: false,
            overdue_text_alert: false,
            pending_actions_count: 0,
            has_patches_pending: false,
        }
    }

    fn task(id: i64, agent_id: i64, sync_status: SyncStatus) -> AutomatedTask {
        AutomatedTask {
            id,
            agent_id,
            name: format!("task-{id}"),
            task_type: TaskType::RunOnce,
            remove_if_not_scheduled: true,
            last_run: None,
            run_time_date: None,
            sync_status,
            status: TaskStatus::Passing,
            alert_severity: AlertSeverity::Info,
        }
    }

    fn seeded() -> InMemoryFleetStore {
        let store = InMemoryFleetStore::new();
        store.insert_client(Client {
            id: 1,
            name: "acme".to_string(),
            failing_checks: FailingStatus::default(),
            agent_count: 0,
        });
        for (id, client_id) in [(10, 1), (11, 1)] {
            store.insert_site(Site {
                id,
                client_id,
                name: format!("site-{id}"),
                failing_checks: FailingStatus::default(),
                agent_count: 0,
            });
        }
        store
    }

    #[tokio::test]
    async fn test_client_members_span_sites_in_id_order() {
        let store = seeded();
        store.insert_agent(agent(3, 11, None));
        store.insert_agent(agent(1, 10, None));
        store.insert_agent(agent(2, 11, None));

        let site: Vec<_> = store
            .site_agent_health(11)
            .await
            .unwrap()
            .iter()
            .map(|h| h.agent_id)
            .collect();
        assert_eq!(site, vec![2, 3]);

        let client: Vec<_> = store
            .client_agent_health(1)
            .await
            .unwrap()
            .iter()
            .map(|h| h.agent_id)
            .collect();
        assert_eq!(client, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_complete_pending_actions_counts_matching_rows() {
        let store = seeded();
        store.insert_agent(agent(1, 10, None));
        for (id, action_type) in [
            (1, PendingActionType::AgentUpdate),
            (2, PendingActionType::AgentUpdate),
            (3, PendingActionType::RunCmd),
        ] {
            store.insert_pending_action(PendingAction {
                id,
                agent_id: 1,
                action_type,
                status: PendingActionStatus::Pending,
            });
        }

        assert!(store
            .has_pending_actions(1, PendingActionType::AgentUpdate)
            .await
            .unwrap());
        let updated = store
            .complete_pending_actions(1, PendingActionType::AgentUpdate)
            .await
            .unwrap();
        assert_eq!(updated, 2);
        assert!(!store
            .has_pending_actions(1, PendingActionType::AgentUpdate)
            .await
            .unwrap());
        assert_eq!(store.count_pending_actions(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unsynced_tasks_and_expiry_candidates() {
        let store = seeded();
        store.insert_agent(agent(1, 10, Some("Europe/Berlin")));
        store.insert_task(task(1, 1, SyncStatus::Synced));
        store.insert_task(task(2, 1, SyncStatus::NotSynced));
        let mut ran = task(3, 1, SyncStatus::Synced);
        ran.last_run = Some(chrono::Utc::now());
        store.insert_task(ran);

        let unsynced: Vec<_> = store
            .unsynced_tasks(1)
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(unsynced, vec![2]);

        let candidates = store.expiry_candidates().await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].task_id, 3);
        assert_eq!(candidates[0].agent_time_zone.as_deref(), Some("Europe/Berlin"));
    }

    #[tokio::test]
    async fn test_updates_on_missing_rows_are_noops() {
        let store = seeded();

        store
            .update_task_sync_status(99, SyncStatus::Synced)
            .await
            .unwrap();
        store
            .update_agent_cached_fields(99, AgentCachedFields::default())
            .await
            .unwrap();
        store
            .update_site_cached_fields(99, OwnerCachedFields::default())
            .await
            .unwrap();
        store
            .update_client_cached_fields(99, OwnerCachedFields::default())
            .await
            .unwrap();

        assert!(store.task(99).is_none());
        assert!(store.agent(99).is_none());
        assert!(store.site(99).is_none());
        assert!(store.client(99).is_none());
    }

    #[test]
    fn test_remove_agent_drops_owned_rows() {
        let store = seeded();
        store.insert_agent(agent(1, 10, None));
        store.insert_task(task(1, 1, SyncStatus::Initial));
        store.insert_pending_action(PendingAction {
            id: 1,
            agent_id: 1,
            action_type: PendingActionType::RunCmd,
            status: PendingActionStatus::Pending,
        });

        assert!(store.remove_agent(1).is_some());
        assert!(store.task(1).is_none());
        assert!(store.pending_actions_for(1).is_empty());
    }
}
