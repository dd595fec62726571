//! # Fleet Store
//!
//! The persistence seam consumed by every reconciliation component. The access
//! pattern is deliberately narrow: bulk filtered reads, existence and count
//! queries, partial-field updates and filtered bulk status updates. Each
//! update touches only the named fields of one row and is atomic per row.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::ReconcileResult;
use crate::models::{
    Agent, AgentCachedFields, AgentHealth, AutomatedTask, Client, CoreSettings,
    OwnerCachedFields, PendingActionType, Site,
};
use crate::state_machine::SyncStatus;

pub use memory::InMemoryFleetStore;
pub use postgres::PgFleetStore;

/// A run-once task eligible for expiry checking, joined with its agent's zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryCandidate {
    pub task_id: i64,
    pub agent_id: i64,
    pub run_time_date: Option<NaiveDateTime>,
    /// The agent's own zone; `None` defers to the core settings default
    pub agent_time_zone: Option<String>,
}

#[async_trait]
pub trait FleetStore: Send + Sync {
    /// The singleton settings record, `None` if it was never created
    async fn core_settings(&self) -> ReconcileResult<Option<CoreSettings>>;

    async fn list_sites(&self) -> ReconcileResult<Vec<Site>>;

    async fn list_clients(&self) -> ReconcileResult<Vec<Client>>;

    /// Current member agents of a site, ordered by agent id
    async fn site_agent_health(&self, site_id: i64) -> ReconcileResult<Vec<AgentHealth>>;

    /// Current member agents across all of a client's sites, ordered by agent id
    async fn client_agent_health(&self, client_id: i64) -> ReconcileResult<Vec<AgentHealth>>;

    async fn update_site_cached_fields(
        &self,
        site_id: i64,
        fields: OwnerCachedFields,
    ) -> ReconcileResult<()>;

    async fn update_client_cached_fields(
        &self,
        client_id: i64,
        fields: OwnerCachedFields,
    ) -> ReconcileResult<()>;

    /// All agents, ordered by id
    async fn list_agents(&self) -> ReconcileResult<Vec<Agent>>;

    async fn has_pending_actions(
        &self,
        agent_id: i64,
        action_type: PendingActionType,
    ) -> ReconcileResult<bool>;

    /// Mark every pending action of the type completed; returns rows updated
    async fn complete_pending_actions(
        &self,
        agent_id: i64,
        action_type: PendingActionType,
    ) -> ReconcileResult<u64>;

    async fn count_pending_actions(&self, agent_id: i64) -> ReconcileResult<i64>;

    /// At least one approved, not-yet-installed patch
    async fn has_patches_pending(&self, agent_id: i64) -> ReconcileResult<bool>;

    async fn update_agent_cached_fields(
        &self,
        agent_id: i64,
        fields: AgentCachedFields,
    ) -> ReconcileResult<()>;

    /// Task definitions of an agent whose sync status is not `synced`, ordered by id
    async fn unsynced_tasks(&self, agent_id: i64) -> ReconcileResult<Vec<AutomatedTask>>;

    async fn update_task_sync_status(&self, task_id: i64, status: SyncStatus)
        -> ReconcileResult<()>;

    async fn delete_task(&self, task_id: i64) -> ReconcileResult<()>;

    /// Run-once, self-removing tasks that have run at least once
    async fn expiry_candidates(&self) -> ReconcileResult<Vec<ExpiryCandidate>>;

    async fn has_unresolved_alert(&self, agent_id: i64) -> ReconcileResult<bool>;
}
