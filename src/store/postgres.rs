//! PostgreSQL [`FleetStore`] backed by `sqlx`.
//!
//! Queries are checked at runtime rather than through `query!` so the crate
//! builds without a live database. Text-backed enums are parsed on read; a
//! value the model does not know surfaces as [`ReconcileError::InvalidState`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::info;

use super::{ExpiryCandidate, FleetStore};
use crate::config::DatabaseConfig;
use crate::errors::{ReconcileError, ReconcileResult};
use crate::models::{
    Agent, AgentCachedFields, AgentHealth, AutomatedTask, ChecksSummary, Client, CoreSettings,
    FailingStatus, OwnerCachedFields, PendingActionType, Site, TaskHealth,
};
use crate::state_machine::SyncStatus;

/// Embedded schema migrations under `./migrations`
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct PgFleetStore {
    pool: PgPool,
}

crate::debug_with_pgpool!(PgFleetStore { pool: PgPool });

fn parse_column<T>(column: &str, raw: &str) -> ReconcileResult<T>
where
    T: FromStr<Err = String>,
{
    raw.parse()
        .map_err(|e| ReconcileError::InvalidState(format!("{column}: {e}")))
}

#[derive(Debug, FromRow)]
struct CoreSettingsRow {
    check_history_prune_days: i32,
    resolved_alerts_prune_days: i32,
    agent_history_prune_days: i32,
    debug_log_prune_days: i32,
    audit_log_prune_days: i32,
    clear_faults_days: i32,
    default_time_zone: String,
}

impl From<CoreSettingsRow> for CoreSettings {
    fn from(row: CoreSettingsRow) -> Self {
        Self {
            check_history_prune_days: row.check_history_prune_days,
            resolved_alerts_prune_days: row.resolved_alerts_prune_days,
            agent_history_prune_days: row.agent_history_prune_days,
            debug_log_prune_days: row.debug_log_prune_days,
            audit_log_prune_days: row.audit_log_prune_days,
            clear_faults_days: row.clear_faults_days,
            default_time_zone: row.default_time_zone,
        }
    }
}

#[derive(Debug, FromRow)]
struct SiteRow {
    id: i64,
    client_id: i64,
    name: String,
    failing_checks: Json<FailingStatus>,
    agent_count: i64,
}

#[derive(Debug, FromRow)]
struct ClientRow {
    id: i64,
    name: String,
    failing_checks: Json<FailingStatus>,
    agent_count: i64,
}

#[derive(Debug, FromRow)]
struct AgentRow {
    id: i64,
    site_id: i64,
    hostname: String,
    version: String,
    status: String,
    maintenance_mode: bool,
    time_zone: Option<String>,
    checks: Json<ChecksSummary>,
    overdue_email_alert: bool,
    overdue_text_alert: bool,
    pending_actions_count: i64,
    has_patches_pending: bool,
}

impl TryFrom<AgentRow> for Agent {
    type Error = ReconcileError;

    fn try_from(row: AgentRow) -> ReconcileResult<Self> {
        Ok(Self {
            id: row.id,
            site_id: row.site_id,
            hostname: row.hostname,
            version: row.version,
            status: parse_column("agents.status", &row.status)?,
            maintenance_mode: row.maintenance_mode,
            time_zone: row.time_zone,
            checks: row.checks.0,
            overdue_email_alert: row.overdue_email_alert,
            overdue_text_alert: row.overdue_text_alert,
            pending_actions_count: row.pending_actions_count,
            has_patches_pending: row.has_patches_pending,
        })
    }
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: i64,
    agent_id: i64,
    name: String,
    task_type: String,
    remove_if_not_scheduled: bool,
    last_run: Option<DateTime<Utc>>,
    run_time_date: Option<NaiveDateTime>,
    sync_status: String,
    status: String,
    alert_severity: String,
}

impl TryFrom<TaskRow> for AutomatedTask {
    type Error = ReconcileError;

    fn try_from(row: TaskRow) -> ReconcileResult<Self> {
        Ok(Self {
            id: row.id,
            agent_id: row.agent_id,
            name: row.name,
            task_type: parse_column("autotasks.task_type", &row.task_type)?,
            remove_if_not_scheduled: row.remove_if_not_scheduled,
            last_run: row.last_run,
            run_time_date: row.run_time_date,
            sync_status: parse_column("autotasks.sync_status", &row.sync_status)?,
            status: parse_column("autotasks.status", &row.status)?,
            alert_severity: parse_column("autotasks.alert_severity", &row.alert_severity)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct TaskHealthRow {
    agent_id: i64,
    status: String,
    alert_severity: String,
}

#[derive(Debug, FromRow)]
struct ExpiryCandidateRow {
    task_id: i64,
    agent_id: i64,
    run_time_date: Option<NaiveDateTime>,
    agent_time_zone: Option<String>,
}

const AGENT_COLUMNS: &str = "a.id, a.site_id, a.hostname, a.version, a.status, a.maintenance_mode, \
     a.time_zone, a.checks, a.overdue_email_alert, a.overdue_text_alert, \
     a.pending_actions_count, a.has_patches_pending";

impl PgFleetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the configured URL (or `DATABASE_URL`)
    pub async fn connect(config: &DatabaseConfig) -> ReconcileResult<Self> {
        let url = config.database_url().ok_or_else(|| {
            ReconcileError::ConfigurationError(
                "database.url is not set and DATABASE_URL is not present".to_string(),
            )
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&url)
            .await?;

        info!(
            max_connections = config.max_connections,
            "Connected fleet store to PostgreSQL"
        );

        Ok(Self::new(pool))
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> ReconcileResult<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| ReconcileError::DatabaseError(format!("migration failed: {e}")))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Attach task health to agents, preserving agent order
    async fn with_task_health(&self, rows: Vec<AgentRow>) -> ReconcileResult<Vec<AgentHealth>> {
        let agent_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

        let task_rows = sqlx::query_as::<_, TaskHealthRow>(
            "SELECT agent_id, status, alert_severity FROM autotasks \
             WHERE agent_id = ANY($1) ORDER BY id",
        )
        .bind(&agent_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut tasks_by_agent: HashMap<i64, Vec<TaskHealth>> = HashMap::new();
        for row in task_rows {
            tasks_by_agent.entry(row.agent_id).or_default().push(TaskHealth {
                status: parse_column("autotasks.status", &row.status)?,
                alert_severity: parse_column("autotasks.alert_severity", &row.alert_severity)?,
            });
        }

        rows.into_iter()
            .map(|row| {
                let tasks = tasks_by_agent.remove(&row.id).unwrap_or_default();
                let agent = Agent::try_from(row)?;
                Ok(AgentHealth::from_agent(&agent, tasks))
            })
            .collect()
    }
}

#[async_trait]
impl FleetStore for PgFleetStore {
    async fn core_settings(&self) -> ReconcileResult<Option<CoreSettings>> {
        let row = sqlx::query_as::<_, CoreSettingsRow>(
            "SELECT check_history_prune_days, resolved_alerts_prune_days, \
             agent_history_prune_days, debug_log_prune_days, audit_log_prune_days, \
             clear_faults_days, default_time_zone \
             FROM core_settings ORDER BY id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CoreSettings::from))
    }

    async fn list_sites(&self) -> ReconcileResult<Vec<Site>> {
        let rows = sqlx::query_as::<_, SiteRow>(
            "SELECT id, client_id, name, failing_checks, agent_count FROM sites ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Site {
                id: r.id,
                client_id: r.client_id,
                name: r.name,
                failing_checks: r.failing_checks.0,
                agent_count: r.agent_count,
            })
            .collect())
    }

    async fn list_clients(&self) -> ReconcileResult<Vec<Client>> {
        let rows = sqlx::query_as::<_, ClientRow>(
            "SELECT id, name, failing_checks, agent_count FROM clients ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Client {
                id: r.id,
                name: r.name,
                failing_checks: r.failing_checks.0,
                agent_count: r.agent_count,
            })
            .collect())
    }

    async fn site_agent_health(&self, site_id: i64) -> ReconcileResult<Vec<AgentHealth>> {
        let sql =
            format!("SELECT {AGENT_COLUMNS} FROM agents a WHERE a.site_id = $1 ORDER BY a.id");
        let rows = sqlx::query_as::<_, AgentRow>(&sql)
            .bind(site_id)
            .fetch_all(&self.pool)
            .await?;

        self.with_task_health(rows).await
    }

    async fn client_agent_health(&self, client_id: i64) -> ReconcileResult<Vec<AgentHealth>> {
        let sql = format!(
            "SELECT {AGENT_COLUMNS} FROM agents a \
             JOIN sites s ON s.id = a.site_id \
             WHERE s.client_id = $1 ORDER BY a.id"
        );
        let rows = sqlx::query_as::<_, AgentRow>(&sql)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;

        self.with_task_health(rows).await
    }

    async fn update_site_cached_fields(
        &self,
        site_id: i64,
        fields: OwnerCachedFields,
    ) -> ReconcileResult<()> {
        sqlx::query("UPDATE sites SET failing_checks = $2, agent_count = $3 WHERE id = $1")
            .bind(site_id)
            .bind(Json(fields.failing_checks))
            .bind(fields.agent_count)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_client_cached_fields(
        &self,
        client_id: i64,
        fields: OwnerCachedFields,
    ) -> ReconcileResult<()> {
        sqlx::query("UPDATE clients SET failing_checks = $2, agent_count = $3 WHERE id = $1")
            .bind(client_id)
            .bind(Json(fields.failing_checks))
            .bind(fields.agent_count)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_agents(&self) -> ReconcileResult<Vec<Agent>> {
        let sql = format!("SELECT {AGENT_COLUMNS} FROM agents a ORDER BY a.id");
        let rows = sqlx::query_as::<_, AgentRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Agent::try_from).collect()
    }

    async fn has_pending_actions(
        &self,
        agent_id: i64,
        action_type: PendingActionType,
    ) -> ReconcileResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM pending_actions \
             WHERE agent_id = $1 AND action_type = $2 AND status = 'pending')",
        )
        .bind(agent_id)
        .bind(action_type.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn complete_pending_actions(
        &self,
        agent_id: i64,
        action_type: PendingActionType,
    ) -> ReconcileResult<u64> {
        let result = sqlx::query(
            "UPDATE pending_actions SET status = 'completed' \
             WHERE agent_id = $1 AND action_type = $2 AND status = 'pending'",
        )
        .bind(agent_id)
        .bind(action_type.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_pending_actions(&self, agent_id: i64) -> ReconcileResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM pending_actions WHERE agent_id = $1 AND status = 'pending'",
        )
        .bind(agent_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn has_patches_pending(&self, agent_id: i64) -> ReconcileResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM win_updates \
             WHERE agent_id = $1 AND action = 'approve' AND installed = FALSE)",
        )
        .bind(agent_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn update_agent_cached_fields(
        &self,
        agent_id: i64,
        fields: AgentCachedFields,
    ) -> ReconcileResult<()> {
        sqlx::query(
            "UPDATE agents SET pending_actions_count = $2, has_patches_pending = $3 WHERE id = $1",
        )
        .bind(agent_id)
        .bind(fields.pending_actions_count)
        .bind(fields.has_patches_pending)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unsynced_tasks(&self, agent_id: i64) -> ReconcileResult<Vec<AutomatedTask>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            "SELECT id, agent_id, name, task_type, remove_if_not_scheduled, last_run, \
             run_time_date, sync_status, status, alert_severity \
             FROM autotasks WHERE agent_id = $1 AND sync_status <> 'synced' ORDER BY id",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AutomatedTask::try_from).collect()
    }

    async fn update_task_sync_status(
        &self,
        task_id: i64,
        status: SyncStatus,
    ) -> ReconcileResult<()> {
        sqlx::query("UPDATE autotasks SET sync_status = $2 WHERE id = $1")
            .bind(task_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_task(&self, task_id: i64) -> ReconcileResult<()> {
        sqlx::query("DELETE FROM autotasks WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn expiry_candidates(&self) -> ReconcileResult<Vec<ExpiryCandidate>> {
        let rows = sqlx::query_as::<_, ExpiryCandidateRow>(
            "SELECT t.id AS task_id, t.agent_id, t.run_time_date, a.time_zone AS agent_time_zone \
             FROM autotasks t JOIN agents a ON a.id = t.agent_id \
             WHERE t.task_type = 'runonce' AND t.remove_if_not_scheduled \
             AND t.last_run IS NOT NULL ORDER BY t.id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ExpiryCandidate {
                task_id: r.task_id,
                agent_id: r.agent_id,
                run_time_date: r.run_time_date,
                agent_time_zone: r.agent_time_zone,
            })
            .collect())
    }

    async fn has_unresolved_alert(&self, agent_id: i64) -> ReconcileResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM alerts WHERE agent_id = $1 AND NOT resolved)",
        )
        .bind(agent_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
