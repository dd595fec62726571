//! # Status Aggregation Engine
//!
//! Recomputes the cached `{error, warning}` summary and member-agent count for
//! every site and, through an independent full scan, for every client.
//!
//! ## Fold order
//!
//! Member agents are folded in id order. For each agent:
//!
//! 1. Maintenance mode: the agent contributes nothing.
//! 2. Overdue alerting enabled and status `overdue`: error, stop.
//! 3. Failing checks: the warning flag raises warning; the failing flag raises error and stops.
//! 4. Otherwise any task that is failing with error severity raises error and stops.
//!
//! Error always ends the scan for that owner, so agents after the first error
//! are never looked at. Warning raised before that point is kept.

use opentelemetry::KeyValue;
use serde::Serialize;
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::ReconcileResult;
use crate::metrics;
use crate::models::{
    AgentHealth, AgentStatus, AlertSeverity, FailingStatus, OwnerCachedFields, TaskStatus,
};
use crate::store::FleetStore;

/// Short-circuiting reducer over an owner's member agents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailingStatusFold {
    status: FailingStatus,
    visited: usize,
}

/// Result of folding one owner's member set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FoldOutcome {
    pub status: FailingStatus,
    /// Agents examined before the fold stopped
    pub visited: usize,
}

impl FailingStatusFold {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next agent; `Break` means the owner is in error and the scan ends
    pub fn observe(&mut self, agent: &AgentHealth) -> ControlFlow<()> {
        self.visited += 1;

        if agent.maintenance_mode {
            return ControlFlow::Continue(());
        }

        if agent.has_overdue_alerting() && agent.status == AgentStatus::Overdue {
            return self.raise_error();
        }

        if agent.checks.has_failing_checks {
            if agent.checks.warning {
                self.status.warning = true;
            }
            if agent.checks.failing {
                return self.raise_error();
            }
            return ControlFlow::Continue(());
        }

        let has_error_task = agent.tasks.iter().any(|task| {
            task.status == TaskStatus::Failing && task.alert_severity == AlertSeverity::Error
        });
        if has_error_task {
            return self.raise_error();
        }

        ControlFlow::Continue(())
    }

    fn raise_error(&mut self) -> ControlFlow<()> {
        self.status.error = true;
        ControlFlow::Break(())
    }

    pub fn finish(self) -> FoldOutcome {
        FoldOutcome {
            status: self.status,
            visited: self.visited,
        }
    }
}

/// Fold an ordered member sequence into its failing status
pub fn fold_failing_status<'a, I>(agents: I) -> FoldOutcome
where
    I: IntoIterator<Item = &'a AgentHealth>,
{
    let mut fold = FailingStatusFold::new();
    for agent in agents {
        if fold.observe(agent).is_break() {
            break;
        }
    }
    fold.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OwnerAggregate {
    pub owner_id: i64,
    pub fields: OwnerCachedFields,
    pub visited: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationReport {
    pub sites: Vec<OwnerAggregate>,
    pub clients: Vec<OwnerAggregate>,
}

impl AggregationReport {
    pub fn site(&self, site_id: i64) -> Option<&OwnerAggregate> {
        self.sites.iter().find(|a| a.owner_id == site_id)
    }

    pub fn client(&self, client_id: i64) -> Option<&OwnerAggregate> {
        self.clients.iter().find(|a| a.owner_id == client_id)
    }
}

fn aggregate(owner_id: i64, members: &[AgentHealth]) -> OwnerAggregate {
    let outcome = fold_failing_status(members);
    OwnerAggregate {
        owner_id,
        fields: OwnerCachedFields {
            failing_checks: outcome.status,
            agent_count: members.len() as i64,
        },
        visited: outcome.visited,
    }
}

fn record_owner(kind: &'static str, aggregate: &OwnerAggregate) {
    debug!(
        owner = kind,
        owner_id = aggregate.owner_id,
        error = aggregate.fields.failing_checks.error,
        warning = aggregate.fields.failing_checks.warning,
        agent_count = aggregate.fields.agent_count,
        visited = aggregate.visited,
        "Owner status recomputed"
    );
}

#[derive(Clone)]
pub struct StatusAggregator {
    store: Arc<dyn FleetStore>,
}

impl std::fmt::Debug for StatusAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusAggregator").finish_non_exhaustive()
    }
}

impl StatusAggregator {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self { store }
    }

    /// Recompute and persist every site's cached fields
    pub async fn refresh_sites(&self) -> ReconcileResult<Vec<OwnerAggregate>> {
        let sites = self.store.list_sites().await?;
        let mut aggregates = Vec::with_capacity(sites.len());

        for site in sites {
            let members = self.store.site_agent_health(site.id).await?;
            let aggregate = aggregate(site.id, &members);
            self.store
                .update_site_cached_fields(site.id, aggregate.fields)
                .await?;
            record_owner("site", &aggregate);
            aggregates.push(aggregate);
        }

        Ok(aggregates)
    }

    /// Recompute and persist every client's cached fields from its agents directly
    pub async fn refresh_clients(&self) -> ReconcileResult<Vec<OwnerAggregate>> {
        let clients = self.store.list_clients().await?;
        let mut aggregates = Vec::with_capacity(clients.len());

        for client in clients {
            let members = self.store.client_agent_health(client.id).await?;
            let aggregate = aggregate(client.id, &members);
            self.store
                .update_client_cached_fields(client.id, aggregate.fields)
                .await?;
            record_owner("client", &aggregate);
            aggregates.push(aggregate);
        }

        Ok(aggregates)
    }

    /// Sites first, then clients
    pub async fn run(&self) -> ReconcileResult<AggregationReport> {
        let report = AggregationReport {
            sites: self.refresh_sites().await?,
            clients: self.refresh_clients().await?,
        };

        let failing = |owners: &[OwnerAggregate]| {
            owners
                .iter()
                .filter(|a| a.fields.failing_checks.error)
                .count()
        };
        let sites_in_error = failing(&report.sites);
        let clients_in_error = failing(&report.clients);

        metrics::owner_status_refreshes_total().add(
            (report.sites.len() + report.clients.len()) as u64,
            &[KeyValue::new("component", "status_aggregation")],
        );

        info!(
            sites = report.sites.len(),
            clients = report.clients.len(),
            sites_in_error = sites_in_error,
            clients_in_error = clients_in_error,
            "Status aggregation completed"
        );

        Ok(report)
    }
}
