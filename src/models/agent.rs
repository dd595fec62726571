//! # Agent Model
//!
//! A managed endpoint. Agents belong to exactly one site and carry the health
//! signals folded by status aggregation, plus two cached scalars refreshed by
//! the reconciliation loop every cycle.

use serde::{Deserialize, Serialize};

use super::automated_task::{AlertSeverity, TaskStatus};

/// Connectivity status as last computed by the health monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Online,
    Offline,
    Overdue,
}

crate::wire_string_enum!(AgentStatus, "agent status" {
    Online => "online",
    Offline => "offline",
    Overdue => "overdue",
});

/// Derived summary of an agent's checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksSummary {
    pub has_failing_checks: bool,
    pub warning: bool,
    pub failing: bool,
}

/// Cached scalars recomputed for every agent on every cache refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCachedFields {
    pub pending_actions_count: i64,
    pub has_patches_pending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub site_id: i64,
    pub hostname: String,
    pub version: String,
    pub status: AgentStatus,
    pub maintenance_mode: bool,
    /// IANA zone name; `None` defers to the core settings default
    pub time_zone: Option<String>,
    pub checks: ChecksSummary,
    pub overdue_email_alert: bool,
    pub overdue_text_alert: bool,
    pub pending_actions_count: i64,
    pub has_patches_pending: bool,
}

impl Agent {
    pub fn is_online(&self) -> bool {
        self.status == AgentStatus::Online
    }

    /// Parsed agent version, `None` when the reported string is not a version
    pub fn parsed_version(&self) -> Option<semver::Version> {
        parse_agent_version(&self.version)
    }

    /// The agent's own time zone, falling back to the fleet default
    pub fn effective_time_zone<'a>(&'a self, default_time_zone: &'a str) -> &'a str {
        match self.time_zone.as_deref() {
            Some(tz) if !tz.trim().is_empty() => tz,
            _ => default_time_zone,
        }
    }

    pub fn cached_fields(&self) -> AgentCachedFields {
        AgentCachedFields {
            pending_actions_count: self.pending_actions_count,
            has_patches_pending: self.has_patches_pending,
        }
    }
}

/// Health inputs of a single task, as consumed by status aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHealth {
    pub status: TaskStatus,
    pub alert_severity: AlertSeverity,
}

/// Everything status aggregation needs to know about one member agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentHealth {
    pub agent_id: i64,
    pub status: AgentStatus,
    pub maintenance_mode: bool,
    pub overdue_email_alert: bool,
    pub overdue_text_alert: bool,
    pub checks: ChecksSummary,
    pub tasks: Vec<TaskHealth>,
}

impl AgentHealth {
    pub fn from_agent(agent: &Agent, tasks: Vec<TaskHealth>) -> Self {
        Self {
            agent_id: agent.id,
            status: agent.status,
            maintenance_mode: agent.maintenance_mode,
            overdue_email_alert: agent.overdue_email_alert,
            overdue_text_alert: agent.overdue_text_alert,
            checks: agent.checks,
            tasks,
        }
    }

    pub fn has_overdue_alerting(&self) -> bool {
        self.overdue_email_alert || self.overdue_text_alert
    }
}

/// Parse an agent-reported version string leniently
///
/// Accepts a leading `v` and pads missing minor/patch components, so `"2.0"`
/// compares equal to `"2.0.0"`.
pub fn parse_agent_version(raw: &str) -> Option<semver::Version> {
    let trimmed = raw.trim().trim_start_matches('v');
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(version) = semver::Version::parse(trimmed) {
        return Some(version);
    }

    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() > 3 {
        return None;
    }
    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(parts.iter()) {
        *slot = part.parse().ok()?;
    }
    Some(semver::Version::new(numbers[0], numbers[1], numbers[2]))
}
