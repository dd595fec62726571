//! # Automated Task Model
//!
//! A scheduled task defined locally for one agent. Its `sync_status` tracks
//! whether the definition matches the agent's own scheduler and only moves
//! through [`crate::state_machine::transition`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agent::TaskHealth;
use crate::state_machine::SyncStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Daily,
    Weekly,
    Monthly,
    MonthlyDow,
    RunOnce,
    CheckFailure,
    Manual,
    OnBoot,
}

crate::wire_string_enum!(TaskType, "task type" {
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
    MonthlyDow => "monthlydow",
    RunOnce => "runonce",
    CheckFailure => "checkfailure",
    Manual => "manual",
    OnBoot => "onboot",
});

/// Outcome of the task's most recent run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Passing,
    Failing,
    Pending,
}

crate::wire_string_enum!(TaskStatus, "task status" {
    Passing => "passing",
    Failing => "failing",
    Pending => "pending",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
}

crate::wire_string_enum!(AlertSeverity, "alert severity" {
    Info => "info",
    Warning => "warning",
    Error => "error",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomatedTask {
    pub id: i64,
    pub agent_id: i64,
    pub name: String,
    pub task_type: TaskType,
    /// Run-once tasks with this flag are removed once their fire time has passed
    pub remove_if_not_scheduled: bool,
    pub last_run: Option<DateTime<Utc>>,
    /// Wall-clock fire time in the owning agent's time zone
    pub run_time_date: Option<NaiveDateTime>,
    pub sync_status: SyncStatus,
    pub status: TaskStatus,
    pub alert_severity: AlertSeverity,
}

impl AutomatedTask {
    /// Run-once, self-removing, and already fired at least once
    pub fn is_expiry_candidate(&self) -> bool {
        self.task_type == TaskType::RunOnce
            && self.remove_if_not_scheduled
            && self.last_run.is_some()
    }

    pub fn needs_sync(&self) -> bool {
        !self.sync_status.is_settled()
    }

    pub fn health(&self) -> TaskHealth {
        TaskHealth {
            status: self.status,
            alert_severity: self.alert_severity,
        }
    }
}
