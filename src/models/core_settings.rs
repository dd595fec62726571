//! # Core Settings Model
//!
//! The singleton, operator-maintained settings record. The reconciliation core
//! reads the retention thresholds and the fleet default time zone from it; it
//! never writes it.

use serde::{Deserialize, Serialize};

use crate::constants::{jobs, system};

/// Historical-data domains subject to retention pruning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionDomain {
    CheckHistory,
    ResolvedAlerts,
    AgentHistory,
    DebugLog,
    AuditLog,
    FaultClearing,
}

impl RetentionDomain {
    pub const ALL: [RetentionDomain; 6] = [
        Self::CheckHistory,
        Self::ResolvedAlerts,
        Self::AgentHistory,
        Self::DebugLog,
        Self::AuditLog,
        Self::FaultClearing,
    ];

    /// Name of the pruning job owning this domain
    pub fn job_name(&self) -> &'static str {
        match self {
            Self::CheckHistory => jobs::PRUNE_CHECK_HISTORY,
            Self::ResolvedAlerts => jobs::PRUNE_RESOLVED_ALERTS,
            Self::AgentHistory => jobs::PRUNE_AGENT_HISTORY,
            Self::DebugLog => jobs::PRUNE_DEBUG_LOG,
            Self::AuditLog => jobs::PRUNE_AUDIT_LOG,
            Self::FaultClearing => jobs::CLEAR_FAULTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreSettings {
    pub check_history_prune_days: i32,
    pub resolved_alerts_prune_days: i32,
    pub agent_history_prune_days: i32,
    pub debug_log_prune_days: i32,
    pub audit_log_prune_days: i32,
    pub clear_faults_days: i32,
    pub default_time_zone: String,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            check_history_prune_days: 0,
            resolved_alerts_prune_days: 0,
            agent_history_prune_days: 0,
            debug_log_prune_days: 0,
            audit_log_prune_days: 0,
            clear_faults_days: 0,
            default_time_zone: system::FALLBACK_TIME_ZONE.to_string(),
        }
    }
}

impl CoreSettings {
    /// Retention threshold in days for a domain; zero or below disables pruning
    pub fn retention_days(&self, domain: RetentionDomain) -> i32 {
        match domain {
            RetentionDomain::CheckHistory => self.check_history_prune_days,
            RetentionDomain::ResolvedAlerts => self.resolved_alerts_prune_days,
            RetentionDomain::AgentHistory => self.agent_history_prune_days,
            RetentionDomain::DebugLog => self.debug_log_prune_days,
            RetentionDomain::AuditLog => self.audit_log_prune_days,
            RetentionDomain::FaultClearing => self.clear_faults_days,
        }
    }
}
