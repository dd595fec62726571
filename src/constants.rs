//! # System Constants
//!
//! Job names, version floors and service cadences that define the operational
//! boundaries of the reconciliation core.

/// Names of the asynchronous jobs submitted by the reconciliation core
pub mod jobs {
    // Retention pruning jobs, one per historical-data domain
    pub const PRUNE_CHECK_HISTORY: &str = "prune_check_history";
    pub const PRUNE_RESOLVED_ALERTS: &str = "prune_resolved_alerts";
    pub const PRUNE_AGENT_HISTORY: &str = "prune_agent_history";
    pub const PRUNE_DEBUG_LOG: &str = "prune_debug_log";
    pub const PRUNE_AUDIT_LOG: &str = "prune_audit_log";
    pub const CLEAR_FAULTS: &str = "clear_faults";

    // Scheduled task removal
    pub const DELETE_TASK_SCHEDULE: &str = "delete_task_schedule";
}

pub mod system {
    /// Agents reporting a version below this are excluded from remote reconciliation
    pub const MIN_SUPPORTED_AGENT_VERSION: &str = "1.6.0";

    /// Time zone used when neither the agent nor core settings carry one
    pub const FALLBACK_TIME_ZONE: &str = "UTC";

    /// Environment variable naming the deployment environment
    pub const ENVIRONMENT_VAR: &str = "RECONCILER_ENV";

    /// Environment variable prefix for configuration overrides
    pub const CONFIG_ENV_PREFIX: &str = "RECONCILER";
}

/// Default cadences for the background services
pub mod defaults {
    pub const MAINTENANCE_INTERVAL_SECONDS: u64 = 3600;
    pub const CACHE_REFRESH_INTERVAL_SECONDS: u64 = 60;
    pub const JOB_CHANNEL_CAPACITY: usize = 1024;
    pub const DATABASE_MAX_CONNECTIONS: u32 = 10;
    pub const DATABASE_ACQUIRE_TIMEOUT_SECONDS: u64 = 30;
}
