//! # Client and Site Models
//!
//! The two-tier ownership hierarchy. Both levels cache a failing-status summary
//! and a member-agent count that are recomputed from scratch every cycle.

use serde::{Deserialize, Serialize};

/// The `{error, warning}` pair cached per site and per client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FailingStatus {
    pub error: bool,
    pub warning: bool,
}

impl FailingStatus {
    pub const HEALTHY: Self = Self {
        error: false,
        warning: false,
    };
}

/// Derived fields written back to a site or client after aggregation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerCachedFields {
    pub failing_checks: FailingStatus,
    pub agent_count: i64,
}

/// Organization owning one or more sites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub failing_checks: FailingStatus,
    pub agent_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub client_id: i64,
    pub name: String,
    pub failing_checks: FailingStatus,
    pub agent_count: i64,
}
