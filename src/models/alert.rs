//! # Alert Model
//!
//! Alerts are opened by health monitoring elsewhere; the reconciliation loop
//! only asks the alert resolver to consider closing unresolved ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub agent_id: i64,
    pub resolved: bool,
    pub resolved_on: Option<DateTime<Utc>>,
}
