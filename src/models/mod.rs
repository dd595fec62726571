//! # Fleet Models
//!
//! Plain data types for the entities the reconciliation core reads and updates.
//! Persistence lives behind [`crate::store::FleetStore`]; these types carry no
//! database handles.

pub mod agent;
pub mod alert;
pub mod automated_task;
pub mod client;
pub mod core_settings;
pub mod patch_update;
pub mod pending_action;

pub use agent::{
    parse_agent_version, Agent, AgentCachedFields, AgentHealth, AgentStatus, ChecksSummary,
    TaskHealth,
};
pub use alert::Alert;
pub use automated_task::{AlertSeverity, AutomatedTask, TaskStatus, TaskType};
pub use client::{Client, FailingStatus, OwnerCachedFields, Site};
pub use core_settings::{CoreSettings, RetentionDomain};
pub use patch_update::{PatchAction, PatchUpdate};
pub use pending_action::{PendingAction, PendingActionStatus, PendingActionType};
