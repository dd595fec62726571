//! # Pending Action Model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingActionType {
    AgentUpdate,
    SchedReboot,
    ChocoInstall,
    RunCmd,
    RunScript,
    RunPatchScan,
    RunPatchInstall,
}

crate::wire_string_enum!(PendingActionType, "pending action type" {
    AgentUpdate => "agentupdate",
    SchedReboot => "schedreboot",
    ChocoInstall => "chocoinstall",
    RunCmd => "runcmd",
    RunScript => "runscript",
    RunPatchScan => "runpatchscan",
    RunPatchInstall => "runpatchinstall",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingActionStatus {
    Pending,
    Completed,
}

crate::wire_string_enum!(PendingActionStatus, "pending action status" {
    Pending => "pending",
    Completed => "completed",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: i64,
    pub agent_id: i64,
    pub action_type: PendingActionType,
    pub status: PendingActionStatus,
}

impl PendingAction {
    pub fn is_pending(&self) -> bool {
        self.status == PendingActionStatus::Pending
    }
}
