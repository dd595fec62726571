//! # Patch Update Model

use serde::{Deserialize, Serialize};

/// Operator decision for a single OS patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchAction {
    Nothing,
    Approve,
    Ignore,
    Inherit,
}

crate::wire_string_enum!(PatchAction, "patch action" {
    Nothing => "nothing",
    Approve => "approve",
    Ignore => "ignore",
    Inherit => "inherit",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchUpdate {
    pub id: i64,
    pub agent_id: i64,
    pub kb: String,
    pub action: PatchAction,
    pub installed: bool,
}

impl PatchUpdate {
    /// Approved but not yet installed
    pub fn is_pending_install(&self) -> bool {
        self.action == PatchAction::Approve && !self.installed
    }
}
