use serde::{Deserialize, Serialize};

/// Whether a locally-defined scheduled task matches its counterpart on the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Defined locally, never pushed; the agent may or may not already have it
    Initial,
    /// Known to be missing on the agent
    NotSynced,
    /// Deleted locally, still present on the agent
    PendingDeletion,
    /// Matches the agent
    Synced,
}

crate::wire_string_enum!(SyncStatus, "sync status" {
    Initial => "initial",
    NotSynced => "notsynced",
    PendingDeletion => "pendingdeletion",
    Synced => "synced",
});

impl SyncStatus {
    pub const ALL: [SyncStatus; 4] = [
        Self::Initial,
        Self::NotSynced,
        Self::PendingDeletion,
        Self::Synced,
    ];

    /// The remote call that moves this status toward `Synced`, if any
    pub fn required_operation(&self) -> Option<RemoteOperation> {
        match self {
            Self::Initial => Some(RemoteOperation::Modify),
            Self::NotSynced => Some(RemoteOperation::Create),
            Self::PendingDeletion => Some(RemoteOperation::Delete),
            Self::Synced => None,
        }
    }

    /// Check if no reconciliation work remains
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Synced)
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::Initial
    }
}

/// Remote scheduler operations available on an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteOperation {
    Create,
    /// Idempotent create-or-update
    Modify,
    Delete,
}

crate::wire_string_enum!(RemoteOperation, "remote operation" {
    Create => "create",
    Modify => "modify",
    Delete => "delete",
});
