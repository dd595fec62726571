use serde::{Deserialize, Serialize};

/// Outcome of a remote scheduler call, as fed into the sync state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SyncEvent {
    RemoteSucceeded,
    /// Remote call failed; the error text is opaque
    RemoteFailed(String),
}

impl SyncEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RemoteSucceeded => "remote_succeeded",
            Self::RemoteFailed(_) => "remote_failed",
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::RemoteFailed(msg) => Some(msg),
            Self::RemoteSucceeded => None,
        }
    }
}
