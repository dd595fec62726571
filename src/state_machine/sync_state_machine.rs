//! Transition table for [`SyncStatus`].
//!
//! Every reachable edge is listed in [`TRANSITIONS`]; anything absent from the
//! table is rejected. `Synced` has no outgoing edges because the reconciliation
//! loop never issues a remote call for a settled task.

use super::errors::{StateMachineError, StateMachineResult};
use super::events::SyncEvent;
use super::states::SyncStatus;

/// Where a transition lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
    Status(SyncStatus),
    /// The task definition is deleted from the store
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Succeeded,
    Failed,
}

impl From<&SyncEvent> for EventKind {
    fn from(event: &SyncEvent) -> Self {
        match event {
            SyncEvent::RemoteSucceeded => Self::Succeeded,
            SyncEvent::RemoteFailed(_) => Self::Failed,
        }
    }
}

const TRANSITIONS: &[(SyncStatus, EventKind, SyncTarget)] = &[
    (
        SyncStatus::Initial,
        EventKind::Succeeded,
        SyncTarget::Status(SyncStatus::Synced),
    ),
    (
        SyncStatus::Initial,
        EventKind::Failed,
        SyncTarget::Status(SyncStatus::Initial),
    ),
    (
        SyncStatus::NotSynced,
        EventKind::Succeeded,
        SyncTarget::Status(SyncStatus::Synced),
    ),
    (
        SyncStatus::NotSynced,
        EventKind::Failed,
        SyncTarget::Status(SyncStatus::NotSynced),
    ),
    (
        SyncStatus::PendingDeletion,
        EventKind::Succeeded,
        SyncTarget::Removed,
    ),
    (
        SyncStatus::PendingDeletion,
        EventKind::Failed,
        SyncTarget::Status(SyncStatus::PendingDeletion),
    ),
];

/// Resolve the target of applying `event` to a task in `from`
pub fn transition(from: SyncStatus, event: &SyncEvent) -> StateMachineResult<SyncTarget> {
    let kind = EventKind::from(event);
    TRANSITIONS
        .iter()
        .find(|(state, edge, _)| *state == from && *edge == kind)
        .map(|(_, _, target)| *target)
        .ok_or_else(|| StateMachineError::InvalidTransition {
            from: from.to_string(),
            event: event.event_type().to_string(),
        })
}
