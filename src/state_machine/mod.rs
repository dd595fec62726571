// State machine module for scheduled task synchronization
//
// A task definition's sync_status only moves in response to the outcome of the
// remote scheduler call the reconciliation loop issues for it.

pub mod errors;
pub mod events;
pub mod states;
pub mod sync_state_machine;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::SyncEvent;
pub use states::{RemoteOperation, SyncStatus};
pub use sync_state_machine::{transition, SyncTarget};
