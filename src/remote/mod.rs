//! # Remote Collaborators
//!
//! Seams to the two collaborators the reconciliation loop calls out to:
//! the agent's own task scheduler, reached over the remote-agent channel, and
//! the alert subsystem that decides whether an open alert can be closed.
//! Both are black boxes here; failures are opaque strings.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Agent, AutomatedTask};
use crate::state_machine::RemoteOperation;

/// Opaque failure reported by a remote call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RemoteError(pub String);

impl RemoteError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Scheduled task operations on an agent
#[async_trait]
pub trait TaskRemote: Send + Sync {
    async fn create_task(&self, task: &AutomatedTask) -> Result<(), RemoteError>;

    /// Idempotent create-or-update
    async fn modify_task(&self, task: &AutomatedTask) -> Result<(), RemoteError>;

    async fn delete_task(&self, task: &AutomatedTask) -> Result<(), RemoteError>;

    /// Issue the call matching `operation`
    async fn execute(
        &self,
        operation: RemoteOperation,
        task: &AutomatedTask,
    ) -> Result<(), RemoteError> {
        match operation {
            RemoteOperation::Create => self.create_task(task).await,
            RemoteOperation::Modify => self.modify_task(task).await,
            RemoteOperation::Delete => self.delete_task(task).await,
        }
    }
}

/// Alert resolution logic owned by the alerting subsystem
#[async_trait]
pub trait AlertResolver: Send + Sync {
    /// Close the agent's open alert if current health signals justify it
    async fn resolve_if_eligible(&self, agent: &Agent) -> Result<(), RemoteError>;
}
