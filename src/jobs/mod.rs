//! # Asynchronous Job Submission
//!
//! The reconciliation core hands heavy or destructive work (pruning history,
//! removing a task from an agent) to a background job system. Submission is
//! fire-and-forget: a job is a name plus positional arguments, no result is
//! awaited and retries are the job system's business.

pub mod channel;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::jobs;
use crate::errors::ReconcileResult;
use crate::models::RetentionDomain;

pub use channel::{ChannelJobDispatcher, JobReceiver};

/// A job submission: `(job_name, positional_args)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub job: String,
    pub args: Vec<Value>,
}

impl JobRequest {
    pub fn new(job: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            job: job.into(),
            args,
        }
    }

    /// Pruning job for a retention domain carrying its day threshold
    pub fn prune(domain: RetentionDomain, retention_days: i32) -> Self {
        Self::new(domain.job_name(), vec![Value::from(retention_days)])
    }

    /// Removal of a task definition from its agent's scheduler and from the store
    pub fn delete_task_schedule(task_id: i64) -> Self {
        Self::new(jobs::DELETE_TASK_SCHEDULE, vec![Value::from(task_id)])
    }
}

/// Fire-and-forget job submission seam
///
/// Implementations must not block waiting for the job to run. An `Err` means the
/// job was not accepted; callers record it and move on without retrying.
pub trait JobDispatcher: Send + Sync {
    fn submit(&self, request: JobRequest) -> ReconcileResult<()>;
}
