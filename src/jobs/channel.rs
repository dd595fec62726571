//! Channel-backed [`JobDispatcher`].
//!
//! Submissions go onto a bounded `mpsc` channel with `try_send`, so the
//! submitting cycle never waits on the consumer. The host drains the paired
//! [`JobReceiver`] and forwards requests to its job system.

use tokio::sync::mpsc;
use tracing::debug;

use super::{JobDispatcher, JobRequest};
use crate::config::JobQueueConfig;
use crate::errors::{ReconcileError, ReconcileResult};

/// Sending half, shared by the services that submit jobs
#[derive(Debug, Clone)]
pub struct ChannelJobDispatcher(mpsc::Sender<JobRequest>);

/// Receiving half, owned by whatever forwards jobs to the job system
#[derive(Debug)]
pub struct JobReceiver(mpsc::Receiver<JobRequest>);

impl ChannelJobDispatcher {
    pub fn channel(capacity: usize) -> (Self, JobReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self(tx), JobReceiver(rx))
    }

    /// Channel sized by `jobs.channel_capacity`
    pub fn from_config(config: &JobQueueConfig) -> (Self, JobReceiver) {
        Self::channel(config.channel_capacity)
    }
}

impl JobDispatcher for ChannelJobDispatcher {
    fn submit(&self, request: JobRequest) -> ReconcileResult<()> {
        let job = request.job.clone();
        self.0.try_send(request).map_err(|e| {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "job channel full",
                mpsc::error::TrySendError::Closed(_) => "job channel closed",
            };
            ReconcileError::JobDispatch {
                job: job.clone(),
                reason: reason.to_string(),
            }
        })?;
        debug!(job = %job, "Job submitted");
        Ok(())
    }
}

impl JobReceiver {
    /// Receive the next submitted job; `None` once every dispatcher is dropped
    pub async fn recv(&mut self) -> Option<JobRequest> {
        self.0.recv().await
    }

    pub fn try_recv(&mut self) -> Option<JobRequest> {
        self.0.try_recv().ok()
    }
}
