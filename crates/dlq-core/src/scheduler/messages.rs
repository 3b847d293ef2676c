use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::Result;
use crate::job::{CancelAck, Job, JobId, PurgeScope};

use super::DrainReport;

#[derive(Debug)]
pub enum SchedulerMessage {
    Submit {
        url: String,
        owner: Option<String>,
        response: oneshot::Sender<Result<JobId>>,
    },
    Status {
        job_id: JobId,
        response: oneshot::Sender<Result<Job>>,
    },
    List {
        response: oneshot::Sender<Vec<Job>>,
    },
    Cancel {
        job_id: JobId,
        response: oneshot::Sender<Result<CancelAck>>,
    },
    Purge {
        scope: PurgeScope,
        response: oneshot::Sender<usize>,
    },
    ResubmitFailed {
        owner: Option<String>,
        response: oneshot::Sender<Result<Vec<(JobId, JobId)>>>,
    },
    /// Reply is sent once every in-flight call has drained or been abandoned.
    Shutdown {
        grace: Option<Duration>,
        response: oneshot::Sender<DrainReport>,
    },
}
