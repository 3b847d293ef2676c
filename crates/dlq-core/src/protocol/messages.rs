use serde::{Deserialize, Serialize};

use crate::error::JobError;
use crate::job::{Job, JobId, JobState, PurgeScope};

/// One frame on the wire. `id` is chosen by the client and echoed back in the
/// matching response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub id: u64,
    pub body: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Submit {
        url: String,
    },
    Status {
        job_id: JobId,
    },
    List,
    Cancel {
        job_id: JobId,
    },
    /// Admin only. Answered after in-flight jobs drain or are abandoned.
    Shutdown,
    /// Resubmit every failed job under a new id.
    Retry,
    Purge {
        #[serde(default)]
        scope: PurgeScope,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Submitted {
        job_id: JobId,
    },
    Rejected {
        reason: String,
    },
    Job {
        job: Job,
    },
    NotFound {
        job_id: JobId,
    },
    Jobs {
        jobs: Vec<Job>,
    },
    Ack,
    AlreadyTerminal {
        job_id: JobId,
        state: JobState,
    },
    /// `(old_id, new_id)` for every resubmitted job.
    Resubmitted {
        jobs: Vec<(JobId, JobId)>,
    },
    Purged {
        count: usize,
    },
    PermissionDenied {
        reason: String,
    },
    /// Malformed frame, internal fault or scheduler gone.
    Error {
        message: String,
    },
}

impl From<JobError> for Response {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Rejected { reason } => Response::Rejected { reason },
            JobError::NotFound(job_id) => Response::NotFound { job_id },
            JobError::AlreadyTerminal { id, state } => Response::AlreadyTerminal { job_id: id, state },
            e @ (JobError::InternalFault(_) | JobError::Unavailable) => Response::Error {
                message: e.to_string(),
            },
        }
    }
}
