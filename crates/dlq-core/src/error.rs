//! Errors surfaced by registry and scheduler operations.

use std::result;
use thiserror::Error;

use crate::job::{JobId, JobState};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Submission refused (registry full, malformed URL, server shutting down).
    #[error("rejected: {reason}")]
    Rejected { reason: String },
    #[error("no such job: {0}")]
    NotFound(JobId),
    /// Cancellation requested on a job that already finished.
    #[error("job {id} is already {state}")]
    AlreadyTerminal { id: JobId, state: JobState },
    /// A state-transition precondition failed. Logged where detected.
    #[error("internal fault: {0}")]
    InternalFault(String),
    /// The scheduler task has exited.
    #[error("scheduler is not running")]
    Unavailable,
}

impl JobError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        JobError::Rejected {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = result::Result<T, JobError>;
