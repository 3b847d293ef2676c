//! Worker pool / scheduler.
//!
//! A single actor task owns the [`JobRegistry`](crate::job::JobRegistry) and
//! keeps up to `max_concurrency` backend calls in flight. Callers talk to it
//! through [`SchedulerHandle`], which can be cloned freely across sessions.
//! Dispatch is FIFO; completion order is whatever order the backend calls
//! finish in.

mod actor;
mod handle;
mod messages;

pub use handle::SchedulerHandle;

use crate::job::Job;

/// Reason recorded on queued jobs cancelled by shutdown.
pub const SHUTDOWN_REASON: &str = "server shutdown";
/// Reason recorded on running jobs still in flight when the grace period ends.
pub const ABANDONED_REASON: &str = "abandoned at shutdown";
/// Rejection reason for submissions received after shutdown began.
pub const SHUTTING_DOWN: &str = "server is shutting down";

/// Summary produced when the scheduler stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport {
    /// In-flight calls that finished within the grace period.
    pub drained: usize,
    /// In-flight calls still running when the grace period ended.
    pub abandoned: usize,
    /// Final snapshot of every record.
    pub jobs: Vec<Job>,
}
