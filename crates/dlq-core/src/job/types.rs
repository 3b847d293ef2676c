//! Job record types shared by the registry, scheduler and protocol.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Job identifier. Allocated from a counter that never rewinds.
pub type JobId = u64;

/// Lifecycle state of a job.
///
/// ```text
/// Queued -> Running -> Done
/// Queued -> Running -> Failed
/// Queued -> Cancelled
/// Running -> Cancelled   (backend call keeps running; its outcome is discarded)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Failed | JobState::Cancelled)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// What a terminal job produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobResult {
    /// Local file written by the backend.
    Artifact { path: PathBuf },
    /// Backend failure detail.
    Error { reason: String },
    Cancelled { reason: String },
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobResult::Artifact { path } => write!(f, "{}", path.display()),
            JobResult::Error { reason } => write!(f, "error: {}", reason),
            JobResult::Cancelled { reason } => write!(f, "cancelled: {}", reason),
        }
    }
}

/// Full job record. Snapshots handed out by the registry are clones of this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub url: String,
    pub state: JobState,
    /// Unix milliseconds.
    pub submitted_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    /// Unix milliseconds; set when the job reaches a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    /// Session that submitted the job, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Which terminal records `purge` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurgeScope {
    /// Done, failed and cancelled jobs.
    #[default]
    Terminal,
    /// Only failed jobs.
    Failed,
}

impl PurgeScope {
    pub fn matches(self, state: JobState) -> bool {
        match self {
            PurgeScope::Terminal => state.is_terminal(),
            PurgeScope::Failed => state == JobState::Failed,
        }
    }
}

/// Successful outcome of `cancel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelAck {
    /// The job moved to Cancelled from the given state.
    Cancelled { previous: JobState },
    /// The job was already cancelled; nothing changed.
    AlreadyCancelled,
}

/// Milliseconds since the Unix epoch; clamps pre-epoch times to 0.
pub fn unix_millis(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

pub fn now_millis() -> i64 {
    unix_millis(SystemTime::now())
}
