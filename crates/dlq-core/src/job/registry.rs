//! Authoritative job store: records, FIFO queue and state transitions.
//!
//! `JobRegistry` is not synchronized. It is owned by the scheduler actor and
//! every mutation goes through that single task.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::time::SystemTime;

use crate::error::{JobError, Result};

use super::types::{
    now_millis, unix_millis, CancelAck, Job, JobId, JobResult, JobState, PurgeScope,
};

/// Reason recorded when a client cancels a job.
pub const CANCELLED_BY_CLIENT: &str = "cancelled by client";

pub struct JobRegistry {
    jobs: BTreeMap<JobId, Job>,
    queue: VecDeque<JobId>,
    next_id: JobId,
    capacity: usize,
}

impl JobRegistry {
    /// `capacity` caps the number of records held (any state).
    pub fn new(capacity: usize) -> Self {
        Self {
            jobs: BTreeMap::new(),
            queue: VecDeque::new(),
            next_id: 1,
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Inserts a Queued record and appends it to the queue.
    pub fn submit(&mut self, url: &str, owner: Option<String>) -> Result<JobId> {
        let url = validate_url(url)?;
        if self.jobs.len() >= self.capacity {
            return Err(JobError::rejected(format!(
                "registry full ({} jobs); purge finished jobs first",
                self.capacity
            )));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.jobs.insert(
            id,
            Job {
                id,
                url,
                state: JobState::Queued,
                submitted_at: now_millis(),
                started_at: None,
                completed_at: None,
                result: None,
                owner,
            },
        );
        self.queue.push_back(id);
        Ok(id)
    }

    pub fn get(&self, id: JobId) -> Result<&Job> {
        self.jobs.get(&id).ok_or(JobError::NotFound(id))
    }

    /// Snapshot of every record, in submission order.
    pub fn list_all(&self) -> Vec<Job> {
        self.jobs.values().cloned().collect()
    }

    pub fn cancel(&mut self, id: JobId) -> Result<CancelAck> {
        self.cancel_with_reason(id, CANCELLED_BY_CLIENT)
    }

    fn cancel_with_reason(&mut self, id: JobId, reason: &str) -> Result<CancelAck> {
        let job = self.jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
        match job.state {
            JobState::Cancelled => Ok(CancelAck::AlreadyCancelled),
            JobState::Done | JobState::Failed => Err(JobError::AlreadyTerminal {
                id,
                state: job.state,
            }),
            previous @ (JobState::Queued | JobState::Running) => {
                job.state = JobState::Cancelled;
                job.completed_at = Some(now_millis());
                job.result = Some(JobResult::Cancelled {
                    reason: reason.to_string(),
                });
                if previous == JobState::Queued {
                    self.queue.retain(|q| *q != id);
                }
                Ok(CancelAck::Cancelled { previous })
            }
        }
    }

    /// Pops the head of the queue. The queue only ever holds Queued jobs.
    pub fn pop_queued(&mut self) -> Option<(JobId, String)> {
        let id = self.queue.pop_front()?;
        match self.jobs.get(&id) {
            Some(job) if job.state == JobState::Queued => Some((id, job.url.clone())),
            other => {
                let state = other.map(|j| j.state.as_str()).unwrap_or("missing");
                tracing::error!(job_id = id, state, "queue held a job that is not queued");
                self.pop_queued()
            }
        }
    }

    pub fn mark_running(&mut self, id: JobId) -> Result<()> {
        let job = self.expect_state(id, JobState::Queued, "mark_running")?;
        job.state = JobState::Running;
        job.started_at = Some(now_millis());
        Ok(())
    }

    pub fn mark_done(&mut self, id: JobId, path: PathBuf, completed_at: SystemTime) -> Result<()> {
        let job = self.expect_state(id, JobState::Running, "mark_done")?;
        job.state = JobState::Done;
        job.completed_at = Some(unix_millis(completed_at));
        job.result = Some(JobResult::Artifact { path });
        Ok(())
    }

    pub fn mark_failed(&mut self, id: JobId, reason: String) -> Result<()> {
        let job = self.expect_state(id, JobState::Running, "mark_failed")?;
        job.state = JobState::Failed;
        job.completed_at = Some(now_millis());
        job.result = Some(JobResult::Error { reason });
        Ok(())
    }

    pub fn is_cancelled(&self, id: JobId) -> bool {
        self.jobs
            .get(&id)
            .map_or(false, |j| j.state == JobState::Cancelled)
    }

    /// Cancels every queued job with `reason`. Returns how many were cancelled.
    pub fn cancel_queued(&mut self, reason: &str) -> usize {
        let queued: Vec<JobId> = self.queue.drain(..).collect();
        let mut n = 0;
        for id in queued {
            if self.cancel_with_reason(id, reason).is_ok() {
                n += 1;
            }
        }
        n
    }

    /// Marks a running job cancelled without waiting for its backend call.
    pub fn abandon(&mut self, id: JobId, reason: &str) -> Result<CancelAck> {
        self.cancel_with_reason(id, reason)
    }

    /// Removes terminal records matching `scope`, skipping ids in `in_flight`.
    pub fn purge(&mut self, scope: PurgeScope, in_flight: &HashSet<JobId>) -> usize {
        let before = self.jobs.len();
        self.jobs
            .retain(|id, job| !(scope.matches(job.state) && !in_flight.contains(id)));
        before - self.jobs.len()
    }

    /// Replaces every failed record with a fresh queued job for the same URL.
    /// Returns `(old_id, new_id)` pairs in submission order.
    pub fn resubmit_failed(&mut self, owner: Option<String>) -> Result<Vec<(JobId, JobId)>> {
        let failed: Vec<(JobId, String)> = self
            .jobs
            .values()
            .filter(|j| j.state == JobState::Failed)
            .map(|j| (j.id, j.url.clone()))
            .collect();
        let mut pairs = Vec::with_capacity(failed.len());
        for (old_id, url) in failed {
            self.jobs.remove(&old_id);
            let new_id = self.submit(&url, owner.clone())?;
            pairs.push((old_id, new_id));
        }
        Ok(pairs)
    }

    fn expect_state(&mut self, id: JobId, expected: JobState, op: &str) -> Result<&mut Job> {
        let job = self.jobs.get_mut(&id).ok_or_else(|| {
            JobError::InternalFault(format!("{}: job {} does not exist", op, id))
        })?;
        if job.state != expected {
            return Err(JobError::InternalFault(format!(
                "{}: job {} is {}, expected {}",
                op, id, job.state, expected
            )));
        }
        Ok(job)
    }
}

/// Accepts absolute URLs with a host; returns the trimmed form.
fn validate_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(JobError::rejected("empty URL"));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| JobError::rejected(format!("malformed URL {:?}: {}", trimmed, e)))?;
    if parsed.host_str().map_or(true, |h| h.is_empty()) {
        return Err(JobError::rejected(format!("URL has no host: {:?}", trimmed)));
    }
    Ok(trimmed.to_string())
}
