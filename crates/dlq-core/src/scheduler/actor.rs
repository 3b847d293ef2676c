use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, JoinError, JoinSet};
use tokio::time::{sleep_until, Instant};

use crate::backend::{Backend, Outcome};
use crate::error::JobError;
use crate::job::{JobId, JobRegistry};

use super::messages::SchedulerMessage;
use super::{DrainReport, ABANDONED_REASON, SHUTDOWN_REASON, SHUTTING_DOWN};

struct Drain {
    deadline: Instant,
    waiters: Vec<oneshot::Sender<DrainReport>>,
    drained: usize,
}

pub struct Scheduler {
    inbox: mpsc::Receiver<SchedulerMessage>,
    inbox_open: bool,
    registry: JobRegistry,
    backend: Arc<dyn Backend>,
    max_concurrency: usize,
    default_grace: Duration,
    in_flight: HashSet<JobId>,
    calls: JoinSet<Outcome>,
    call_jobs: HashMap<task::Id, JobId>,
    drain: Option<Drain>,
}

impl Scheduler {
    pub fn new(
        inbox: mpsc::Receiver<SchedulerMessage>,
        registry: JobRegistry,
        backend: Arc<dyn Backend>,
        max_concurrency: usize,
        default_grace: Duration,
    ) -> Self {
        Self {
            inbox,
            inbox_open: true,
            registry,
            backend,
            max_concurrency: max_concurrency.max(1),
            default_grace,
            in_flight: HashSet::new(),
            calls: JoinSet::new(),
            call_jobs: HashMap::new(),
            drain: None,
        }
    }

    pub async fn run(mut self) -> DrainReport {
        tracing::info!(
            backend = self.backend.name(),
            max_concurrency = self.max_concurrency,
            "scheduler started"
        );
        let mut abandoned = 0;
        loop {
            self.fill_slots();
            if self.drain.is_some() && self.in_flight.is_empty() {
                break;
            }
            let deadline = self.drain.as_ref().map(|d| d.deadline);

            tokio::select! {
                msg = self.inbox.recv(), if self.inbox_open => match msg {
                    Some(msg) => self.handle(msg),
                    None => {
                        self.inbox_open = false;
                        tracing::debug!("all scheduler handles dropped");
                        self.begin_drain(None, None);
                    }
                },
                Some(res) = self.calls.join_next_with_id(), if !self.calls.is_empty() => {
                    self.complete(res);
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    abandoned = self.abandon_in_flight();
                    break;
                }
                else => break,
            }
        }
        self.finish(abandoned)
    }

    fn handle(&mut self, msg: SchedulerMessage) {
        use SchedulerMessage::*;
        match msg {
            Submit {
                url,
                owner,
                response,
            } => {
                let res = if self.drain.is_some() {
                    Err(JobError::rejected(SHUTTING_DOWN))
                } else {
                    self.registry.submit(&url, owner)
                };
                match &res {
                    Ok(id) => tracing::info!(job_id = id, url = %url, "job queued"),
                    Err(e) => tracing::debug!(url = %url, "submit refused: {}", e),
                }
                let _ = response.send(res);
            }
            Status { job_id, response } => {
                let _ = response.send(self.registry.get(job_id).cloned());
            }
            List { response } => {
                let _ = response.send(self.registry.list_all());
            }
            Cancel { job_id, response } => {
                let res = self.registry.cancel(job_id);
                if let Ok(ack) = &res {
                    tracing::info!(job_id, ?ack, "cancel requested");
                }
                let _ = response.send(res);
            }
            Purge { scope, response } => {
                let n = self.registry.purge(scope, &self.in_flight);
                tracing::info!(?scope, removed = n, "purged jobs");
                let _ = response.send(n);
            }
            ResubmitFailed { owner, response } => {
                let res = if self.drain.is_some() {
                    Err(JobError::rejected(SHUTTING_DOWN))
                } else {
                    self.registry.resubmit_failed(owner)
                };
                if let Ok(pairs) = &res {
                    tracing::info!(count = pairs.len(), "resubmitted failed jobs");
                }
                let _ = response.send(res);
            }
            Shutdown { grace, response } => self.begin_drain(grace, Some(response)),
        }
    }

    /// Starts queued jobs while slots are free. No-op once draining.
    fn fill_slots(&mut self) {
        while self.drain.is_none() && self.in_flight.len() < self.max_concurrency {
            let Some((id, url)) = self.registry.pop_queued() else {
                break;
            };
            if let Err(e) = self.registry.mark_running(id) {
                tracing::error!(job_id = id, "{}", e);
                continue;
            }
            self.in_flight.insert(id);
            tracing::debug!(job_id = id, url = %url, in_flight = self.in_flight.len(), "dispatching");

            let backend = Arc::clone(&self.backend);
            let call = self.calls.spawn(async move {
                match task::spawn_blocking(move || backend.fetch(&url)).await {
                    Ok(outcome) => outcome,
                    Err(e) if e.is_panic() => Outcome::failure("backend panicked"),
                    Err(e) => Outcome::failure(format!("backend call did not finish: {}", e)),
                }
            });
            self.call_jobs.insert(call.id(), id);
        }
    }

    fn complete(&mut self, res: Result<(task::Id, Outcome), JoinError>) {
        let (call, outcome) = match res {
            Ok(done) => done,
            Err(e) => {
                tracing::error!("backend task join: {}", e);
                (e.id(), Outcome::failure(format!("backend call did not finish: {}", e)))
            }
        };
        let Some(id) = self.call_jobs.remove(&call) else {
            tracing::error!(task = %call, "finished backend call has no job");
            return;
        };
        self.in_flight.remove(&id);
        if let Some(drain) = self.drain.as_mut() {
            drain.drained += 1;
        }

        if self.registry.is_cancelled(id) {
            tracing::debug!(job_id = id, "discarding outcome of cancelled job");
            return;
        }
        let res = match outcome {
            Outcome::Success { path, completed_at } => {
                tracing::info!(job_id = id, path = %path.display(), "job done");
                self.registry.mark_done(id, path, completed_at)
            }
            Outcome::Failure { reason } => {
                tracing::info!(job_id = id, reason = %reason, "job failed");
                self.registry.mark_failed(id, reason)
            }
        };
        if let Err(e) = res {
            tracing::error!(job_id = id, "{}", e);
        }
    }

    fn begin_drain(&mut self, grace: Option<Duration>, waiter: Option<oneshot::Sender<DrainReport>>) {
        if let Some(drain) = self.drain.as_mut() {
            drain.waiters.extend(waiter);
            return;
        }
        let grace = grace.unwrap_or(self.default_grace);
        let cancelled = self.registry.cancel_queued(SHUTDOWN_REASON);
        tracing::info!(
            cancelled_queued = cancelled,
            in_flight = self.in_flight.len(),
            grace_secs = grace.as_secs_f64(),
            "shutdown: draining"
        );
        self.drain = Some(Drain {
            deadline: Instant::now() + grace,
            waiters: waiter.into_iter().collect(),
            drained: 0,
        });
    }

    /// Marks every job still in flight cancelled and stops waiting for it.
    fn abandon_in_flight(&mut self) -> usize {
        let ids: Vec<JobId> = self.in_flight.drain().collect();
        for &id in &ids {
            if let Err(e) = self.registry.abandon(id, ABANDONED_REASON) {
                tracing::debug!(job_id = id, "abandon: {}", e);
            }
            tracing::warn!(job_id = id, "backend call abandoned at shutdown");
        }
        self.calls.abort_all();
        self.call_jobs.clear();
        ids.len()
    }

    fn finish(mut self, abandoned: usize) -> DrainReport {
        let drain = self.drain.take();
        let report = DrainReport {
            drained: drain.as_ref().map_or(0, |d| d.drained),
            abandoned,
            jobs: self.registry.list_all(),
        };
        tracing::info!(
            drained = report.drained,
            abandoned = report.abandoned,
            jobs = report.jobs.len(),
            "scheduler stopped"
        );
        for waiter in drain.into_iter().flat_map(|d| d.waiters) {
            let _ = waiter.send(report.clone());
        }
        report
    }
}
