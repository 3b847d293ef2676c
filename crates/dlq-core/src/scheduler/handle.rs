use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::backend::Backend;
use crate::config::ServerConfig;
use crate::error::{JobError, Result};
use crate::job::{CancelAck, Job, JobId, JobRegistry, PurgeScope};

use super::actor::Scheduler;
use super::messages::SchedulerMessage::{
    self, Cancel, List, Purge, ResubmitFailed, Shutdown, Status, Submit,
};
use super::DrainReport;

/// Inbound message queue depth for the actor.
const INBOX_CAPACITY: usize = 256;

/// Cloneable handle to the scheduler actor.
///
/// Every method is a request/reply round trip to the actor task, so calls from
/// any number of sessions are serialized there. Once the actor has stopped
/// every method returns [`JobError::Unavailable`].
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerMessage>,
}

impl SchedulerHandle {
    /// Spawns the actor on the current runtime.
    ///
    /// The returned join handle resolves to the final [`DrainReport`] after
    /// shutdown, or after every handle has been dropped and in-flight calls
    /// have drained within `default_grace`.
    pub fn spawn(
        registry: JobRegistry,
        max_concurrency: usize,
        backend: Arc<dyn Backend>,
        default_grace: Duration,
    ) -> (Self, JoinHandle<DrainReport>) {
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);
        let actor = Scheduler::new(inbox, registry, backend, max_concurrency, default_grace);
        let task = tokio::spawn(actor.run());
        (Self { sender }, task)
    }

    pub fn from_config(
        cfg: &ServerConfig,
        backend: Arc<dyn Backend>,
    ) -> (Self, JoinHandle<DrainReport>) {
        Self::spawn(
            JobRegistry::new(cfg.max_jobs),
            cfg.max_concurrency,
            backend,
            cfg.shutdown_grace(),
        )
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SchedulerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| JobError::Unavailable)?;
        rx.await.map_err(|_| JobError::Unavailable)
    }

    pub async fn submit(&self, url: impl Into<String>, owner: Option<String>) -> Result<JobId> {
        let url = url.into();
        self.request(|response| Submit {
            url,
            owner,
            response,
        })
        .await?
    }

    pub async fn status(&self, job_id: JobId) -> Result<Job> {
        self.request(|response| Status { job_id, response }).await?
    }

    /// Every record in submission order.
    pub async fn list(&self) -> Result<Vec<Job>> {
        self.request(|response| List { response }).await
    }

    pub async fn cancel(&self, job_id: JobId) -> Result<CancelAck> {
        self.request(|response| Cancel { job_id, response }).await?
    }

    /// Removes terminal records matching `scope`. Returns how many were removed.
    pub async fn purge(&self, scope: PurgeScope) -> Result<usize> {
        self.request(|response| Purge { scope, response }).await
    }

    /// Resubmits every failed job under a new id; returns `(old, new)` pairs.
    pub async fn resubmit_failed(&self, owner: Option<String>) -> Result<Vec<(JobId, JobId)>> {
        self.request(|response| ResubmitFailed { owner, response })
            .await?
    }

    /// Stops the scheduler and waits for in-flight calls to drain.
    ///
    /// `grace` defaults to the value the actor was spawned with. Calling this
    /// again while a shutdown is in progress waits for the same report.
    pub async fn shutdown(&self, grace: Option<Duration>) -> Result<DrainReport> {
        self.request(|response| Shutdown { grace, response }).await
    }
}
