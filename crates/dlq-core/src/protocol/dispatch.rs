use crate::scheduler::SchedulerHandle;

use super::messages::{Request, Response};

/// Per-connection identity.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: u64,
    /// Recorded as the owner of jobs this session submits.
    pub owner: String,
    /// Whether the peer may shut the server down.
    pub is_admin: bool,
}

/// Executes one request against the scheduler and builds its response.
pub async fn dispatch(scheduler: &SchedulerHandle, session: &Session, req: Request) -> Response {
    match req {
        Request::Submit { url } => match scheduler.submit(url, Some(session.owner.clone())).await {
            Ok(job_id) => Response::Submitted { job_id },
            Err(e) => e.into(),
        },
        Request::Status { job_id } => match scheduler.status(job_id).await {
            Ok(job) => Response::Job { job },
            Err(e) => e.into(),
        },
        Request::List => match scheduler.list().await {
            Ok(jobs) => Response::Jobs { jobs },
            Err(e) => e.into(),
        },
        Request::Cancel { job_id } => match scheduler.cancel(job_id).await {
            Ok(_) => Response::Ack,
            Err(e) => e.into(),
        },
        Request::Retry => match scheduler.resubmit_failed(Some(session.owner.clone())).await {
            Ok(jobs) => Response::Resubmitted { jobs },
            Err(e) => e.into(),
        },
        Request::Purge { scope } => match scheduler.purge(scope).await {
            Ok(count) => Response::Purged { count },
            Err(e) => e.into(),
        },
        Request::Shutdown if !session.is_admin => {
            tracing::warn!(session = session.id, "shutdown refused: not an admin peer");
            Response::PermissionDenied {
                reason: "shutdown requires the server's user or root".into(),
            }
        }
        Request::Shutdown => {
            tracing::info!(session = session.id, "shutdown requested");
            match scheduler.shutdown(None).await {
                Ok(report) => {
                    tracing::info!(
                        drained = report.drained,
                        abandoned = report.abandoned,
                        "shutdown complete"
                    );
                    Response::Ack
                }
                Err(e) => e.into(),
            }
        }
    }
}
