#![allow(dead_code)]

pub mod gated_backend;
pub mod http_server;

use std::time::Duration;

use dlq_core::job::{Job, JobId, JobState};
use dlq_core::scheduler::SchedulerHandle;

/// Polls `status(id)` until its state matches `state` (5s cap).
pub async fn wait_for_state(handle: &SchedulerHandle, id: JobId, state: JobState) -> Job {
    for _ in 0..500 {
        let job = handle.status(id).await.unwrap();
        if job.state == state {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never reached {}", id, state);
}
