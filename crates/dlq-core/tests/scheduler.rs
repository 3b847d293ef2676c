//! Scheduler behaviour against a gated in-memory backend.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::gated_backend::GatedBackend;
use common::wait_for_state;
use dlq_core::backend::Backend;
use dlq_core::error::JobError;
use dlq_core::job::{CancelAck, JobRegistry, JobResult, JobState, PurgeScope, CANCELLED_BY_CLIENT};
use dlq_core::scheduler::{SchedulerHandle, ABANDONED_REASON, SHUTDOWN_REASON};

fn spawn(backend: &Arc<GatedBackend>, max_concurrency: usize) -> SchedulerHandle {
    let (handle, _task) = SchedulerHandle::spawn(
        JobRegistry::new(1000),
        max_concurrency,
        Arc::clone(backend) as Arc<dyn Backend>,
        Duration::from_secs(5),
    );
    handle
}

fn url(n: usize) -> String {
    format!("https://example.com/file{}.bin", n)
}

#[tokio::test]
async fn running_jobs_never_exceed_max_concurrency() {
    let backend = GatedBackend::new();
    let handle = spawn(&backend, 2);
    let mut ids = Vec::new();
    for i in 1..=5 {
        ids.push(handle.submit(url(i), None).await.unwrap());
    }

    backend.wait_started(2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.started().len(), 2);
    let jobs = handle.list().await.unwrap();
    let running = jobs.iter().filter(|j| j.state == JobState::Running).count();
    let queued = jobs.iter().filter(|j| j.state == JobState::Queued).count();
    assert_eq!((running, queued), (2, 3));

    backend.release_all();
    for id in ids {
        wait_for_state(&handle, id, JobState::Done).await;
    }
    assert_eq!(backend.max_running(), 2);
}

#[tokio::test]
async fn single_slot_dispatches_in_submission_order() {
    let backend = GatedBackend::open();
    let handle = spawn(&backend, 1);
    let urls: Vec<String> = (1..=6).map(url).collect();
    let mut last = 0;
    for u in &urls {
        last = handle.submit(u.clone(), None).await.unwrap();
    }
    wait_for_state(&handle, last, JobState::Done).await;
    assert_eq!(backend.started(), urls);
    assert_eq!(backend.max_running(), 1);
}

#[tokio::test]
async fn cancelled_queued_job_is_never_dispatched() {
    let backend = GatedBackend::new();
    let handle = spawn(&backend, 1);
    let a = handle.submit(url(1), None).await.unwrap();
    let b = handle.submit(url(2), None).await.unwrap();
    backend.wait_started(1).await;

    assert_eq!(
        handle.cancel(b).await.unwrap(),
        CancelAck::Cancelled {
            previous: JobState::Queued
        }
    );
    backend.release_all();
    wait_for_state(&handle, a, JobState::Done).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(backend.started(), vec![url(1)]);
    let job = handle.status(b).await.unwrap();
    assert_eq!(job.state, JobState::Cancelled);
    assert_eq!(
        job.result,
        Some(JobResult::Cancelled {
            reason: CANCELLED_BY_CLIENT.into()
        })
    );
}

#[tokio::test]
async fn cancelled_running_job_stays_cancelled_and_holds_its_slot() {
    let backend = GatedBackend::new();
    let handle = spawn(&backend, 1);
    let a = handle.submit(url(1), None).await.unwrap();
    backend.wait_started(1).await;

    handle.cancel(a).await.unwrap();
    assert_eq!(handle.status(a).await.unwrap().state, JobState::Cancelled);

    // The backend call for `a` is still running, so `b` must wait.
    let b = handle.submit(url(2), None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.started().len(), 1);
    assert_eq!(handle.status(b).await.unwrap().state, JobState::Queued);

    backend.release_all();
    wait_for_state(&handle, b, JobState::Done).await;
    let job = handle.status(a).await.unwrap();
    assert_eq!(job.state, JobState::Cancelled);
    assert!(matches!(job.result, Some(JobResult::Cancelled { .. })));
}

#[tokio::test]
async fn cancel_is_idempotent_and_refuses_finished_jobs() {
    let backend = GatedBackend::open();
    backend.fail_on(&url(2));
    let handle = spawn(&backend, 2);
    let done = handle.submit(url(1), None).await.unwrap();
    let failed = handle.submit(url(2), None).await.unwrap();
    let done_job = wait_for_state(&handle, done, JobState::Done).await;
    wait_for_state(&handle, failed, JobState::Failed).await;

    assert_eq!(
        handle.cancel(done).await.unwrap_err(),
        JobError::AlreadyTerminal {
            id: done,
            state: JobState::Done
        }
    );
    assert_eq!(
        handle.cancel(failed).await.unwrap_err(),
        JobError::AlreadyTerminal {
            id: failed,
            state: JobState::Failed
        }
    );
    assert_eq!(handle.status(done).await.unwrap(), done_job);
    assert_eq!(handle.cancel(999).await.unwrap_err(), JobError::NotFound(999));
}

#[tokio::test]
async fn second_of_three_fails_and_third_takes_its_slot() {
    let backend = GatedBackend::new();
    backend.fail_on(&url(2));
    let handle = spawn(&backend, 2);
    let ids: Vec<_> = {
        let mut v = Vec::new();
        for i in 1..=3 {
            v.push(handle.submit(url(i), None).await.unwrap());
        }
        v
    };
    assert_eq!(ids, vec![1, 2, 3]);

    backend.wait_started(2).await;
    assert_eq!(handle.status(3).await.unwrap().state, JobState::Queued);

    backend.release(&url(2));
    let failed = wait_for_state(&handle, 2, JobState::Failed).await;
    match failed.result {
        Some(JobResult::Error { reason }) => assert!(reason.contains("simulated failure")),
        other => panic!("unexpected result {:?}", other),
    }
    backend.wait_started(3).await;
    assert_eq!(handle.status(3).await.unwrap().state, JobState::Running);

    backend.release_all();
    wait_for_state(&handle, 1, JobState::Done).await;
    wait_for_state(&handle, 3, JobState::Done).await;

    let jobs = handle.list().await.unwrap();
    let states: Vec<_> = jobs.iter().map(|j| (j.id, j.state)).collect();
    assert_eq!(
        states,
        vec![
            (1, JobState::Done),
            (2, JobState::Failed),
            (3, JobState::Done)
        ]
    );
    assert_eq!(backend.started(), vec![url(1), url(2), url(3)]);
    assert!(jobs.iter().all(|j| j.completed_at.is_some()));
}

#[tokio::test]
async fn three_urls_with_one_slot_and_a_failing_second_job() {
    let backend = GatedBackend::open();
    backend.fail_on(&url(2));
    let handle = spawn(&backend, 1);
    for i in 1..=3 {
        handle.submit(url(i), None).await.unwrap();
    }
    wait_for_state(&handle, 3, JobState::Done).await;

    let states: Vec<_> = handle
        .list()
        .await
        .unwrap()
        .iter()
        .map(|j| (j.id, j.state))
        .collect();
    assert_eq!(
        states,
        vec![
            (1, JobState::Done),
            (2, JobState::Failed),
            (3, JobState::Done)
        ]
    );
    assert_eq!(backend.max_running(), 1);
}

#[tokio::test]
async fn panicking_backend_fails_only_its_own_job() {
    let backend = GatedBackend::new();
    backend.panic_on(&url(1));
    let handle = spawn(&backend, 2);
    let bad = handle.submit(url(1), None).await.unwrap();
    let good = handle.submit(url(2), None).await.unwrap();
    backend.wait_started(2).await;

    backend.release(&url(1));
    let failed = wait_for_state(&handle, bad, JobState::Failed).await;
    assert_eq!(
        failed.result,
        Some(JobResult::Error {
            reason: "backend panicked".into()
        })
    );

    // The other call is still running and the scheduler still answers.
    assert_eq!(handle.status(good).await.unwrap().state, JobState::Running);
    let next = handle.submit(url(3), None).await.unwrap();
    backend.release_all();
    wait_for_state(&handle, good, JobState::Done).await;
    wait_for_state(&handle, next, JobState::Done).await;
}

#[tokio::test]
async fn completion_order_follows_backend_not_submission() {
    let backend = GatedBackend::new();
    let handle = spawn(&backend, 2);
    let first = handle.submit(url(1), None).await.unwrap();
    let second = handle.submit(url(2), None).await.unwrap();
    backend.wait_started(2).await;

    backend.release(&url(2));
    wait_for_state(&handle, second, JobState::Done).await;
    assert_eq!(handle.status(first).await.unwrap().state, JobState::Running);

    backend.release_all();
    wait_for_state(&handle, first, JobState::Done).await;
}

#[tokio::test]
async fn done_job_records_backend_path() {
    let backend = GatedBackend::open();
    let handle = spawn(&backend, 1);
    let id = handle.submit(url(7), Some("session-3".into())).await.unwrap();
    let job = wait_for_state(&handle, id, JobState::Done).await;
    assert_eq!(
        job.result,
        Some(JobResult::Artifact {
            path: "/downloads/file7.bin".into()
        })
    );
    assert_eq!(job.owner.as_deref(), Some("session-3"));
    assert!(job.started_at.is_some());
}

#[tokio::test]
async fn malformed_url_is_rejected_and_not_recorded() {
    let backend = GatedBackend::open();
    let handle = spawn(&backend, 1);
    assert!(matches!(
        handle.submit("definitely not a url", None).await,
        Err(JobError::Rejected { .. })
    ));
    assert!(handle.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn retry_replaces_failed_jobs_and_purge_removes_records() {
    let backend = GatedBackend::open();
    backend.fail_on(&url(1));
    let handle = spawn(&backend, 2);
    let a = handle.submit(url(1), None).await.unwrap();
    let b = handle.submit(url(2), None).await.unwrap();
    wait_for_state(&handle, a, JobState::Failed).await;
    wait_for_state(&handle, b, JobState::Done).await;

    let pairs = handle.resubmit_failed(None).await.unwrap();
    assert_eq!(pairs, vec![(a, 3)]);
    assert_eq!(handle.status(a).await.unwrap_err(), JobError::NotFound(a));
    wait_for_state(&handle, 3, JobState::Failed).await;

    assert_eq!(handle.purge(PurgeScope::Failed).await.unwrap(), 1);
    assert_eq!(handle.purge(PurgeScope::Terminal).await.unwrap(), 1);
    assert!(handle.list().await.unwrap().is_empty());
    assert_eq!(backend.started(), vec![url(1), url(2), url(1)]);
}

#[tokio::test]
async fn shutdown_drains_in_flight_and_cancels_queued() {
    let backend = GatedBackend::new();
    let handle = spawn(&backend, 1);
    let a = handle.submit(url(1), None).await.unwrap();
    let b = handle.submit(url(2), None).await.unwrap();
    backend.wait_started(1).await;

    let shutdown = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.shutdown(Some(Duration::from_secs(5))).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Reads still work while draining; submissions do not.
    assert_eq!(handle.status(b).await.unwrap().state, JobState::Cancelled);
    assert!(matches!(
        handle.submit(url(3), None).await,
        Err(JobError::Rejected { .. })
    ));

    backend.release_all();
    let report = shutdown.await.unwrap().unwrap();
    assert_eq!((report.drained, report.abandoned), (1, 0));
    let states: Vec<_> = report.jobs.iter().map(|j| (j.id, j.state)).collect();
    assert_eq!(states, vec![(a, JobState::Done), (b, JobState::Cancelled)]);
    assert_eq!(
        report.jobs[1].result,
        Some(JobResult::Cancelled {
            reason: SHUTDOWN_REASON.into()
        })
    );

    assert_eq!(handle.list().await.unwrap_err(), JobError::Unavailable);
}

#[tokio::test]
async fn shutdown_abandons_calls_that_outlive_the_grace_period() {
    let backend = GatedBackend::new();
    let handle = spawn(&backend, 2);
    let a = handle.submit(url(1), None).await.unwrap();
    backend.wait_started(1).await;

    let report = handle.shutdown(Some(Duration::from_millis(100))).await.unwrap();
    assert_eq!((report.drained, report.abandoned), (0, 1));
    assert_eq!(report.jobs[0].id, a);
    assert_eq!(report.jobs[0].state, JobState::Cancelled);
    assert_eq!(
        report.jobs[0].result,
        Some(JobResult::Cancelled {
            reason: ABANDONED_REASON.into()
        })
    );
    backend.release_all();
}

#[tokio::test]
async fn dropping_every_handle_drains_and_stops() {
    let backend = GatedBackend::open();
    let (handle, task) = SchedulerHandle::spawn(
        JobRegistry::new(10),
        1,
        Arc::clone(&backend) as Arc<dyn Backend>,
        Duration::from_secs(5),
    );
    let id = handle.submit(url(1), None).await.unwrap();
    wait_for_state(&handle, id, JobState::Done).await;
    drop(handle);

    let report = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.abandoned, 0);
    assert_eq!(report.jobs.len(), 1);
}
