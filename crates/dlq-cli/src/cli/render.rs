//! Text output for job records and server responses.

use dlq_core::job::{now_millis, Job};
use dlq_core::protocol::Response;

pub fn print_jobs(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("No jobs.");
        return;
    }
    println!("{:<6} {:<10} {:<8} {}", "ID", "STATE", "AGE", "URL");
    for j in jobs {
        println!(
            "{:<6} {:<10} {:<8} {}",
            j.id,
            j.state,
            format_age(now_millis() - j.submitted_at),
            j.url
        );
        if let Some(result) = &j.result {
            println!("{:<6} {}", "", result);
        }
    }
}

pub fn print_job(job: &Job) {
    println!("Job {}", job.id);
    println!("  url:     {}", job.url);
    println!("  state:   {}", job.state);
    if let Some(owner) = &job.owner {
        println!("  owner:   {}", owner);
    }
    if let (Some(started), Some(done)) = (job.started_at, job.completed_at) {
        println!("  took:    {}", format_age(done - started));
    }
    if let Some(result) = &job.result {
        println!("  result:  {}", result);
    }
}

/// One-line description of any response, used for unexpected or error replies.
pub fn describe(resp: &Response) -> String {
    match resp {
        Response::Submitted { job_id } => format!("queued as job {}", job_id),
        Response::Rejected { reason } => format!("rejected: {}", reason),
        Response::Job { job } => format!("job {} is {}", job.id, job.state),
        Response::NotFound { job_id } => format!("no such job: {}", job_id),
        Response::Jobs { jobs } => format!("{} job(s)", jobs.len()),
        Response::Ack => "ok".to_string(),
        Response::AlreadyTerminal { job_id, state } => {
            format!("job {} is already {}", job_id, state)
        }
        Response::Resubmitted { jobs } => format!("resubmitted {} job(s)", jobs.len()),
        Response::Purged { count } => format!("removed {} job(s)", count),
        Response::PermissionDenied { reason } => format!("permission denied: {}", reason),
        Response::Error { message } => format!("server error: {}", message),
    }
}

/// Compact duration: `42s`, `5m07s`, `3h12m`.
pub fn format_age(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m{:02}s", s / 60, s % 60),
        s => format!("{}h{:02}m", s / 3600, (s % 3600) / 60),
    }
}
