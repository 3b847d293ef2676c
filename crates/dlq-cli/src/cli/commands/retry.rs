//! `dlq retry` – queue every failed job again.

use anyhow::Result;
use dlq_core::config::ClientConfig;
use dlq_core::protocol::Response;
use std::path::Path;

use crate::cli::{control_socket, render};

pub async fn run_retry(socket: &Path, cfg: &ClientConfig) -> Result<()> {
    let mut client = control_socket::connect(socket, cfg).await?;
    match client.retry().await? {
        Response::Resubmitted { jobs } if jobs.is_empty() => println!("No failed jobs."),
        Response::Resubmitted { jobs } => {
            for (old, new) in jobs {
                println!("Job {old} requeued as {new}");
            }
        }
        other => anyhow::bail!(render::describe(&other)),
    }
    Ok(())
}
