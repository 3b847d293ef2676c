//! `dlq status <id>` – show one job.

use anyhow::Result;
use dlq_core::config::ClientConfig;
use dlq_core::job::JobId;
use dlq_core::protocol::Response;
use std::path::Path;

use crate::cli::{control_socket, render};

pub async fn run_status(socket: &Path, cfg: &ClientConfig, id: JobId) -> Result<()> {
    let mut client = control_socket::connect(socket, cfg).await?;
    match client.status(id).await? {
        Response::Job { job } => render::print_job(&job),
        other => anyhow::bail!(render::describe(&other)),
    }
    Ok(())
}
