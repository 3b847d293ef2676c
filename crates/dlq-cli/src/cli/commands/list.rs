//! `dlq list` – show all jobs.

use anyhow::Result;
use dlq_core::config::ClientConfig;
use dlq_core::protocol::Response;
use std::path::Path;

use crate::cli::{control_socket, render};

pub async fn run_list(socket: &Path, cfg: &ClientConfig) -> Result<()> {
    let mut client = control_socket::connect(socket, cfg).await?;
    match client.list().await? {
        Response::Jobs { jobs } => render::print_jobs(&jobs),
        other => anyhow::bail!(render::describe(&other)),
    }
    Ok(())
}
