//! `dlq cancel <id>` – cancel a queued or running job.

use anyhow::Result;
use dlq_core::config::ClientConfig;
use dlq_core::job::JobId;
use dlq_core::protocol::Response;
use std::path::Path;

use crate::cli::{control_socket, render};

pub async fn run_cancel(socket: &Path, cfg: &ClientConfig, id: JobId) -> Result<()> {
    let mut client = control_socket::connect(socket, cfg).await?;
    match client.cancel(id).await? {
        Response::Ack => println!("Cancelled job {id}"),
        other => anyhow::bail!(render::describe(&other)),
    }
    Ok(())
}
