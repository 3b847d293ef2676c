//! `dlq submit <url>...` – queue URLs on the running server.

use anyhow::Result;
use dlq_core::config::ClientConfig;
use dlq_core::protocol::Response;
use std::path::Path;

use crate::cli::{control_socket, render};

pub async fn run_submit(socket: &Path, cfg: &ClientConfig, urls: &[String]) -> Result<()> {
    let mut client = control_socket::connect(socket, cfg).await?;
    let mut refused = 0;
    for url in urls {
        match client.submit(url.as_str()).await? {
            Response::Submitted { job_id } => println!("Queued job {job_id}: {url}"),
            other => {
                refused += 1;
                eprintln!("{}: {}", url, render::describe(&other));
            }
        }
    }
    if refused > 0 {
        anyhow::bail!("{} of {} URL(s) not queued", refused, urls.len());
    }
    Ok(())
}
