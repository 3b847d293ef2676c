//! `dlq purge [--failed]` – drop finished jobs from the server's list.

use anyhow::Result;
use dlq_core::config::ClientConfig;
use dlq_core::job::PurgeScope;
use dlq_core::protocol::Response;
use std::path::Path;

use crate::cli::{control_socket, render};

pub async fn run_purge(socket: &Path, cfg: &ClientConfig, failed_only: bool) -> Result<()> {
    let scope = if failed_only {
        PurgeScope::Failed
    } else {
        PurgeScope::Terminal
    };
    let mut client = control_socket::connect(socket, cfg).await?;
    match client.purge(scope).await? {
        Response::Purged { count } => println!("Removed {count} job(s)"),
        other => anyhow::bail!(render::describe(&other)),
    }
    Ok(())
}
