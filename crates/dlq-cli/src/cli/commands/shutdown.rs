//! `dlq shutdown` – stop the server. Returns once in-flight downloads drained.

use anyhow::Result;
use dlq_core::config::ClientConfig;
use dlq_core::protocol::Response;
use std::path::Path;

use crate::cli::{control_socket, render};

pub async fn run_shutdown(socket: &Path, cfg: &ClientConfig) -> Result<()> {
    let mut client = control_socket::connect(socket, cfg).await?;
    match client.shutdown().await? {
        Response::Ack => println!("Server stopped"),
        other => anyhow::bail!(render::describe(&other)),
    }
    Ok(())
}
