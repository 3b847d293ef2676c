//! CLI for the dlq download queue.

mod commands;
mod control_socket;
mod render;
mod shell;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dlq_core::config;
use dlq_core::control;
use dlq_core::job::JobId;
use std::path::PathBuf;

use commands::{
    run_cancel, run_list, run_purge, run_retry, run_serve, run_shutdown, run_status, run_submit,
};

/// Top-level CLI for the dlq download queue.
#[derive(Debug, Parser)]
#[command(name = "dlq")]
#[command(about = "dlq: download job queue server and client", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/dlq/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Control socket path (overrides server.socket_path).
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the server: accept jobs on the control socket and download them.
    Serve {
        /// Run up to N downloads concurrently (default: server.max_concurrency).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        /// Directory to write downloads to (default: server.download_dir or the current directory).
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,
    },

    /// Queue one or more URLs for download.
    Submit {
        /// Direct URLs to download.
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Show one job by its ID.
    Status {
        /// Job identifier.
        id: JobId,
    },

    /// List all jobs.
    List,

    /// Cancel a queued or running job by its ID.
    Cancel {
        /// Job identifier.
        id: JobId,
    },

    /// Queue every failed job again under a new ID.
    Retry,

    /// Remove finished jobs from the server's list.
    Purge {
        /// Only remove failed jobs.
        #[arg(long)]
        failed: bool,
    },

    /// Stop the server after in-flight downloads drain.
    Shutdown,

    /// Interactive client shell.
    Shell,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = match &cli.config {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);
        let socket = match cli.socket {
            Some(path) => path,
            None => control::socket_path(&cfg.server).context("resolve control socket path")?,
        };

        match cli.command {
            CliCommand::Serve { jobs, download_dir } => {
                run_serve(&cfg, &socket, jobs, download_dir).await?
            }
            CliCommand::Submit { urls } => run_submit(&socket, &cfg.client, &urls).await?,
            CliCommand::Status { id } => run_status(&socket, &cfg.client, id).await?,
            CliCommand::List => run_list(&socket, &cfg.client).await?,
            CliCommand::Cancel { id } => run_cancel(&socket, &cfg.client, id).await?,
            CliCommand::Retry => run_retry(&socket, &cfg.client).await?,
            CliCommand::Purge { failed } => run_purge(&socket, &cfg.client, failed).await?,
            CliCommand::Shutdown => run_shutdown(&socket, &cfg.client).await?,
            CliCommand::Shell => shell::run_shell(&socket, &cfg.client).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
