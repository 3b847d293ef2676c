//! `dlq serve` – run the scheduler and the control socket until shutdown.

use anyhow::{Context, Result};
use dlq_core::backend::{self, Backend};
use dlq_core::config::DlqConfig;
use dlq_core::job::JobState;
use dlq_core::scheduler::SchedulerHandle;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::signal;
use tokio::sync::broadcast;

use crate::cli::control_socket;

pub async fn run_serve(
    cfg: &DlqConfig,
    socket: &Path,
    jobs: Option<usize>,
    download_dir: Option<PathBuf>,
) -> Result<()> {
    let mut server_cfg = cfg.server.clone();
    if let Some(n) = jobs {
        if n == 0 {
            anyhow::bail!("--jobs must be > 0");
        }
        server_cfg.max_concurrency = n;
    }
    let download_dir = match download_dir.or_else(|| server_cfg.download_dir.clone()) {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    fs::create_dir_all(&download_dir)
        .with_context(|| format!("create download dir {}", download_dir.display()))?;

    let listener = control_socket::bind(socket)?;
    let backend = backend::from_config(&cfg.backend, &download_dir);
    let backend_name = backend.name().to_string();
    let (scheduler, task) = SchedulerHandle::from_config(&server_cfg, backend);

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
    let accept = tokio::spawn(control_socket::accept_loop(
        listener,
        scheduler.clone(),
        shutdown_tx.clone(),
    ));
    tracing::info!(
        socket = %socket.display(),
        download_dir = %download_dir.display(),
        backend = %backend_name,
        max_concurrency = server_cfg.max_concurrency,
        "server listening"
    );
    println!(
        "dlq serving on {} ({} backend, {} concurrent, downloads to {})",
        socket.display(),
        backend_name,
        server_cfg.max_concurrency,
        download_dir.display()
    );

    tokio::select! {
        _ = shutdown_signal() => tracing::info!("shutdown signal received"),
        _ = shutdown_rx.recv() => tracing::info!("shutdown requested by client"),
    }
    let _ = shutdown_tx.send(());
    let _ = accept.await;

    // Already drained if a client requested the shutdown; then this returns Unavailable.
    let _ = scheduler.shutdown(None).await;
    drop(scheduler);
    let report = task.await.context("scheduler task")?;
    let _ = fs::remove_file(socket);

    let count = |state: JobState| report.jobs.iter().filter(|j| j.state == state).count();
    println!(
        "Stopped: {} done, {} failed, {} cancelled ({} drained, {} abandoned)",
        count(JobState::Done),
        count(JobState::Failed),
        count(JobState::Cancelled),
        report.drained,
        report.abandoned
    );

    if report.abandoned > 0 {
        // Abandoned backend calls still hold blocking threads, which the
        // runtime waits for on drop.
        tracing::warn!(abandoned = report.abandoned, "exiting with backend calls still running");
        std::process::exit(0);
    }
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
