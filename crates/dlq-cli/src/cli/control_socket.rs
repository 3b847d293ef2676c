//! Control socket: listener (during `dlq serve`) and client connection.
//! Protocol: newline-delimited JSON envelopes, see `dlq_core::protocol`.

use anyhow::{Context, Result};
use dlq_core::config::ClientConfig;
use dlq_core::control;
use dlq_core::protocol::{serve_session, Client, Session};
use dlq_core::scheduler::SchedulerHandle;
use std::fs;
use std::path::Path;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;

/// Binds the control socket, replacing a stale socket file left by a previous run.
pub fn bind(path: &Path) -> Result<UnixListener> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create socket dir {}", parent.display()))?;
    }
    if path.exists() {
        if std::os::unix::net::UnixStream::connect(path).is_ok() {
            anyhow::bail!("a dlq server is already listening on {}", path.display());
        }
        fs::remove_file(path)
            .with_context(|| format!("remove stale socket {}", path.display()))?;
    }
    UnixListener::bind(path).with_context(|| format!("bind control socket {}", path.display()))
}

/// Accepts connections until `shutdown_tx` fires, serving each on its own task.
pub async fn accept_loop(
    listener: UnixListener,
    scheduler: SchedulerHandle,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut shutdown_rx = shutdown_tx.subscribe();
    let mut next_session: u64 = 1;
    loop {
        tokio::select! {
            res = listener.accept() => match res {
                Ok((stream, _)) => {
                    let session = identify(&stream, next_session);
                    next_session += 1;
                    tracing::debug!(session = session.id, admin = session.is_admin, "client connected");
                    let scheduler = scheduler.clone();
                    let tx = shutdown_tx.clone();
                    tokio::spawn(async move {
                        let id = session.id;
                        if let Err(e) = serve_session(stream, scheduler, session, Some(tx)).await {
                            tracing::debug!(session = id, "session ended: {}", e);
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            },
            _ = shutdown_rx.recv() => break,
        }
    }
}

fn identify(stream: &UnixStream, id: u64) -> Session {
    match stream.peer_cred() {
        Ok(cred) => Session {
            id,
            owner: format!("uid{}/{}", cred.uid(), id),
            is_admin: control::is_admin_uid(cred.uid()),
        },
        Err(e) => {
            tracing::warn!(session = id, "peer credentials unavailable: {}", e);
            Session {
                id,
                owner: format!("session/{}", id),
                is_admin: false,
            }
        }
    }
}

/// Connects to a running server.
pub async fn connect(path: &Path, cfg: &ClientConfig) -> Result<Client<UnixStream>> {
    let stream = UnixStream::connect(path).await.with_context(|| {
        format!(
            "connect to {} (is `dlq serve` running?)",
            path.display()
        )
    })?;
    Ok(Client::new(stream, cfg))
}
