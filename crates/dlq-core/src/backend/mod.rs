//! Download backends: one blocking `fetch` per job.
//!
//! A backend turns a URL into a local file. Every error, including I/O and
//! transport failures, is folded into `Outcome::Failure`; nothing escapes
//! `fetch`. The artifact's modification time is set to the completion time,
//! never to a timestamp reported by the remote side.

mod command;
mod curl;
mod naming;

pub use self::command::CommandBackend;
pub use self::curl::CurlBackend;
pub use naming::{claim_artifact, derive_filename};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;

use crate::config::{BackendConfig, BackendKind};

/// Result of one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        path: PathBuf,
        completed_at: SystemTime,
    },
    Failure {
        reason: String,
    },
}

impl Outcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Outcome::Failure {
            reason: reason.into(),
        }
    }
}

impl From<Result<(PathBuf, SystemTime), BackendError>> for Outcome {
    fn from(res: Result<(PathBuf, SystemTime), BackendError>) -> Self {
        match res {
            Ok((path, completed_at)) => Outcome::Success { path, completed_at },
            Err(e) => Outcome::failure(e.to_string()),
        }
    }
}

/// Failure inside a backend before it is reported as `Outcome::Failure`.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("curl: {0}")]
    Curl(#[from] ::curl::Error),
    #[error("HTTP {0}")]
    Http(u32),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {detail}")]
    CommandFailed {
        program: String,
        status: String,
        detail: String,
    },
    #[error("downloader reported no artifact path")]
    NoArtifact,
    #[error("artifact not found at {0}")]
    MissingArtifact(PathBuf),
}

impl BackendError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BackendError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Performs the actual transfer for one URL. Called on a blocking thread.
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    /// Blocks until the download finishes. Never panics on backend errors.
    fn fetch(&self, url: &str) -> Outcome;
}

/// Builds the backend selected by `cfg`, writing artifacts into `download_dir`.
pub fn from_config(cfg: &BackendConfig, download_dir: &Path) -> Arc<dyn Backend> {
    match cfg.kind {
        BackendKind::Curl => Arc::new(CurlBackend::new(
            download_dir,
            Duration::from_secs(cfg.connect_timeout_secs),
            cfg.timeout_secs.map(Duration::from_secs),
        )),
        BackendKind::Command => Arc::new(CommandBackend::new(
            cfg.program.clone(),
            cfg.args.clone(),
            download_dir,
        )),
    }
}

/// Sets the artifact's modification time to `completed_at`.
///
/// Failure is logged and otherwise ignored: the file itself is complete.
pub(crate) fn stamp_completion(path: &Path, completed_at: SystemTime) {
    let res = fs::File::options()
        .write(true)
        .open(path)
        .and_then(|f| f.set_modified(completed_at));
    if let Err(e) = res {
        tracing::warn!(path = %path.display(), "could not set completion time: {}", e);
    }
}
