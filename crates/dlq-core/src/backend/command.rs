//! Backend that shells out to an external downloader (yt-dlp by default).
//!
//! Arguments are a template: `{url}` and `{dir}` are replaced per call. The
//! downloader must print the artifact path as its last non-empty stdout line
//! (yt-dlp: `--print after_move:filepath`).

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::SystemTime;

use super::{stamp_completion, Backend, BackendError, Outcome};

pub struct CommandBackend {
    program: String,
    args: Vec<String>,
    download_dir: PathBuf,
}

impl CommandBackend {
    pub fn new(program: String, args: Vec<String>, download_dir: &Path) -> Self {
        Self {
            program,
            args,
            download_dir: download_dir.to_path_buf(),
        }
    }

    fn expand_args(&self, url: &str) -> Vec<String> {
        let dir = self.download_dir.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace("{url}", url).replace("{dir}", &dir))
            .collect()
    }

    fn download(&self, url: &str) -> Result<(PathBuf, SystemTime), BackendError> {
        let output = Command::new(&self.program)
            .args(self.expand_args(url))
            .current_dir(&self.download_dir)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| BackendError::io(format!("spawn {}", self.program), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = last_line(&stderr).unwrap_or("no error output").to_string();
            return Err(BackendError::CommandFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                detail,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reported = last_line(&stdout).ok_or(BackendError::NoArtifact)?;
        let path = self.download_dir.join(reported);
        if !path.exists() {
            return Err(BackendError::MissingArtifact(path));
        }
        let completed_at = SystemTime::now();
        stamp_completion(&path, completed_at);
        Ok((path, completed_at))
    }
}

fn last_line(s: &str) -> Option<&str> {
    s.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

impl Backend for CommandBackend {
    fn name(&self) -> &str {
        "command"
    }

    fn fetch(&self, url: &str) -> Outcome {
        let res = self.download(url);
        match &res {
            Ok((path, _)) => tracing::info!(url, path = %path.display(), "download succeeded"),
            Err(e) => tracing::warn!(url, program = %self.program, "download failed: {}", e),
        }
        res.into()
    }
}
