//! Built-in backend: single-stream HTTP GET via libcurl.
//!
//! Streams the body into `<name>.<n>.part` in the download directory, then
//! moves it under a freshly claimed name once the transfer and fsync succeed.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use super::naming::{claim_artifact, derive_filename};
use super::{stamp_completion, Backend, BackendError, Outcome};

pub struct CurlBackend {
    download_dir: PathBuf,
    connect_timeout: Duration,
    timeout: Option<Duration>,
    part_seq: AtomicU64,
}

impl CurlBackend {
    pub fn new(download_dir: &Path, connect_timeout: Duration, timeout: Option<Duration>) -> Self {
        Self {
            download_dir: download_dir.to_path_buf(),
            connect_timeout,
            timeout,
            part_seq: AtomicU64::new(0),
        }
    }

    fn temp_path(&self, filename: &str) -> PathBuf {
        let n = self.part_seq.fetch_add(1, Ordering::Relaxed);
        self.download_dir.join(format!(".{}.{}.part", filename, n))
    }

    fn download(&self, url: &str) -> Result<(PathBuf, SystemTime), BackendError> {
        let filename = derive_filename(url);
        let temp_path = self.temp_path(&filename);
        if let Err(e) = self.transfer_to(url, &temp_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        let completed_at = SystemTime::now();
        let final_path = claim_artifact(&temp_path, &self.download_dir, &filename, completed_at)
            .map_err(|e| {
                let _ = fs::remove_file(&temp_path);
                BackendError::io(
                    format!("move {} into {}", temp_path.display(), self.download_dir.display()),
                    e,
                )
            })?;
        stamp_completion(&final_path, completed_at);
        Ok((final_path, completed_at))
    }

    fn transfer_to(&self, url: &str, temp_path: &Path) -> Result<u64, BackendError> {
        let mut file = File::create(temp_path)
            .map_err(|e| BackendError::io(format!("create {}", temp_path.display()), e))?;

        let mut easy = ::curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.low_speed_limit(1024)?;
        easy.low_speed_time(Duration::from_secs(60))?;
        if let Some(t) = self.timeout {
            easy.timeout(t)?;
        }

        let mut written: u64 = 0;
        let mut write_err: Option<std::io::Error> = None;
        let perform = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match file.write_all(data) {
                Ok(()) => {
                    written += data.len() as u64;
                    Ok(data.len())
                }
                Err(e) => {
                    write_err = Some(e);
                    Ok(0) // abort transfer
                }
            })?;
            transfer.perform()
        };
        if let Some(e) = write_err {
            return Err(BackendError::io(format!("write {}", temp_path.display()), e));
        }
        perform?;

        let code = easy.response_code()?;
        // file:// and similar schemes report 0.
        if code != 0 && !(200..300).contains(&code) {
            return Err(BackendError::Http(code));
        }

        file.sync_all()
            .map_err(|e| BackendError::io(format!("sync {}", temp_path.display()), e))?;
        Ok(written)
    }
}

impl Backend for CurlBackend {
    fn name(&self) -> &str {
        "curl"
    }

    fn fetch(&self, url: &str) -> Outcome {
        let res = self.download(url);
        match &res {
            Ok((path, _)) => tracing::info!(url, path = %path.display(), "download succeeded"),
            Err(e) => tracing::warn!(url, "download failed: {}", e),
        }
        res.into()
    }
}
