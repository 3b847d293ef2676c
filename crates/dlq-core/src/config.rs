use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Scheduler and listener settings (`[server]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Maximum number of backend calls in flight at once. Must be > 0.
    pub max_concurrency: usize,
    /// Maximum number of job records the registry holds before rejecting submissions.
    pub max_jobs: usize,
    /// Seconds to wait for in-flight downloads during shutdown before abandoning them.
    pub shutdown_grace_secs: u64,
    /// Control socket path; defaults to `$XDG_STATE_HOME/dlq/control.sock`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,
    /// Directory artifacts are written to; defaults to the server's working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            max_jobs: 10_000,
            shutdown_grace_secs: 10,
            socket_path: None,
            download_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Client-side settings (`[client]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Maximum number of seconds to wait for a server response. Must be > 0.
    pub response_timeout_secs: f64,
    /// Timeout used for requests that may return large payloads (`list`).
    pub long_response_timeout_secs: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            response_timeout_secs: 10.0,
            long_response_timeout_secs: 60.0,
        }
    }
}

impl ClientConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.response_timeout_secs)
    }

    pub fn long_response_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.long_response_timeout_secs)
    }
}

/// Which download backend the server drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Built-in single-stream HTTP GET via libcurl.
    #[default]
    Curl,
    /// External downloader program (e.g. yt-dlp).
    Command,
}

/// Backend settings (`[backend]` in config.toml). Interpreted only by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Curl connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Optional whole-transfer timeout in seconds (None = no timeout).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Program run by the command backend.
    pub program: String,
    /// Argument template for the command backend; `{url}` and `{dir}` are substituted.
    pub args: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Curl,
            connect_timeout_secs: 30,
            timeout_secs: None,
            program: "yt-dlp".to_string(),
            args: [
                "--no-mtime",
                "--restrict-filenames",
                "--quiet",
                "--no-warnings",
                "-P",
                "{dir}",
                "--print",
                "after_move:filepath",
                "{url}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Global configuration loaded from `~/.config/dlq/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DlqConfig {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub backend: BackendConfig,
}

impl DlqConfig {
    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.server.max_concurrency == 0 {
            anyhow::bail!("server.max_concurrency must be > 0");
        }
        if self.server.max_jobs == 0 {
            anyhow::bail!("server.max_jobs must be > 0");
        }
        if !(self.client.response_timeout_secs > 0.0) {
            anyhow::bail!("client.response_timeout_secs must be > 0");
        }
        if !(self.client.long_response_timeout_secs > 0.0) {
            anyhow::bail!("client.long_response_timeout_secs must be > 0");
        }
        if self.backend.kind == BackendKind::Command && self.backend.program.trim().is_empty() {
            anyhow::bail!("backend.program must be set when backend.kind = \"command\"");
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dlq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DlqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DlqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load and validate configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<DlqConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config file: {}", path.display()))?;
    let cfg: DlqConfig =
        toml::from_str(&data).with_context(|| format!("bad config: {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("bad config: {}", path.display()))?;
    Ok(cfg)
}
