//! Control socket location and peer privilege checks.

use std::path::PathBuf;

use crate::config::ServerConfig;

/// Default path for the control socket (same XDG state dir as the log).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("dlq")?.get_state_home();
    Ok(dir.join("control.sock"))
}

/// `server.socket_path` when set, otherwise the default location.
pub fn socket_path(cfg: &ServerConfig) -> std::io::Result<PathBuf> {
    match &cfg.socket_path {
        Some(p) => Ok(p.clone()),
        None => default_control_socket_path(),
    }
}

/// A peer may shut the server down if it runs as root or as the server's own user.
#[cfg(unix)]
pub fn is_admin_uid(uid: u32) -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    let euid = unsafe { libc::geteuid() };
    uid == 0 || uid == euid
}

#[cfg(not(unix))]
pub fn is_admin_uid(_uid: u32) -> bool {
    false
}
