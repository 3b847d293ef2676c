//! Command backend driving `sh` in place of an external downloader.
#![cfg(unix)]

use std::fs;

use dlq_core::backend::{Backend, CommandBackend, Outcome};
use tempfile::tempdir;

fn sh(script: &str, dir: &std::path::Path) -> CommandBackend {
    CommandBackend::new(
        "sh".into(),
        vec![
            "-c".into(),
            script.into(),
            "sh".into(),
            "{dir}".into(),
            "{url}".into(),
        ],
        dir,
    )
}

#[test]
fn relative_path_on_last_line_resolves_into_download_dir() {
    let dir = tempdir().unwrap();
    let backend = sh(
        r#"echo "fetching $2"; printf '%s' "$2" > "$1/video.mp4"; echo video.mp4"#,
        dir.path(),
    );
    match backend.fetch("https://example.com/watch?v=1") {
        Outcome::Success { path, .. } => {
            assert_eq!(path, dir.path().join("video.mp4"));
            assert_eq!(fs::read_to_string(&path).unwrap(), "https://example.com/watch?v=1");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn absolute_path_is_used_as_is() {
    let dir = tempdir().unwrap();
    let backend = sh(r#"touch "$1/clip.webm"; echo "$1/clip.webm""#, dir.path());
    match backend.fetch("https://example.com/clip") {
        Outcome::Success { path, .. } => assert_eq!(path, dir.path().join("clip.webm")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn non_zero_exit_reports_stderr_tail() {
    let dir = tempdir().unwrap();
    let backend = sh("echo 'ERROR: unsupported URL' >&2; exit 3", dir.path());
    match backend.fetch("https://example.com/x") {
        Outcome::Failure { reason } => {
            assert!(reason.contains("unsupported URL"), "{}", reason);
            assert!(reason.contains("sh exited"), "{}", reason);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn missing_or_absent_artifact_is_failure() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        sh("exit 0", dir.path()).fetch("https://example.com/x"),
        Outcome::Failure { .. }
    ));
    match sh("echo nowhere.bin", dir.path()).fetch("https://example.com/x") {
        Outcome::Failure { reason } => assert!(reason.contains("nowhere.bin"), "{}", reason),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn unknown_program_is_failure() {
    let dir = tempdir().unwrap();
    let backend = CommandBackend::new("dlq-no-such-program".into(), vec!["{url}".into()], dir.path());
    assert!(matches!(
        backend.fetch("https://example.com/x"),
        Outcome::Failure { .. }
    ));
}
