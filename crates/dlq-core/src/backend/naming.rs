//! Local artifact naming.
//!
//! The name comes from the last URL path segment, sanitized for Linux. If the
//! destination already exists the completion time is appended to the stem,
//! followed by a counter if that name is taken too.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::job::unix_millis;

/// Used when the URL path yields nothing usable.
const DEFAULT_FILENAME: &str = "download.bin";
/// Linux NAME_MAX, in bytes.
const NAME_MAX: usize = 255;

/// Derives a safe filename from `url`.
///
/// - `derive_filename("https://example.com/archive.zip")` → `"archive.zip"`
/// - `derive_filename("https://example.com/")` → `"download.bin"`
pub fn derive_filename(url: &str) -> String {
    let segment = url::Url::parse(url).ok().and_then(|u| {
        u.path_segments()
            .and_then(|segs| segs.filter(|s| !s.is_empty()).last().map(str::to_string))
    });
    let decoded = segment.map(|s| percent_decode(&s));
    match decoded.map(|s| sanitize(&s)) {
        Some(name) if !name.is_empty() && name != "." && name != ".." => name,
        _ => DEFAULT_FILENAME.to_string(),
    }
}

/// Gives up on a name after this many taken candidates.
const MAX_CANDIDATES: u32 = 10_000;

/// Moves the finished `temp` file into `dir` under the first free candidate
/// name and returns that path.
///
/// Candidates are `filename`, then `<stem>-<completion unix ms>[.<ext>]`, then
/// the same with `-1`, `-2`, ... appended to the stem. A name is claimed with
/// `create_new` before the rename, so concurrent calls never share or replace
/// an artifact.
pub fn claim_artifact(
    temp: &Path,
    dir: &Path,
    filename: &str,
    completed_at: SystemTime,
) -> io::Result<PathBuf> {
    let stamp = unix_millis(completed_at);
    for n in 0..MAX_CANDIDATES {
        let candidate = dir.join(candidate_name(filename, stamp, n));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
        // The placeholder is ours; the rename replaces it.
        if let Err(e) = fs::rename(temp, &candidate) {
            let _ = fs::remove_file(&candidate);
            return Err(e);
        }
        return Ok(candidate);
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {} in {}", filename, dir.display()),
    ))
}

fn candidate_name(filename: &str, stamp: i64, n: u32) -> String {
    let suffix = match n {
        0 => return filename.to_string(),
        1 => format!("-{}", stamp),
        n => format!("-{}-{}", stamp, n - 1),
    };
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}{}.{}", stem, suffix, ext),
        _ => format!("{}{}", filename, suffix),
    }
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(v) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(v);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Replaces path separators, NUL, whitespace and control characters with `_`,
/// collapses runs of `_`, trims dots/underscores and limits the length.
fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c == '/' || c == '\\' || c.is_control() || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut take = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
