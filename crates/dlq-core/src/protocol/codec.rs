//! Newline-delimited JSON framing.

use serde::Serialize;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Longest accepted frame, excluding the trailing newline.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection: {0}")]
    Io(#[from] io::Error),
    #[error("frame exceeds 64 KiB")]
    FrameTooLong,
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("connection closed by peer")]
    Disconnected,
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// Reads one line. Returns `None` at end of stream; a final line without a
/// newline is still returned.
pub async fn read_frame<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Vec<u8>>, ProtocolError> {
    let mut buf = Vec::new();
    let n = (&mut *reader)
        .take(MAX_FRAME_LEN as u64 + 1)
        .read_until(b'\n', &mut buf)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if buf.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLong);
    }
    Ok(Some(buf))
}

pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(msg)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// Best-effort correlation id of a frame that did not decode; 0 if absent.
pub fn request_id(frame: &[u8]) -> u64 {
    serde_json::from_slice::<serde_json::Value>(frame)
        .ok()
        .and_then(|v| v.get("id").and_then(serde_json::Value::as_u64))
        .unwrap_or(0)
}
