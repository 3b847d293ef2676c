use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, BufReader, ReadHalf, WriteHalf};

use crate::config::ClientConfig;
use crate::job::{JobId, PurgeScope};

use super::codec::{read_frame, write_frame, ProtocolError};
use super::messages::{Envelope, Request, Response};

/// Request/response client over any byte stream.
///
/// One request is outstanding at a time. A response whose id is older than
/// the current request (left over from a timed-out call) is skipped.
pub struct Client<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    next_id: u64,
    timeout: Duration,
    long_timeout: Duration,
}

impl<S: AsyncRead + AsyncWrite> Client<S> {
    pub fn new(stream: S, cfg: &ClientConfig) -> Self {
        let (read_half, writer) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(read_half),
            writer,
            next_id: 1,
            timeout: cfg.response_timeout(),
            long_timeout: cfg.long_response_timeout(),
        }
    }

    /// Sends `req` and waits for its response. `list` and `shutdown` use the
    /// long timeout.
    pub async fn request(&mut self, req: Request) -> Result<Response, ProtocolError> {
        let limit = match req {
            Request::List | Request::Shutdown => self.long_timeout,
            _ => self.timeout,
        };
        let id = self.next_id;
        self.next_id += 1;
        write_frame(&mut self.writer, &Envelope { id, body: req }).await?;

        match tokio::time::timeout(limit, self.read_response(id)).await {
            Ok(res) => res,
            Err(_) => Err(ProtocolError::Timeout(limit)),
        }
    }

    async fn read_response(&mut self, id: u64) -> Result<Response, ProtocolError> {
        loop {
            let frame = read_frame(&mut self.reader)
                .await?
                .ok_or(ProtocolError::Disconnected)?;
            let env: Envelope<Response> = serde_json::from_slice(&frame)?;
            // id 0 means the server could not read our id.
            if env.id == id || env.id == 0 {
                return Ok(env.body);
            }
            tracing::debug!(expected = id, got = env.id, "skipping stale response");
        }
    }

    pub async fn submit(&mut self, url: impl Into<String>) -> Result<Response, ProtocolError> {
        self.request(Request::Submit { url: url.into() }).await
    }

    pub async fn status(&mut self, job_id: JobId) -> Result<Response, ProtocolError> {
        self.request(Request::Status { job_id }).await
    }

    pub async fn list(&mut self) -> Result<Response, ProtocolError> {
        self.request(Request::List).await
    }

    pub async fn cancel(&mut self, job_id: JobId) -> Result<Response, ProtocolError> {
        self.request(Request::Cancel { job_id }).await
    }

    pub async fn retry(&mut self) -> Result<Response, ProtocolError> {
        self.request(Request::Retry).await
    }

    pub async fn purge(&mut self, scope: PurgeScope) -> Result<Response, ProtocolError> {
        self.request(Request::Purge { scope }).await
    }

    pub async fn shutdown(&mut self) -> Result<Response, ProtocolError> {
        self.request(Request::Shutdown).await
    }
}
