use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::broadcast;

use crate::scheduler::SchedulerHandle;

use super::codec::{read_frame, request_id, write_frame, ProtocolError};
use super::dispatch::{dispatch, Session};
use super::messages::{Envelope, Request, Response};

/// Serves one client connection until it closes.
///
/// Requests are handled one at a time, so responses go out in request order.
/// After an acknowledged shutdown, `shutdown_tx` is signalled and the session
/// ends.
pub async fn serve_session<S>(
    stream: S,
    scheduler: SchedulerHandle,
    session: Session,
    shutdown_tx: Option<broadcast::Sender<()>>,
) -> Result<(), ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    tracing::debug!(session = session.id, owner = %session.owner, "session opened");

    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(ProtocolError::FrameTooLong) => {
                tracing::warn!(session = session.id, "oversized frame; closing session");
                let reply = Envelope {
                    id: 0,
                    body: Response::Error {
                        message: ProtocolError::FrameTooLong.to_string(),
                    },
                };
                write_frame(&mut writer, &reply).await?;
                break;
            }
            Err(e) => return Err(e),
        };
        if frame.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let env: Envelope<Request> = match serde_json::from_slice(&frame) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(session = session.id, "malformed request: {}", e);
                let reply = Envelope {
                    id: request_id(&frame),
                    body: Response::Error {
                        message: format!("malformed request: {}", e),
                    },
                };
                write_frame(&mut writer, &reply).await?;
                continue;
            }
        };

        let is_shutdown = env.body == Request::Shutdown;
        let body = dispatch(&scheduler, &session, env.body).await;
        let stop = is_shutdown && body == Response::Ack;
        write_frame(&mut writer, &Envelope { id: env.id, body }).await?;
        if stop {
            if let Some(tx) = &shutdown_tx {
                let _ = tx.send(());
            }
            break;
        }
    }

    tracing::debug!(session = session.id, "session closed");
    Ok(())
}
