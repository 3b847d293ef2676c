//! Client/server messaging: typed requests and responses, framed as one JSON
//! object per line.
//!
//! Responses on a session are 1:1 with requests and in request order. Nothing
//! is promised about ordering across sessions.

mod client;
mod codec;
mod dispatch;
mod messages;
mod session;

pub use client::Client;
pub use codec::{read_frame, request_id, write_frame, ProtocolError, MAX_FRAME_LEN};
pub use dispatch::{dispatch, Session};
pub use messages::{Envelope, Request, Response};
pub use session::serve_session;
