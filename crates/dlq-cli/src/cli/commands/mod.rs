//! CLI command handlers. `serve` runs the server; the rest are one-shot clients.

mod cancel;
mod list;
mod purge;
mod retry;
mod serve;
mod shutdown;
mod status;
mod submit;

pub use cancel::run_cancel;
pub use list::run_list;
pub use purge::run_purge;
pub use retry::run_retry;
pub use serve::run_serve;
pub use shutdown::run_shutdown;
pub use status::run_status;
pub use submit::run_submit;
