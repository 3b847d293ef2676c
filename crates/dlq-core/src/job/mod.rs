//! Job records and the registry that owns them.

mod registry;
mod types;

pub use registry::{JobRegistry, CANCELLED_BY_CLIENT};
pub use types::*;
