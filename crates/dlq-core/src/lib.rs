//! dlq core: job registry, scheduler, download backends and the client/server
//! protocol.

pub mod backend;
pub mod config;
pub mod control;
pub mod error;
pub mod job;
pub mod logging;
pub mod protocol;
pub mod scheduler;
