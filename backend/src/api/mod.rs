//! HTTP API module.
//!
//! Server, request/response types and the log stream for the upload shell.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server};
pub use types::*;
