#![forbid(unsafe_code)]

//! MCP gateway exposing an OpenKM document repository over HTTP/SSE.

pub mod backend;
pub mod config;
pub mod errors;
pub mod mcp;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
