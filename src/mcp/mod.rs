//! Model Context Protocol server layer.

pub mod channel;
pub mod engine;
pub mod handler;
pub mod registry;
pub mod resources;
pub mod schema;
pub mod sse;
pub mod tools;
