//! Shared application state and the engine's tool/resource catalog.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::engine::ProtocolEngine;
use super::registry::SessionRegistry;
use super::resources::{dashboard, keyword_map};
use super::tools::{document_get_content, echo, find_paginated};
use crate::backend::DocumentBackend;
use crate::config::GlobalConfig;
use crate::Result;

/// Server name reported in the `initialize` handshake.
pub const SERVER_NAME: &str = "openkm";

/// Server version reported in the `initialize` handshake.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state accessible by the HTTP/SSE transport.
pub struct AppState {
    /// Global configuration.
    pub config: Arc<GlobalConfig>,
    /// Open sessions keyed by session id.
    pub registry: Arc<SessionRegistry>,
    /// Protocol engine shared by every session.
    pub engine: Arc<ProtocolEngine>,
}

impl AppState {
    /// Assemble state around a fresh, empty session registry.
    #[must_use]
    pub fn new(config: Arc<GlobalConfig>, engine: ProtocolEngine) -> Self {
        Self {
            config,
            registry: Arc::new(SessionRegistry::new()),
            engine: Arc::new(engine),
        }
    }
}

/// Build the engine with every tool and resource bound to `backend`.
///
/// # Errors
///
/// Returns `AppError::Config` if two capabilities collide on name or URI.
pub fn build_engine(
    backend: Arc<dyn DocumentBackend>,
    handler_timeout: Duration,
) -> Result<ProtocolEngine> {
    let mut engine = ProtocolEngine::new(SERVER_NAME, SERVER_VERSION)
        .with_handler_timeout(handler_timeout)
        .with_instructions("Read documents, search, and browse dashboards of an OpenKM repository.");

    engine.register_tool(echo::descriptor())?;
    engine.register_tool(document_get_content::descriptor(Arc::clone(&backend)))?;
    engine.register_tool(find_paginated::descriptor(Arc::clone(&backend)))?;

    engine.register_resource(dashboard::last_modified(Arc::clone(&backend)))?;
    engine.register_resource(dashboard::last_uploaded(Arc::clone(&backend)))?;
    engine.register_resource(keyword_map::descriptor(backend))?;

    info!(
        tools = engine.tool_names().len(),
        resources = engine.resource_uris().len(),
        "protocol engine ready"
    );
    Ok(engine)
}
