//! MCP resource handlers.
//!
//! Every resource is a read-only proxy of one OpenKM GET endpoint whose
//! body is returned verbatim as JSON text.

pub mod dashboard;
pub mod keyword_map;

use std::sync::Arc;

use rmcp::model::{ReadResourceResult, ResourceContents};
use tracing::info;

use crate::backend::DocumentBackend;
use crate::mcp::engine::ResourceDescriptor;
use crate::Result;

const JSON_MIME_TYPE: &str = "application/json";

/// Build a descriptor proxying `uri` to the backend `endpoint`.
pub(crate) fn proxy_descriptor(
    backend: Arc<dyn DocumentBackend>,
    name: &str,
    uri: &str,
    description: &str,
    endpoint: &'static str,
) -> ResourceDescriptor {
    ResourceDescriptor::new(name, uri, description, move |requested| {
        read_endpoint(Arc::clone(&backend), endpoint, requested)
    })
}

/// Fetch `endpoint` and wrap the body as the contents of `uri`.
///
/// # Errors
///
/// Returns `AppError::BackendUnavailable` if OpenKM cannot be reached.
pub async fn read_endpoint(
    backend: Arc<dyn DocumentBackend>,
    endpoint: &'static str,
    uri: String,
) -> Result<ReadResourceResult> {
    let body = backend.get_endpoint(endpoint, &[]).await?;
    info!(%uri, endpoint, bytes = body.len(), "resource read");
    let mut contents = ResourceContents::text(body, uri);
    if let ResourceContents::TextResourceContents { mime_type, .. } = &mut contents {
        *mime_type = Some(JSON_MIME_TYPE.to_owned());
    }
    Ok(ReadResourceResult {
        contents: vec![contents],
    })
}
