//! `find-paginated` MCP tool handler.
//!
//! Proxies a structured search to OpenKM's paginated search endpoint and
//! returns the response body verbatim.

use std::sync::Arc;

use rmcp::model::{CallToolResult, JsonObject};
use tracing::info;

use super::util::{parse_arguments, text_result};
use crate::backend::search::{build_search_url, SearchQuery};
use crate::backend::{endpoint_url, DocumentBackend};
use crate::mcp::engine::ToolDescriptor;
use crate::Result;

/// Tool name.
pub const NAME: &str = "find-paginated";

const SEARCH_ENDPOINT: &str = "search/findPaginated";

/// Build the tool descriptor bound to `backend`.
#[must_use]
pub fn descriptor(backend: Arc<dyn DocumentBackend>) -> ToolDescriptor {
    ToolDescriptor::new(
        NAME,
        "Search OpenKM documents with pagination. All filters are optional.",
        SearchQuery::input_schema(),
        move |arguments| handle(Arc::clone(&backend), arguments),
    )
}

/// Handle the `find-paginated` tool call.
///
/// # Errors
///
/// Returns `AppError::BackendUnavailable` if OpenKM cannot be reached.
pub async fn handle(
    backend: Arc<dyn DocumentBackend>,
    arguments: JsonObject,
) -> Result<CallToolResult> {
    let query: SearchQuery = parse_arguments(arguments)?;
    let base = endpoint_url(backend.base_url(), SEARCH_ENDPOINT, &[])?;
    let url = build_search_url(&base, &query);
    info!(query = url.query().unwrap_or_default(), "paginated search");

    let body = backend.fetch_json(url).await?;
    Ok(text_result(body))
}
