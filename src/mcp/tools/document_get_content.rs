//! `document-get-content` MCP tool handler.
//!
//! Resolves a document's repository path from its uuid, downloads the
//! content, and returns the text extracted by the conversion utility.
//! The path's file extension selects the source format.

use std::sync::Arc;

use rmcp::model::{CallToolResult, JsonObject};
use serde::Deserialize;
use tracing::info;

use super::util::{parse_arguments, text_result};
use crate::backend::{endpoint_url, DocumentBackend};
use crate::mcp::engine::ToolDescriptor;
use crate::mcp::schema::{FieldKind, InputSchema};
use crate::Result;

/// Tool name.
pub const NAME: &str = "document-get-content";

const NODE_PATH_ENDPOINT: &str = "repository/getNodePath";
const CONTENT_ENDPOINT: &str = "document/getContent";

#[derive(Debug, Deserialize)]
struct DocumentInput {
    uuid: String,
}

/// Build the tool descriptor bound to `backend`.
#[must_use]
pub fn descriptor(backend: Arc<dyn DocumentBackend>) -> ToolDescriptor {
    ToolDescriptor::new(
        NAME,
        "Get the plain-text content of an OpenKM document by uuid.",
        InputSchema::object().required("uuid", FieldKind::String, "Document uuid"),
        move |arguments| handle(Arc::clone(&backend), arguments),
    )
}

/// Handle the `document-get-content` tool call.
///
/// # Errors
///
/// Returns `AppError::BackendUnavailable` if OpenKM cannot be reached and
/// `AppError::ConversionFailed` if no text can be extracted.
pub async fn handle(
    backend: Arc<dyn DocumentBackend>,
    arguments: JsonObject,
) -> Result<CallToolResult> {
    let input: DocumentInput = parse_arguments(arguments)?;

    let raw_path = backend
        .get_endpoint(NODE_PATH_ENDPOINT, &[("uuid", input.uuid.as_str())])
        .await?;
    let path = node_path(&raw_path);
    let format = source_format(&path);

    let url = endpoint_url(
        backend.base_url(),
        CONTENT_ENDPOINT,
        &[("docId", input.uuid.as_str())],
    )?;
    let content = backend.fetch_binary(url).await?;
    info!(uuid = %input.uuid, %path, %format, bytes = content.len(), "document downloaded");

    let text = backend.convert_to_text(content, format).await?;
    Ok(text_result(text))
}

/// `getNodePath` answers either a bare path or a JSON string.
fn node_path(raw: &str) -> String {
    let trimmed = raw.trim();
    serde_json::from_str::<String>(trimmed).unwrap_or_else(|_| trimmed.to_owned())
}

/// Lowercase extension of the last path segment, `bin` when there is none.
fn source_format(path: &str) -> String {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => {
            extension.to_ascii_lowercase()
        }
        _ => "bin".to_owned(),
    }
}
