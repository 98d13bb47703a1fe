//! `echo` MCP tool: connectivity check that never touches the backend.

use rmcp::model::{CallToolResult, JsonObject};
use serde::Deserialize;

use super::util::{parse_arguments, text_result};
use crate::mcp::engine::ToolDescriptor;
use crate::mcp::schema::{FieldKind, InputSchema};
use crate::Result;

/// Tool name.
pub const NAME: &str = "echo";

#[derive(Debug, Deserialize)]
struct EchoInput {
    message: String,
}

/// Build the tool descriptor.
#[must_use]
pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        NAME,
        "Echo a message back twice. Useful to check that the session works.",
        InputSchema::object().required("message", FieldKind::String, "Text to echo"),
        handle,
    )
}

/// Handle the `echo` tool call.
///
/// # Errors
///
/// Returns `AppError::InvalidInput` if `message` is not a string.
pub async fn handle(arguments: JsonObject) -> Result<CallToolResult> {
    let input: EchoInput = parse_arguments(arguments)?;
    Ok(text_result(format!(
        "Tool echo: {} {}",
        input.message, input.message
    )))
}
