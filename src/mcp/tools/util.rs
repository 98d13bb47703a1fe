//! Shared utilities for MCP tool handlers.

use rmcp::model::{CallToolResult, Content, JsonObject};
use serde::de::DeserializeOwned;

use crate::mcp::schema::{FieldError, ValidationErrors};
use crate::{AppError, Result};

/// Deserialize already-validated arguments into a handler's input type.
///
/// # Errors
///
/// Returns `AppError::InvalidInput` if the arguments do not fit `T`.
pub fn parse_arguments<T: DeserializeOwned>(arguments: JsonObject) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(arguments)).map_err(|err| {
        AppError::InvalidInput(ValidationErrors(vec![FieldError::new(
            "arguments",
            err.to_string(),
        )]))
    })
}

/// Single text block success result.
#[must_use]
pub fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}
