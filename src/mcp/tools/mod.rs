//! MCP tool handlers.

pub mod document_get_content;
pub mod echo;
pub mod find_paginated;
pub mod util;
