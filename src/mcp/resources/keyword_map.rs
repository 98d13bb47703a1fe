//! `search://getKeywordMap` resource: keywords in use and their counts.

use std::sync::Arc;

use super::proxy_descriptor;
use crate::backend::DocumentBackend;
use crate::mcp::engine::ResourceDescriptor;

/// Resource URI.
pub const URI: &str = "search://getKeywordMap";

/// Build the resource descriptor bound to `backend`.
#[must_use]
pub fn descriptor(backend: Arc<dyn DocumentBackend>) -> ResourceDescriptor {
    proxy_descriptor(
        backend,
        "getKeywordMap",
        URI,
        "Get the keyword map of the repository",
        "search/getKeywordMap",
    )
}
