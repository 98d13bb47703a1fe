//! `dashboard://` resources: the current user's recent documents.

use std::sync::Arc;

use super::proxy_descriptor;
use crate::backend::DocumentBackend;
use crate::mcp::engine::ResourceDescriptor;

/// URI of the last-modified documents resource.
pub const LAST_MODIFIED_URI: &str = "dashboard://getUserLastModifiedDocuments";

/// URI of the last-uploaded documents resource.
pub const LAST_UPLOADED_URI: &str = "dashboard://getUserLastUploadedDocuments";

/// Documents the user modified most recently.
#[must_use]
pub fn last_modified(backend: Arc<dyn DocumentBackend>) -> ResourceDescriptor {
    proxy_descriptor(
        backend,
        "getUserLastModifiedDocuments",
        LAST_MODIFIED_URI,
        "Get user last modified documents",
        "dashboard/getUserLastModifiedDocuments",
    )
}

/// Documents the user uploaded most recently.
#[must_use]
pub fn last_uploaded(backend: Arc<dyn DocumentBackend>) -> ResourceDescriptor {
    proxy_descriptor(
        backend,
        "getUserLastUploadedDocuments",
        LAST_UPLOADED_URI,
        "Get user last uploaded documents",
        "dashboard/getUserLastUploadedDocuments",
    )
}
