//! Backend stub for contract tests that never reach OpenKM.

use bytes::Bytes;
use reqwest::Url;

use openkm_mcp::backend::DocumentBackend;
use openkm_mcp::mcp::engine::BoxFuture;
use openkm_mcp::{AppError, Result};

/// Backend whose every call fails.
pub struct NullBackend {
    base: Url,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            base: Url::parse("http://okm.invalid/rest").expect("base url"),
        }
    }
}

fn unavailable<T: Send + 'static>() -> BoxFuture<'static, Result<T>> {
    Box::pin(async { Err(AppError::BackendUnavailable("stub backend".into())) })
}

impl DocumentBackend for NullBackend {
    fn base_url(&self) -> &Url {
        &self.base
    }

    fn fetch_json(&self, _url: Url) -> BoxFuture<'_, Result<String>> {
        unavailable()
    }

    fn fetch_binary(&self, _url: Url) -> BoxFuture<'_, Result<Bytes>> {
        unavailable()
    }

    fn convert_to_text(
        &self,
        _content: Bytes,
        _source_format: String,
    ) -> BoxFuture<'_, Result<String>> {
        unavailable()
    }
}
