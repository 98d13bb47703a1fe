//! Outbound boundary to the OpenKM REST API and the conversion utility.
//!
//! Handlers only see the [`DocumentBackend`] trait. [`BackendProxy`] is the
//! production implementation combining [`client::HttpBackend`] and
//! [`convert::TextConverter`].

pub mod client;
pub mod convert;
pub mod search;

use bytes::Bytes;
use reqwest::Url;

use crate::config::GlobalConfig;
use crate::mcp::engine::BoxFuture;
use crate::{AppError, Result};

use self::client::HttpBackend;
use self::convert::TextConverter;

/// Operations handlers may perform against the document service.
pub trait DocumentBackend: Send + Sync {
    /// Base URL of the REST API.
    fn base_url(&self) -> &Url;

    /// Authenticated GET returning the raw response body.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BackendUnavailable` on network failure, timeout,
    /// or a non-success status.
    fn fetch_json(&self, url: Url) -> BoxFuture<'_, Result<String>>;

    /// Authenticated download of document content.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BackendUnavailable` on network failure, timeout,
    /// or a non-success status.
    fn fetch_binary(&self, url: Url) -> BoxFuture<'_, Result<Bytes>>;

    /// Extract plain text from `content` of the given source format.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConversionFailed` if the utility fails or yields
    /// no text.
    fn convert_to_text(&self, content: Bytes, source_format: String)
        -> BoxFuture<'_, Result<String>>;

    /// GET `endpoint` (relative to [`base_url`](Self::base_url)) with `params`.
    ///
    /// # Errors
    ///
    /// As [`fetch_json`](Self::fetch_json), plus `AppError::Config` if the
    /// URL cannot be built.
    fn get_endpoint(&self, endpoint: &str, params: &[(&str, &str)]) -> BoxFuture<'_, Result<String>> {
        match endpoint_url(self.base_url(), endpoint, params) {
            Ok(url) => self.fetch_json(url),
            Err(err) => Box::pin(std::future::ready(Err(err))),
        }
    }
}

/// Append `endpoint` path segments and `params` to `base`.
///
/// The base path is preserved, so `http://h/OpenKM/services/rest` joined
/// with `search/getKeywordMap` yields `http://h/OpenKM/services/rest/search/getKeywordMap`.
///
/// # Errors
///
/// Returns `AppError::Config` if `base` cannot carry path segments.
pub fn endpoint_url(base: &Url, endpoint: &str, params: &[(&str, &str)]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| AppError::Config(format!("backend url {base} cannot carry path segments")))?
        .pop_if_empty()
        .extend(endpoint.split('/').filter(|segment| !segment.is_empty()));
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}

/// Production backend: OpenKM over HTTP plus the local conversion utility.
pub struct BackendProxy {
    http: HttpBackend,
    converter: TextConverter,
}

impl BackendProxy {
    /// Combine an HTTP client and a converter.
    #[must_use]
    pub fn new(http: HttpBackend, converter: TextConverter) -> Self {
        Self { http, converter }
    }

    /// Build from configuration with credentials already loaded.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn from_config(config: &GlobalConfig) -> Result<Self> {
        Ok(Self::new(
            HttpBackend::from_config(config)?,
            TextConverter::from_config(&config.converter),
        ))
    }
}

impl DocumentBackend for BackendProxy {
    fn base_url(&self) -> &Url {
        self.http.base_url()
    }

    fn fetch_json(&self, url: Url) -> BoxFuture<'_, Result<String>> {
        Box::pin(self.http.get_text(url))
    }

    fn fetch_binary(&self, url: Url) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(self.http.get_bytes(url))
    }

    fn convert_to_text(
        &self,
        content: Bytes,
        source_format: String,
    ) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move { self.converter.convert(&content, &source_format).await })
    }
}
