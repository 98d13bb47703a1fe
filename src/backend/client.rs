//! Authenticated HTTP client for the OpenKM REST API.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response, Url};
use tracing::{debug, warn};

use crate::config::GlobalConfig;
use crate::{AppError, Result};

/// Thin wrapper around a `reqwest::Client` carrying basic-auth credentials.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    username: String,
    password: String,
}

impl HttpBackend {
    /// Create a client with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the underlying client cannot be built.
    pub fn new(
        base_url: Url,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            base_url,
            username: username.into(),
            password: password.into(),
        })
    }

    /// Build from configuration with credentials already loaded.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the base URL is invalid or the client
    /// cannot be built.
    pub fn from_config(config: &GlobalConfig) -> Result<Self> {
        Self::new(
            config.backend_url()?,
            config.backend.username.clone().unwrap_or_default(),
            config.backend.password.clone(),
            config.backend_timeout(),
        )
    }

    /// Base URL of the REST API.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get(&self, url: Url, accept: &'static str) -> Result<Response> {
        debug!(%url, "backend request");
        let response = self
            .client
            .get(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|err| {
                warn!(%url, %err, "backend request failed");
                AppError::from(err)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "backend returned error status");
            return Err(AppError::BackendUnavailable(format!(
                "{} returned {status}",
                url.path()
            )));
        }
        Ok(response)
    }

    /// GET `url` and return the body as text, verbatim.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BackendUnavailable` on failure.
    pub async fn get_text(&self, url: Url) -> Result<String> {
        Ok(self.get(url, "application/json").await?.text().await?)
    }

    /// GET `url` and return the raw body.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BackendUnavailable` on failure.
    pub async fn get_bytes(&self, url: Url) -> Result<Bytes> {
        Ok(self.get(url, "application/octet-stream").await?.bytes().await?)
    }
}
