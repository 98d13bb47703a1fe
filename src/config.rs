//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keyring service name under which backend credentials are stored.
pub const KEYRING_SERVICE: &str = "openkm-mcp";

/// OpenKM backend connectivity.
///
/// The password is never read from the TOML file; it is loaded at runtime
/// via OS keychain or environment variables.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BackendConfig {
    /// Base URL of the OpenKM REST API, e.g. `http://host:8080/OpenKM/services/rest`.
    pub base_url: String,
    /// Account used for basic authentication (falls back to `OKM_USERNAME`).
    #[serde(default)]
    pub username: Option<String>,
    /// Account password (populated at runtime).
    #[serde(skip)]
    pub password: String,
    /// Per-request HTTP timeout.
    #[serde(default = "default_backend_timeout")]
    pub timeout_seconds: u64,
}

fn default_backend_timeout() -> u64 {
    30
}

/// External document-to-text conversion utility.
///
/// `args` may contain the placeholders `{input}`, `{output}` and `{format}`.
/// When `{output}` is absent the program's stdout is taken as the text.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ConverterConfig {
    /// Program to execute.
    #[serde(default = "default_converter_program")]
    pub program: String,
    /// Argument template.
    #[serde(default = "default_converter_args")]
    pub args: Vec<String>,
    /// Upper bound on a single conversion run.
    #[serde(default = "default_converter_timeout")]
    pub timeout_seconds: u64,
    /// Directory in which scratch directories are created (system temp when absent).
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_converter_program() -> String {
    "pdftotext".into()
}

fn default_converter_args() -> Vec<String> {
    vec!["-layout".into(), "{input}".into(), "-".into()]
}

fn default_converter_timeout() -> u64 {
    120
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: default_converter_program(),
            args: default_converter_args(),
            timeout_seconds: default_converter_timeout(),
            temp_dir: None,
        }
    }
}

/// Timeouts applied by the protocol engine.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    /// Upper bound on a single tool or resource handler.
    #[serde(default = "default_handler_seconds")]
    pub handler_seconds: u64,
}

fn default_handler_seconds() -> u64 {
    60
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            handler_seconds: default_handler_seconds(),
        }
    }
}

fn default_http_port() -> u16 {
    3001
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// HTTP port for the SSE transport.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Interface the SSE transport binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    /// OpenKM connectivity settings.
    pub backend: BackendConfig,
    /// Document conversion settings.
    #[serde(default)]
    pub converter: ConverterConfig,
    /// Handler timeouts.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load backend credentials from OS keychain with env-var fallback.
    ///
    /// The username from the config file takes precedence; otherwise it is
    /// resolved like the password (`backend_username` / `OKM_USERNAME`).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither keychain nor env vars provide
    /// the required credentials.
    pub async fn load_credentials(&mut self) -> Result<()> {
        if self.backend.username.as_deref().map_or(true, str::is_empty) {
            self.backend.username =
                Some(load_credential("backend_username", "OKM_USERNAME").await?);
        }
        self.backend.password = load_credential("backend_password", "OKM_PASSWORD").await?;
        Ok(())
    }

    /// Socket address the HTTP/SSE transport listens on.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.http_port)
    }

    /// Parsed backend base URL.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the URL does not parse.
    pub fn backend_url(&self) -> Result<Url> {
        Url::parse(&self.backend.base_url)
            .map_err(|err| AppError::Config(format!("backend.base_url invalid: {err}")))
    }

    /// HTTP request timeout for backend calls.
    #[must_use]
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_seconds)
    }

    /// Timeout applied to each tool or resource handler.
    #[must_use]
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.handler_seconds)
    }

    fn validate(&self) -> Result<()> {
        let url = self.backend_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "backend.base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if url.cannot_be_a_base() {
            return Err(AppError::Config(
                "backend.base_url cannot carry path segments".into(),
            ));
        }

        if self.backend.timeout_seconds == 0 {
            return Err(AppError::Config(
                "backend.timeout_seconds must be greater than zero".into(),
            ));
        }

        if self.converter.program.trim().is_empty() {
            return Err(AppError::Config("converter.program must not be empty".into()));
        }

        if self.converter.timeout_seconds == 0 {
            return Err(AppError::Config(
                "converter.timeout_seconds must be greater than zero".into(),
            ));
        }

        if self.timeouts.handler_seconds == 0 {
            return Err(AppError::Config(
                "timeouts.handler_seconds must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    match env::var(env_key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))),
    }
}
