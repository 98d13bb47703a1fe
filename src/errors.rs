//! Error types shared across the application.

use std::fmt::{Display, Formatter};

use crate::mcp::schema::ValidationErrors;

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing, validation, or registration failure.
    Config(String),
    /// MCP protocol or transport failure.
    Mcp(String),
    /// A posted message referenced a session with no live channel.
    UnknownSession(String),
    /// A tool call named a tool that was never registered.
    UnknownTool(String),
    /// A resource read named a URI no registered resource answers.
    UnknownResource(String),
    /// Tool arguments failed input-shape validation.
    InvalidInput(ValidationErrors),
    /// The OpenKM backend could not be reached or answered with an error status.
    BackendUnavailable(String),
    /// The document conversion utility failed or produced no text.
    ConversionFailed(String),
    /// Write attempted on a channel whose connection is gone.
    ChannelClosed(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Mcp(msg) => write!(f, "mcp: {msg}"),
            Self::UnknownSession(id) => write!(f, "unknown session: {id}"),
            Self::UnknownTool(name) => write!(f, "unknown tool: {name}"),
            Self::UnknownResource(uri) => write!(f, "unknown resource: {uri}"),
            Self::InvalidInput(errors) => write!(f, "invalid input: {errors}"),
            Self::BackendUnavailable(msg) => write!(f, "backend unavailable: {msg}"),
            Self::ConversionFailed(msg) => write!(f, "conversion failed: {msg}"),
            Self::ChannelClosed(id) => write!(f, "channel closed: {id}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::BackendUnavailable(format!("request timed out: {err}"))
        } else {
            Self::BackendUnavailable(err.to_string())
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::InvalidInput(errors)
    }
}
