//! Document-to-text conversion through an external program.
//!
//! Each run gets its own scratch directory holding the input (and, when
//! the argument template names `{output}`, the output) file. The directory
//! is removed when the run ends, whatever the outcome.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info_span, warn, Instrument};

use crate::config::ConverterConfig;
use crate::{AppError, Result};

/// Runs the configured conversion program.
#[derive(Debug, Clone)]
pub struct TextConverter {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    temp_dir: Option<PathBuf>,
}

impl TextConverter {
    /// Create a converter running `program` with the `args` template.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
            temp_dir: None,
        }
    }

    /// Create scratch directories under `dir` instead of the system temp dir.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Build from the `[converter]` config section.
    #[must_use]
    pub fn from_config(config: &ConverterConfig) -> Self {
        let converter = Self::new(
            config.program.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_seconds),
        );
        match &config.temp_dir {
            Some(dir) => converter.with_temp_dir(dir),
            None => converter,
        }
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("openkm-convert-");
            builder
        };
        let dir = match &self.temp_dir {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        };
        dir.map_err(|err| AppError::ConversionFailed(format!("cannot create scratch dir: {err}")))
    }

    /// Convert `content` of `source_format` (extension or MIME type) to text.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConversionFailed` if the program cannot be spawned,
    /// exits non-zero, times out, or produces no text.
    pub async fn convert(&self, content: &[u8], source_format: &str) -> Result<String> {
        let extension = normalize_format(source_format);
        let span = info_span!("convert", program = %self.program, format = %extension, bytes = content.len());

        async move {
            let scratch = self.scratch_dir()?;
            let input = scratch.path().join(format!("document.{extension}"));
            let output = scratch.path().join("document.txt");

            tokio::fs::write(&input, content).await.map_err(|err| {
                AppError::ConversionFailed(format!("cannot write scratch input: {err}"))
            })?;

            let input_arg = input.to_string_lossy();
            let output_arg = output.to_string_lossy();
            let args: Vec<String> = self
                .args
                .iter()
                .map(|arg| {
                    arg.replace("{input}", &input_arg)
                        .replace("{output}", &output_arg)
                        .replace("{format}", &extension)
                })
                .collect();
            let writes_file = self.args.iter().any(|arg| arg.contains("{output}"));

            let mut command = Command::new(&self.program);
            command
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let result = match tokio::time::timeout(self.timeout, command.output()).await {
                Ok(Ok(result)) => result,
                Ok(Err(err)) => {
                    return Err(AppError::ConversionFailed(format!(
                        "failed to run {}: {err}",
                        self.program
                    )))
                }
                Err(_) => {
                    warn!("conversion timed out");
                    return Err(AppError::ConversionFailed(format!(
                        "{} timed out after {}s",
                        self.program,
                        self.timeout.as_secs()
                    )));
                }
            };

            if !result.status.success() {
                let stderr = String::from_utf8_lossy(&result.stderr);
                return Err(AppError::ConversionFailed(format!(
                    "{} exited with {}: {}",
                    self.program,
                    result.status,
                    stderr.trim()
                )));
            }

            let text = if writes_file {
                let raw = tokio::fs::read(&output).await.map_err(|err| {
                    AppError::ConversionFailed(format!("no output file produced: {err}"))
                })?;
                String::from_utf8_lossy(&raw).into_owned()
            } else {
                String::from_utf8_lossy(&result.stdout).into_owned()
            };

            if text.trim().is_empty() {
                return Err(AppError::ConversionFailed(format!(
                    "{} produced no output",
                    self.program
                )));
            }

            debug!(chars = text.len(), "conversion complete");
            Ok(text)
        }
        .instrument(span)
        .await
    }
}

/// Reduce an extension (`.PDF`) or MIME type (`application/pdf`) to a safe
/// lowercase extension; `bin` when nothing usable remains.
#[must_use]
pub fn normalize_format(source_format: &str) -> String {
    let tail = source_format
        .rsplit(['/', '.'])
        .next()
        .unwrap_or(source_format);
    let cleaned: String = tail
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if cleaned.is_empty() {
        "bin".to_owned()
    } else {
        cleaned
    }
}
