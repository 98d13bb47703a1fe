#![forbid(unsafe_code)]

//! `openkm-mcp`: MCP gateway server binary.
//!
//! Bootstraps configuration and credentials, wires the OpenKM backend into
//! the protocol engine, and serves the HTTP/SSE transport until a shutdown
//! signal arrives.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use openkm_mcp::backend::{BackendProxy, DocumentBackend};
use openkm_mcp::config::GlobalConfig;
use openkm_mcp::mcp::handler::{build_engine, AppState};
use openkm_mcp::mcp::sse;
use openkm_mcp::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "openkm-mcp", about = "MCP gateway for OpenKM", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the configured HTTP port.
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("openkm-mcp server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    config.load_credentials().await?;
    let config = Arc::new(config);
    info!(backend = %config.backend.base_url, "configuration loaded");

    // ── Build backend and engine ────────────────────────
    let backend: Arc<dyn DocumentBackend> = Arc::new(BackendProxy::from_config(&config)?);
    let engine = build_engine(backend, config.handler_timeout())?;
    let state = Arc::new(AppState::new(Arc::clone(&config), engine));

    // ── Start transport ─────────────────────────────────
    let ct = CancellationToken::new();
    let sse_ct = ct.clone();
    let sse_state = Arc::clone(&state);
    let mut sse_handle = tokio::spawn(async move { sse::serve_sse(sse_state, sse_ct).await });

    info!("MCP server ready");

    // ── Wait for shutdown signal or transport exit ──────
    tokio::select! {
        () = shutdown_signal() => {
            info!("shutdown signal received");
            ct.cancel();
            match (&mut sse_handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!(%err, "sse transport failed during shutdown"),
                Err(err) => error!(%err, "sse transport task panicked"),
            }
        }
        result = &mut sse_handle => {
            ct.cancel();
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(%err, "sse transport failed");
                    return Err(err);
                }
                Err(err) => {
                    error!(%err, "sse transport task panicked");
                }
            }
        }
    }

    info!(open_sessions = state.registry.len(), "openkm-mcp shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
