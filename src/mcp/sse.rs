//! HTTP/SSE transport for multi-client connections.
//!
//! `GET /sse` opens a session: the response is an event stream whose first
//! event (`endpoint`) tells the client where to POST its messages. Responses
//! come back on the same stream as `message` events. `POST /messages`
//! routes a payload to the session named by its `sessionId` query parameter.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::channel::{OutboundEvent, StreamingChannel};
use super::handler::AppState;
use crate::{AppError, Result};

/// Body returned when a posted message was queued.
pub const ACCEPTED_BODY: &str = "Accepted";

/// Body returned when `sessionId` names no open session.
pub const UNKNOWN_SESSION_BODY: &str = "No transport found for sessionId";

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Router state: application state plus the server-wide shutdown token.
#[derive(Clone)]
pub struct TransportState {
    app: Arc<AppState>,
    shutdown: CancellationToken,
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Handler for `GET /health`. Returns 200 OK with a plain-text body.
async fn health() -> &'static str {
    "ok"
}

/// Build the transport router.
///
/// Every session's channel is a child of `ct`; cancelling it ends all
/// open event streams.
pub fn router(state: Arc<AppState>, ct: CancellationToken) -> Router {
    Router::new()
        .route("/sse", get(open_stream))
        .route("/messages", post(post_message))
        .route("/health", get(health))
        .with_state(TransportState {
            app: state,
            shutdown: ct,
        })
}

async fn open_stream(State(state): State<TransportState>) -> Response {
    let (channel, ends) = StreamingChannel::new(&state.shutdown);

    let session_id = match state.app.registry.open(Arc::clone(&channel)) {
        Ok(id) => id,
        Err(err) => {
            error!(%err, "failed to register session");
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    };

    let registry = Arc::clone(&state.app.registry);
    channel.on_close(move |id| {
        registry.close(id);
        info!(session_id = %id, "session closed");
    });

    state.app.engine.attach(Arc::clone(&channel), ends.inbound);

    let endpoint = format!("/messages?sessionId={session_id}");
    if let Err(err) = channel.send_event(OutboundEvent::Endpoint(endpoint)) {
        warn!(%err, %session_id, "session closed before endpoint event");
    }
    info!(%session_id, "session opened");

    let stream = ends.events.map(|event| Ok::<_, Infallible>(to_sse_event(event)));
    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
        .into_response()
}

async fn post_message(
    State(state): State<TransportState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Some(session_id) = query.session_id.filter(|id| !id.is_empty()) else {
        return unknown_session();
    };
    let Some(channel) = state.app.registry.lookup(&session_id) else {
        debug!(%session_id, "message for unknown session");
        return unknown_session();
    };

    match channel.receive(body) {
        Ok(()) => (StatusCode::ACCEPTED, ACCEPTED_BODY).into_response(),
        Err(err) => {
            debug!(%err, %session_id, "message for closing session");
            state.app.registry.close(&session_id);
            unknown_session()
        }
    }
}

fn unknown_session() -> Response {
    (StatusCode::BAD_REQUEST, UNKNOWN_SESSION_BODY).into_response()
}

fn to_sse_event(event: OutboundEvent) -> Event {
    match event {
        OutboundEvent::Endpoint(path) => Event::default().event("endpoint").data(path),
        OutboundEvent::Message(frame) => Event::default().event("message").data(frame),
    }
}

/// Serve the transport on an already-bound listener until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Io` if the server fails while running.
pub async fn serve_listener(
    listener: TcpListener,
    state: Arc<AppState>,
    ct: CancellationToken,
) -> Result<()> {
    let app = router(state, ct.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(AppError::from)?;

    info!("HTTP/SSE MCP transport shut down");
    Ok(())
}

/// Start the HTTP/SSE MCP transport on the configured address.
///
/// # Errors
///
/// Returns `AppError::Config` if the server fails to bind.
pub async fn serve_sse(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let bind: SocketAddr = state.config.bind_addr();
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind SSE on {bind}: {err}")))?;

    info!(%bind, "starting HTTP/SSE MCP transport");
    serve_listener(listener, state, ct).await
}
