//! Per-connection streaming channel.
//!
//! A [`StreamingChannel`] pairs the server→client event stream of one SSE
//! connection with the queue of client→server messages posted for the same
//! session. The channel owns its session id. Its consumer halves are handed
//! out once at construction: the [`EventStream`] goes to the HTTP response
//! and the [`InboundMessages`] receiver goes to the protocol engine.
//!
//! Dropping the [`EventStream`] (client gone, response aborted, server
//! shutdown) closes the channel and fires every `on_close` callback exactly
//! once.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures_util::Stream;
use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::debug;
use uuid::Uuid;

use crate::{AppError, Result};

/// Frame written to the client's event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// Tells the client where to POST its messages.
    Endpoint(String),
    /// One encoded JSON-RPC message.
    Message(String),
}

/// Receiver of raw inbound payloads posted for a session.
pub type InboundMessages = mpsc::UnboundedReceiver<String>;

type CloseCallback = Box<dyn FnOnce(&str) + Send>;

/// Consumer halves of a freshly created channel.
pub struct ChannelEnds {
    /// Server→client frames, consumed by the HTTP response.
    pub events: EventStream,
    /// Client→server payloads, consumed by the protocol engine.
    pub inbound: InboundMessages,
}

/// Bidirectional link for one client session.
pub struct StreamingChannel {
    session_id: String,
    events: mpsc::UnboundedSender<OutboundEvent>,
    inbound: mpsc::UnboundedSender<String>,
    closed: AtomicBool,
    close_token: CancellationToken,
    close_callbacks: Mutex<Vec<CloseCallback>>,
}

impl StreamingChannel {
    /// Create a channel with a fresh session id.
    ///
    /// The channel also closes when `shutdown` is cancelled.
    #[must_use]
    pub fn new(shutdown: &CancellationToken) -> (Arc<Self>, ChannelEnds) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let close_token = shutdown.child_token();

        let channel = Arc::new(Self {
            session_id: Uuid::new_v4().to_string(),
            events: events_tx,
            inbound: inbound_tx,
            closed: AtomicBool::new(false),
            close_token: close_token.clone(),
            close_callbacks: Mutex::new(Vec::new()),
        });

        let events = EventStream {
            receiver: events_rx,
            closed: Box::pin(close_token.cancelled_owned()),
            channel: Arc::clone(&channel),
        };

        (
            channel,
            ChannelEnds {
                events,
                inbound: inbound_rx,
            },
        )
    }

    /// Session id owned by this channel.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether the underlying connection is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.close_token.is_cancelled()
    }

    /// Write one JSON-RPC message to the client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ChannelClosed` if the connection is gone.
    pub fn send(&self, frame: String) -> Result<()> {
        self.send_event(OutboundEvent::Message(frame))
    }

    /// Write one raw event to the client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ChannelClosed` if the connection is gone.
    pub fn send_event(&self, event: OutboundEvent) -> Result<()> {
        if self.is_closed() {
            return Err(AppError::ChannelClosed(self.session_id.clone()));
        }
        self.events
            .send(event)
            .map_err(|_| AppError::ChannelClosed(self.session_id.clone()))
    }

    /// Queue one raw inbound payload for the attached engine.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ChannelClosed` if the channel is closed or no
    /// engine is consuming its messages.
    pub fn receive(&self, raw: String) -> Result<()> {
        if self.is_closed() {
            return Err(AppError::ChannelClosed(self.session_id.clone()));
        }
        self.inbound
            .send(raw)
            .map_err(|_| AppError::ChannelClosed(self.session_id.clone()))
    }

    /// Register a callback fired exactly once when the channel closes.
    ///
    /// If the channel is already closed the callback runs immediately.
    pub fn on_close(&self, callback: impl FnOnce(&str) + Send + 'static) {
        let mut callbacks = self
            .close_callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.closed.load(Ordering::Acquire) {
            drop(callbacks);
            callback(&self.session_id);
        } else {
            callbacks.push(Box::new(callback));
        }
    }

    /// Close the channel. Subsequent calls are no-ops.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.close_token.cancel();

        let callbacks = std::mem::take(
            &mut *self
                .close_callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        debug!(session_id = %self.session_id, callbacks = callbacks.len(), "channel closed");
        for callback in callbacks {
            callback(&self.session_id);
        }
    }

    /// Resolves once the channel has closed.
    pub async fn closed(&self) {
        self.close_token.cancelled().await;
    }
}

/// Server→client event stream of one channel.
///
/// Ends when the channel closes; dropping it closes the channel.
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<OutboundEvent>,
    closed: Pin<Box<WaitForCancellationFutureOwned>>,
    channel: Arc<StreamingChannel>,
}

impl EventStream {
    /// Channel this stream belongs to.
    #[must_use]
    pub fn channel(&self) -> &Arc<StreamingChannel> {
        &self.channel
    }
}

impl Stream for EventStream {
    type Item = OutboundEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.closed.poll_unpin(cx).is_ready() {
            return Poll::Ready(None);
        }
        this.receiver.poll_recv(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.channel.close();
    }
}
