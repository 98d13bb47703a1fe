//! Session registry mapping session ids to live streaming channels.
//!
//! Shared by the `/sse` endpoint (which opens and closes entries) and the
//! `/messages` endpoint (which resolves them). The map sits behind a
//! `std::sync::Mutex`; no lock is held across an `.await`.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::channel::StreamingChannel;
use crate::{AppError, Result};

/// Authoritative `session id → channel` map.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<StreamingChannel>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Arc<StreamingChannel>>> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `channel` under its session id and return that id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Mcp` if a live channel already holds the id.
    pub fn open(&self, channel: Arc<StreamingChannel>) -> Result<String> {
        let session_id = channel.session_id().to_owned();
        match self.sessions().entry(session_id.clone()) {
            Entry::Occupied(_) => Err(AppError::Mcp(format!(
                "session id {session_id} is already live"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(channel);
                debug!(%session_id, "session opened");
                Ok(session_id)
            }
        }
    }

    /// Resolve a session id to its channel.
    #[must_use]
    pub fn lookup(&self, session_id: &str) -> Option<Arc<StreamingChannel>> {
        self.sessions().get(session_id).cloned()
    }

    /// Remove the entry and close its channel. Unknown ids are a no-op.
    pub fn close(&self, session_id: &str) {
        let removed = self.sessions().remove(session_id);
        if let Some(channel) = removed {
            channel.close();
            debug!(%session_id, "session closed");
        }
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    /// Whether no session is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }
}
