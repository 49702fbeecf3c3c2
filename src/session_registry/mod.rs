//! SessionRegistry - Anonymous Per-Browser Session State
//!
//! ## Responsibilities
//!
//! - Issue opaque session tokens on first contact
//! - Track per-session deletion sets and session start times
//! - Answer the image visibility question for a session
//!
//! An image is visible to a session iff its capture timestamp is at or
//! after the session start AND the session has not deleted it. Reset
//! moves the start time to now and clears the deletion set; it never
//! restores anything by itself.

use crate::error::{Error, Result};
use crate::metadata_store::ImageRecord;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use uuid::Uuid;

/// State held for one anonymous session
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Filenames this session has deleted
    pub deleted: HashSet<String>,
    /// Epoch seconds marking the start of the visibility window
    pub session_start: i64,
}

/// SessionRegistry instance
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionState>>>,
}

/// Current wall clock as unix seconds
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Resolve a session token, allocating a fresh session when the
    /// token is missing or unknown (e.g. after a server restart).
    ///
    /// Returns the effective session id and whether it was newly issued.
    pub async fn ensure(&self, token: Option<&str>) -> (String, bool) {
        if let Some(token) = token {
            if self.sessions.read().await.contains_key(token) {
                return (token.to_string(), false);
            }
        }

        let session_id = Uuid::new_v4().to_string();
        let state = SessionState {
            deleted: HashSet::new(),
            session_start: now_unix(),
        };
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), state);

        tracing::debug!(session_id = %session_id, "New session issued");
        (session_id, true)
    }

    /// Record a deletion for this session. Idempotent.
    pub async fn record_deletion(&self, session_id: &str, filename: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let state = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::NoSession(format!("Unknown session {}", session_id)))?;
        state.deleted.insert(filename.to_string());
        Ok(())
    }

    /// Whether this session has deleted the filename.
    pub async fn is_deleted(&self, session_id: &str, filename: &str) -> Result<bool> {
        let sessions = self.sessions.read().await;
        let state = sessions
            .get(session_id)
            .ok_or_else(|| Error::NoSession(format!("Unknown session {}", session_id)))?;
        Ok(state.deleted.contains(filename))
    }

    /// Reset the session: start time moves to now, deletion set clears.
    ///
    /// Returns the new start time. Images captured before the reset fall
    /// out of the visibility window regardless of the deletion set.
    pub async fn reset(&self, session_id: &str) -> Result<i64> {
        let mut sessions = self.sessions.write().await;
        let state = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::NoSession(format!("Unknown session {}", session_id)))?;
        state.session_start = now_unix();
        state.deleted.clear();
        Ok(state.session_start)
    }

    /// Start time of the session's visibility window.
    pub async fn session_start(&self, session_id: &str) -> Result<i64> {
        let sessions = self.sessions.read().await;
        let state = sessions
            .get(session_id)
            .ok_or_else(|| Error::NoSession(format!("Unknown session {}", session_id)))?;
        Ok(state.session_start)
    }

    /// Visibility invariant: timestamp within the window and not deleted.
    pub async fn is_visible(
        &self,
        session_id: &str,
        filename: &str,
        record: &ImageRecord,
    ) -> Result<bool> {
        let sessions = self.sessions.read().await;
        let state = sessions
            .get(session_id)
            .ok_or_else(|| Error::NoSession(format!("Unknown session {}", session_id)))?;
        Ok(record.timestamp >= state.session_start && !state.deleted.contains(filename))
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
