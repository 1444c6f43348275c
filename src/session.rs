//! Session store - per-session dataset handle and conversation history.
//!
//! Operations on one session id are serialized through the session's gate;
//! different sessions run fully in parallel. The store map lock is only held
//! for map access, never across planner or executor calls.

use crate::dataset::DatasetHandle;
use crate::error::{DataRoomError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in session history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

pub struct Session {
    pub id: String,
    pub dataset: Arc<DatasetHandle>,
    history: RwLock<Vec<Turn>>,
    gate: Mutex<()>,
}

impl Session {
    /// Per-session gate. Held for the duration of a chat turn so requests
    /// against the same id are processed in submission order (tokio mutexes
    /// are fair) and history appends never interleave.
    pub fn gate(&self) -> &Mutex<()> {
        &self.gate
    }
}

/// In-memory store, one entry per uploaded dataset.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(&self, dataset: Arc<DatasetHandle>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Session {
            id: id.clone(),
            dataset,
            history: RwLock::new(Vec::new()),
            gate: Mutex::new(()),
        });
        self.sessions.write().await.insert(id.clone(), session);
        id
    }

    pub async fn get(&self, id: &str) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| DataRoomError::NotFound(id.to_string()))
    }

    pub async fn append_turn(&self, id: &str, turn: Turn) -> Result<()> {
        self.append_turns(id, vec![turn]).await
    }

    /// Append a batch of turns in one critical section, so a question/answer
    /// pair lands in history atomically or not at all.
    pub async fn append_turns(&self, id: &str, turns: Vec<Turn>) -> Result<()> {
        let session = self.get(id).await?;
        let mut history = session.history.write().await;
        history.extend(turns);
        Ok(())
    }

    /// Last `n` turns, oldest-first. The full log stays available for
    /// display; this is the bounded window fed to the planner.
    pub async fn recent_history(&self, id: &str, n: usize) -> Result<Vec<Turn>> {
        let session = self.get(id).await?;
        let history = session.history.read().await;
        let start = history.len().saturating_sub(n);
        Ok(history[start..].to_vec())
    }

    pub async fn full_history(&self, id: &str) -> Result<Vec<Turn>> {
        let session = self.get(id).await?;
        let history = session.history.read().await;
        Ok(history.clone())
    }

    pub async fn history_len(&self, id: &str) -> Result<usize> {
        let session = self.get(id).await?;
        let len = session.history.read().await.len();
        Ok(len)
    }

    /// Drop the session, freeing the dataset and history. Unknown ids report
    /// `NotFound`; callers surface that rather than retrying.
    pub async fn reset(&self, id: &str) -> Result<()> {
        self.sessions
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DataRoomError::NotFound(id.to_string()))
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
