//! Assistant conversation sessions.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// System message every session starts with.
pub const SYSTEM_PROMPT: &str = "I am an AI assistant that helps with property-related queries.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

/// One entry of a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// A single conversation session. Clones share state.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    turns: RwLock<Vec<Turn>>,
    last_activity: RwLock<DateTime<Utc>>,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id,
                turns: RwLock::new(vec![Turn::system(SYSTEM_PROMPT)]),
                last_activity: RwLock::new(Utc::now()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn add_user_message(&self, content: impl Into<String>) {
        self.push(Turn::user(content));
    }

    pub fn add_assistant_message(&self, content: impl Into<String>) {
        self.push(Turn::assistant(content));
    }

    fn push(&self, turn: Turn) {
        self.inner
            .turns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(turn);
        self.touch();
    }

    /// Snapshot of the history, system message first.
    #[must_use]
    pub fn history(&self) -> Vec<Turn> {
        self.inner
            .turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.inner
            .turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn touch(&self) {
        *self
            .inner
            .last_activity
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Utc::now();
    }

    /// Check if the session has been idle longer than `timeout`.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        let last = *self
            .inner
            .last_activity
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        // A negative span (clock skew) never expires.
        (Utc::now() - last)
            .to_std()
            .is_ok_and(|idle| idle > timeout)
    }
}

/// Thread-safe store for sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new session with a fresh UUID.
    #[must_use]
    pub fn create(&self) -> Session {
        let session = Session::new(Uuid::new_v4().to_string());
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id().to_string(), session.clone());
        session
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Resolve a client-supplied id. Unknown or missing ids start a new
    /// session rather than adopting the client's value.
    #[must_use]
    pub fn resolve(&self, id: Option<&str>) -> Session {
        id.and_then(|id| self.get(id))
            .unwrap_or_else(|| self.create())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions that have been inactive longer than the timeout.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired_with_timeout(timeout));
        before - guard.len()
    }
}
