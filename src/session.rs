//! Per-session conversation history
//!
//! The store keeps the externally visible transcript only: one `user` entry
//! and one `assistant` entry per public turn. Tool calls, tool results and
//! handoffs stay inside the run that produced them.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{RelayError, Result};
use crate::items::Message;

/// Session identifier newtype.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Append-only conversation store keyed by session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Full history of a session; empty when the session is unknown.
    async fn get(&self, id: &SessionId) -> Result<Vec<Message>>;

    /// Append one entry. The only mutator.
    async fn append(&self, id: &SessionId, entry: Message) -> Result<()>;
}

/// Process-lifetime store. Appends are serialised per session; distinct
/// sessions never contend on the same lock.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Vec<Message>>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    fn slot(&self, id: &SessionId) -> Arc<Mutex<Vec<Message>>> {
        if let Some(slot) = self.sessions.read().get(id) {
            return slot.clone();
        }
        self.sessions.write().entry(id.clone()).or_default().clone()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &SessionId) -> Result<Vec<Message>> {
        let slot = self.sessions.read().get(id).cloned();
        Ok(slot.map(|s| s.lock().clone()).unwrap_or_default())
    }

    async fn append(&self, id: &SessionId, entry: Message) -> Result<()> {
        if !entry.is_public() {
            return Err(RelayError::SessionError(format!(
                "only user and assistant text entries can be stored, got {:?}",
                entry.role
            )));
        }
        self.slot(id).lock().push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_unknown_session_is_empty() {
        let store = InMemorySessionStore::new();
        let history = store.get(&SessionId::from("nobody")).await.unwrap();
        assert!(history.is_empty());
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new_random();
        store.append(&id, Message::user("hello")).await.unwrap();
        store.append(&id, Message::assistant("hi!")).await.unwrap();

        let history = store.get(&id).await.unwrap();
        assert_eq!(history, vec![Message::user("hello"), Message::assistant("hi!")]);
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = InMemorySessionStore::new();
        let a = SessionId::from("a");
        let b = SessionId::from("b");
        store.append(&a, Message::user("for a")).await.unwrap();

        assert_eq!(store.get(&a).await.unwrap().len(), 1);
        assert!(store.get(&b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_internal_entries_rejected() {
        let store = InMemorySessionStore::new();
        let id = SessionId::from("s");
        let err = store
            .append(&id, Message::tool("payload", "call_1"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::SessionError(_)));
        assert!(store.get(&id).await.unwrap().is_empty());
    }

    #[test]
    fn test_session_id_display() {
        let id = SessionId::from("abc");
        assert_eq!(id.to_string(), "abc");
        assert_eq!(id.as_str(), "abc");
        assert_ne!(SessionId::new_random(), SessionId::new_random());
    }
}
