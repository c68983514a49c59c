use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use super::state::ConversationState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session store lock poisoned")]
    Poisoned,

    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed storage for conversation state. Swap the in-memory store for a persistent one here.
pub trait SessionStore: Send + Sync {
    fn get(&self, user_id: &str) -> Result<Option<ConversationState>, SessionError>;
    fn put(&self, user_id: &str, state: ConversationState) -> Result<(), SessionError>;
    fn remove(&self, user_id: &str) -> Result<Option<ConversationState>, SessionError>;
}

/// Process-lifetime store. State is lost on restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, ConversationState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, ConversationState>>, SessionError> {
        self.sessions.lock().map_err(|_| SessionError::Poisoned)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|sessions| sessions.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, user_id: &str) -> Result<Option<ConversationState>, SessionError> {
        Ok(self.lock()?.get(user_id).cloned())
    }

    fn put(&self, user_id: &str, state: ConversationState) -> Result<(), SessionError> {
        self.lock()?.insert(user_id.to_string(), state);
        Ok(())
    }

    fn remove(&self, user_id: &str) -> Result<Option<ConversationState>, SessionError> {
        Ok(self.lock()?.remove(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::state::Stage;

    #[test]
    fn test_get_put_remove() -> Result<(), SessionError> {
        let store = InMemorySessionStore::new();
        assert!(store.get("alice")?.is_none());

        let state = ConversationState {
            stage: Stage::OfferRetry,
            ..ConversationState::default()
        };
        store.put("alice", state.clone())?;
        assert_eq!(store.get("alice")?, Some(state.clone()));
        assert!(store.get("bob")?.is_none());
        assert_eq!(store.len(), 1);

        assert_eq!(store.remove("alice")?, Some(state));
        assert!(store.is_empty());
        Ok(())
    }
}
