//! In-memory session store using DashMap.
//!
//! One entry per conversation. The per-session mutex is what serializes a
//! session's inputs: a pipeline run holds the lock, so a second message from
//! the same user waits while other sessions proceed.

use dashmap::DashMap;
use ksi_core::SessionState;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct SessionStore {
    sessions: DashMap<i64, Arc<Mutex<SessionState>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Fetch the session for a chat, creating it on first contact.
    pub fn session(&self, chat_id: i64) -> Arc<Mutex<SessionState>> {
        self.sessions
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(SessionState::new())))
            .clone()
    }

}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_are_created_once_per_chat() {
        let store = SessionStore::new();
        let a = store.session(7);
        let b = store.session(7);
        assert!(Arc::ptr_eq(&a, &b));

        let c = store.session(8);
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
