// src/engine/store.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use super::session::QuizSession;

/// In-memory home for in-progress quiz sessions, keyed by session id.
///
/// `take` hands the session to exactly one caller at a time, which is what
/// gives a session its single owner; a rejected submission puts it back with
/// `put`. Starting a new quiz evicts the player's previous session, so
/// abandoned attempts cannot accumulate.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<Uuid, QuizSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a freshly started session, evicting any earlier session owned by
    /// the same player.
    pub fn insert(&self, session: QuizSession) -> Uuid {
        let id = session.id;
        let player_id = session.player_id;

        let mut sessions = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|_, s| s.player_id != player_id);
        sessions.insert(id, session);
        id
    }

    /// Removes and returns the session, if it exists.
    pub fn take(&self, id: &Uuid) -> Option<QuizSession> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    /// Returns a session taken out earlier, e.g. after a rejected submission.
    pub fn put(&self, session: QuizSession) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id, session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn take_removes_the_session() {
        let store = SessionStore::new();
        let id = store.insert(QuizSession::start(1, Vec::new(), Duration::minutes(5)));

        assert!(store.take(&id).is_some());
        assert!(store.take(&id).is_none());
    }

    #[test]
    fn starting_a_new_quiz_evicts_the_previous_session() {
        let store = SessionStore::new();
        let first = store.insert(QuizSession::start(7, Vec::new(), Duration::minutes(5)));
        let second = store.insert(QuizSession::start(7, Vec::new(), Duration::minutes(5)));

        assert!(store.take(&first).is_none());
        assert!(store.take(&second).is_some());
    }

    #[test]
    fn put_returns_a_taken_session() {
        let store = SessionStore::new();
        let id = store.insert(QuizSession::start(1, Vec::new(), Duration::minutes(5)));

        let session = store.take(&id).unwrap();
        store.put(session);
        assert!(store.take(&id).is_some());
    }
}
