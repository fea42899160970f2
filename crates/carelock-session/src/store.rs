//! In-memory session store.
//!
//! Arena-style owned store behind a narrow interface so an alternative
//! backing (persistent index) can be substituted without touching the
//! lifecycle logic in the manager.

use std::collections::HashMap;

use carelock_types::{SessionId, UserId};

use crate::SessionData;

/// Sessions indexed by session id, with a secondary index by user id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<SessionId, SessionData>,
    user_index: HashMap<UserId, Vec<SessionId>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a session, registering it in the user index.
    pub fn insert(&mut self, session: SessionData) {
        self.user_index
            .entry(session.user_id.clone())
            .or_default()
            .push(session.session_id.clone());
        self.sessions.insert(session.session_id.clone(), session);
    }

    pub fn get(&self, id: &SessionId) -> Option<&SessionData> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut SessionData> {
        self.sessions.get_mut(id)
    }

    /// Removes a session entirely (post-grace purge).
    pub fn remove(&mut self, id: &SessionId) -> Option<SessionData> {
        let session = self.sessions.remove(id)?;
        self.detach_from_user(&session.user_id, id);
        Some(session)
    }

    /// Drops a session id from the user index while keeping the record
    /// itself (used at termination, before the grace purge).
    pub fn detach_from_user(&mut self, user_id: &UserId, id: &SessionId) {
        if let Some(ids) = self.user_index.get_mut(user_id) {
            ids.retain(|existing| existing != id);
            if ids.is_empty() {
                self.user_index.remove(user_id);
            }
        }
    }

    /// Session ids currently indexed for a user.
    pub fn user_session_ids(&self, user_id: &UserId) -> Vec<SessionId> {
        self.user_index.get(user_id).cloned().unwrap_or_default()
    }

    /// Number of users with at least one indexed session.
    pub fn user_count(&self) -> usize {
        self.user_index.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionData> {
        self.sessions.values()
    }
}
