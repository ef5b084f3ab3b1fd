//! Game sessions.
//!
//! A session is issued when a game starts (outside this crate) and transitions
//! `active → completed` exactly once, through [`SessionStore::complete`].

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Practice; never ranks.
    Free,
    Ranked,
    Tournament,
}

/// One play attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub session_id: String,
    /// Lowercase wallet address of the owner.
    pub player: String,
    pub game_id: String,
    pub mode: GameMode,
    pub seed: i32,
    /// Unix ms.
    pub started_at: u64,
    pub expires_at: u64,
    pub completed_at: Option<u64>,
    pub final_score: Option<u64>,
    pub verified: bool,
}

impl GameSession {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at
    }

    /// Why `player` may not complete this session at `now_ms`, if anything.
    pub fn check_completable(&self, player: &str, now_ms: u64) -> Result<(), StoreError> {
        if self.player != player {
            return Err(StoreError::SessionNotOwned(self.session_id.clone()));
        }
        if self.is_completed() {
            return Err(StoreError::SessionCompleted(self.session_id.clone()));
        }
        if self.is_expired(now_ms) {
            return Err(StoreError::SessionExpired(self.session_id.clone()));
        }
        Ok(())
    }
}

/// Session persistence.
pub trait SessionStore: Send + Sync {
    fn insert(&self, session: GameSession) -> Result<(), StoreError>;

    fn get(&self, session_id: &str) -> Option<GameSession>;

    /// Conditionally mark a session completed.
    ///
    /// The ownership, completion and expiry checks happen atomically with the
    /// write, so of two concurrent calls for one session at most one succeeds.
    fn complete(
        &self,
        session_id: &str,
        player: &str,
        score: u64,
        verified: bool,
        now_ms: u64,
    ) -> Result<GameSession, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, GameSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, session: GameSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(&session.session_id) {
            return Err(StoreError::DuplicateSession(session.session_id));
        }
        sessions.insert(session.session_id.clone(), session);
        Ok(())
    }

    fn get(&self, session_id: &str) -> Option<GameSession> {
        self.sessions.lock().get(session_id).cloned()
    }

    fn complete(
        &self,
        session_id: &str,
        player: &str,
        score: u64,
        verified: bool,
        now_ms: u64,
    ) -> Result<GameSession, StoreError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;
        session.check_completable(player, now_ms)?;

        session.completed_at = Some(now_ms);
        session.final_score = Some(score);
        session.verified = verified;
        Ok(session.clone())
    }
}
