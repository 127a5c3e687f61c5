//! Active session registry for SMD.
//!
//! This module tracks logged-in sessions in process memory. Sessions are
//! not persisted; a restart invalidates every token.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Session-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Session expiry is not in the future.
    #[error("session expired")]
    SessionExpired,

    /// A session with the same ID is already tracked.
    #[error("duplicate session: {0}")]
    DuplicateSession(String),

    /// Session not found.
    #[error("session not found")]
    SessionNotFound,
}

/// Default session duration (24 hours).
pub const DEFAULT_SESSION_DURATION_SECS: u64 = 24 * 60 * 60;

/// Longest session duration accepted from configuration (one year).
pub const MAX_SESSION_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Opaque bearer token with an absolute expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A session binding a user to a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Unique session ID (UUID v4).
    pub id: String,
    /// User ID associated with this session.
    pub user_id: String,
    pub token: AuthToken,
}

impl Session {
    /// Mint a fresh session for `user_id` valid for `duration`.
    pub fn issue(user_id: impl Into<String>, duration: Duration) -> Self {
        // Durations past chrono's range saturate instead of wrapping to now.
        let now = Utc::now();
        let expires_at = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            token: AuthToken {
                token: Uuid::new_v4().to_string(),
                expires_at,
            },
        }
    }

    /// Whether the session is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.token.expires_at <= now
    }

    /// Check if the session has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Process-wide collection of active sessions.
///
/// Every operation takes the lock for its whole duration, so removals never
/// interleave with a concurrent scan.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<Vec<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new session.
    ///
    /// Fails if the session is already expired or its ID is already tracked.
    pub fn add(&self, session: Session) -> Result<(), SessionError> {
        if session.is_expired() {
            return Err(SessionError::SessionExpired);
        }

        let mut sessions = self.sessions.write();
        if sessions.iter().any(|s| s.id == session.id) {
            return Err(SessionError::DuplicateSession(session.id));
        }
        debug!(session_id = %session.id, user_id = %session.user_id, "Session added");
        sessions.push(session);
        Ok(())
    }

    /// Remove every session with the given ID.
    pub fn remove(&self, id: &str) {
        self.sessions.write().retain(|s| s.id != id);
    }

    /// Remove every session carrying the given token.
    pub fn remove_by_token(&self, token: &str) {
        self.sessions.write().retain(|s| s.token.token != token);
    }

    /// Remove every session belonging to the given user.
    pub fn remove_by_user_id(&self, user_id: &str) {
        self.sessions.write().retain(|s| s.user_id != user_id);
    }

    pub fn remove_all(&self) {
        self.sessions.write().clear();
    }

    pub fn get_all(&self) -> Vec<Session> {
        self.sessions.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().iter().find(|s| s.id == id).cloned()
    }

    pub fn get_by_token(&self, token: &str) -> Option<Session> {
        self.sessions
            .read()
            .iter()
            .find(|s| s.token.token == token)
            .cloned()
    }

    /// First session tracked for `user_id`.
    pub fn get_by_user_id(&self, user_id: &str) -> Option<Session> {
        self.sessions
            .read()
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Replace the tracked session with the same ID.
    pub fn update(&self, session: Session) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write();
        let slot = sessions
            .iter_mut()
            .find(|s| s.id == session.id)
            .ok_or(SessionError::SessionNotFound)?;
        *slot = session;
        Ok(())
    }

    /// Whether a session with this ID is already tracked.
    pub fn check_for_duplicate(&self, id: &str) -> bool {
        self.sessions.read().iter().any(|s| s.id == id)
    }

    /// Look up a live session by bearer token.
    pub fn resolve_token(&self, token: &str) -> Option<Session> {
        let now = Utc::now();
        self.sessions
            .read()
            .iter()
            .find(|s| s.token.token == token && !s.is_expired_at(now))
            .cloned()
    }

    /// Evict every expired session. Returns how many were removed.
    pub fn remove_expired_sessions(&self) -> usize {
        self.remove_expired_sessions_at(Utc::now())
    }

    /// Evict every session whose expiry is not after `now`.
    pub fn remove_expired_sessions_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|s| !s.is_expired_at(now));
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, "Swept expired sessions");
        }
        removed
    }
}
