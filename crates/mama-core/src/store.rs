//! Persistence seams for sessions and kick counts.
//!
//! The traits here are what the lifecycle controller talks to; the SQLite
//! implementation lives in the `mama-db` crate. Test fixtures implement them
//! in memory.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::kicks::KickCount;
use crate::session::{Contraction, ContractionSession};
use crate::types::{KickId, SessionId, UserId};

/// Failures surfaced by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed record does not exist. For contraction appends this
    /// also covers a session that is no longer active: the addressable
    /// target of an append is the active session.
    #[error("not found: {id}")]
    NotFound { id: String },

    /// Close of a session that was already closed.
    #[error("session {session_id} is already closed")]
    AlreadyClosed { session_id: String },

    /// A second active session for the same user was refused.
    #[error("user {user_id} already has an active session")]
    ActiveSessionExists { user_id: String },

    /// The backing data violates an invariant (two active sessions, a
    /// malformed timestamp, a half-completed contraction row).
    #[error("stored data is inconsistent: {message}")]
    Consistency { message: String },

    /// The backend itself failed.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps an arbitrary backend failure.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

/// Storage contract for labor sessions.
///
/// Implementations enforce at most one active session per user and preserve
/// contraction recording order across round-trips. Stored durations are
/// returned as stored, never recomputed on read.
pub trait SessionStore {
    /// All of the user's sessions, newest first by start instant, each with
    /// its contractions in recording order.
    fn list_sessions(&self, user_id: &UserId) -> Result<Vec<ContractionSession>, StoreError>;

    /// The user's single active session with contractions loaded, if any.
    fn get_active_session(
        &self,
        user_id: &UserId,
    ) -> Result<Option<ContractionSession>, StoreError>;

    /// One session by id with contractions loaded.
    fn get_session(&self, session_id: &SessionId) -> Result<ContractionSession, StoreError>;

    /// Persists a new active session. Fails with
    /// [`StoreError::ActiveSessionExists`] if the user already has one.
    fn create_session(&mut self, session: &ContractionSession) -> Result<(), StoreError>;

    /// Appends one completed contraction to an active session. No
    /// reordering; appends land after everything already stored.
    fn append_contraction(
        &mut self,
        session_id: &SessionId,
        contraction: &Contraction,
    ) -> Result<(), StoreError>;

    /// Marks the session closed and stamps its end instant.
    fn close_session(
        &mut self,
        session_id: &SessionId,
        ended_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Removes a session and its contractions. Removing an active session
    /// is permitted at this layer; callers normally close it first.
    fn delete_session(&mut self, session_id: &SessionId) -> Result<(), StoreError>;
}

/// Storage contract for finished kick-counting sittings.
pub trait KickStore {
    /// All of the user's kick counts, newest first by start instant.
    fn list_kick_counts(&self, user_id: &UserId) -> Result<Vec<KickCount>, StoreError>;

    /// Persists one finished sitting.
    fn insert_kick_count(&mut self, record: &KickCount) -> Result<(), StoreError>;

    /// Removes one record by id.
    fn delete_kick_count(&mut self, id: &KickId) -> Result<(), StoreError>;
}
