//! Labor session lifecycle.
//!
//! [`SessionController`] is the single writer for a user's labor session: it
//! owns the in-memory mirror of the active session plus the one contraction
//! currently being timed, and talks to a [`SessionStore`] for everything
//! durable. Commands persist first and mutate memory only after the store
//! call succeeds, so a storage failure leaves the in-memory state exactly as
//! it was.
//!
//! Double-taps are no-ops, not errors: starting a session that is already
//! running, stopping a contraction when none is running, and ending with no
//! session each report what happened and change nothing.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::analytics::LaborAnalysis;
use crate::clock::{self, Clock};
use crate::session::{Contraction, ContractionSession, Intensity};
use crate::store::{SessionStore, StoreError};
use crate::types::{SessionId, UserId};

/// Where the controller currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No active session.
    Idle,
    /// A session is active; no contraction is being timed.
    ContractionIdle,
    /// A session is active and a contraction is being timed.
    ContractionRunning,
}

#[derive(Debug, Error)]
pub enum ControllerError {
    /// The store failed or reported inconsistent state. A failed store
    /// write leaves the in-memory state untouched.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

/// What `start_session` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStart {
    /// A new active session was persisted and mirrored.
    Started { session_id: SessionId },
    /// A session was already active; nothing changed.
    AlreadyActive { session_id: SessionId },
}

/// What `start_contraction` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractionStart {
    /// Timing began at the given instant.
    Started { started_at: DateTime<Utc> },
    /// A contraction was already being timed; its start is unchanged.
    AlreadyRunning { started_at: DateTime<Utc> },
    /// No active session, so there is nothing to time against.
    NoActiveSession,
}

/// What `stop_contraction` did.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractionStop {
    /// The contraction was completed, persisted, and mirrored. The analysis
    /// is recomputed over the full updated event list so callers can alert
    /// on `seek_care` immediately.
    Stopped {
        contraction: Contraction,
        analysis: LaborAnalysis,
    },
    /// No contraction was being timed; nothing changed.
    NotRunning,
}

/// What `end_session` did.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEnd {
    Ended(SessionSummary),
    /// No session was active; nothing changed.
    NoActiveSession,
}

/// Closing snapshot handed back by `end_session`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    /// The closed session, contractions included.
    pub session: ContractionSession,
    pub analysis: LaborAnalysis,
    /// True when a still-open contraction was discarded at close. It was
    /// never persisted; no half-completed event reaches the store.
    pub dropped_open_contraction: bool,
}

/// Drives one user's labor session through its lifecycle.
pub struct SessionController<S, C> {
    store: S,
    clock: C,
    user_id: UserId,
    session: Option<ContractionSession>,
    open_contraction: Option<Contraction>,
}

impl<S: SessionStore, C: Clock> SessionController<S, C> {
    /// Builds a controller for `user_id`, recovering the user's active
    /// session from the store if one survived a previous run.
    ///
    /// Recovery lands in the contraction-idle state: a contraction that was
    /// open when the previous process died was never persisted, so there is
    /// nothing to resume.
    pub fn new(store: S, clock: C, user_id: UserId) -> Result<Self, ControllerError> {
        let session = store.get_active_session(&user_id)?;
        if let Some(session) = &session {
            debug!(
                session_id = %session.id,
                contractions = session.contractions.len(),
                "recovered active session"
            );
        }
        Ok(Self {
            store,
            clock,
            user_id,
            session,
            open_contraction: None,
        })
    }

    pub fn state(&self) -> ControllerState {
        match (&self.session, &self.open_contraction) {
            (None, _) => ControllerState::Idle,
            (Some(_), None) => ControllerState::ContractionIdle,
            (Some(_), Some(_)) => ControllerState::ContractionRunning,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn active_session(&self) -> Option<&ContractionSession> {
        self.session.as_ref()
    }

    pub fn open_contraction(&self) -> Option<&Contraction> {
        self.open_contraction.as_ref()
    }

    /// Analytics over the mirrored session's events; the quiet empty
    /// analysis when no session is active.
    pub fn analysis(&self) -> LaborAnalysis {
        self.session
            .as_ref()
            .map_or_else(|| LaborAnalysis::of(&[]), |s| LaborAnalysis::of(&s.contractions))
    }

    /// Whole seconds since the session started, if one is active.
    pub fn session_elapsed(&self) -> Option<i64> {
        self.session
            .as_ref()
            .map(|s| clock::elapsed_seconds(s.started_at, self.clock.now()))
    }

    /// Whole seconds since the open contraction started, if one is running.
    pub fn contraction_elapsed(&self) -> Option<i64> {
        self.open_contraction
            .as_ref()
            .map(|c| clock::elapsed_seconds(c.started_at, self.clock.now()))
    }

    /// Starts a new labor session now. Idempotent when one is active.
    pub fn start_session(&mut self) -> Result<SessionStart, ControllerError> {
        if let Some(session) = &self.session {
            return Ok(SessionStart::AlreadyActive {
                session_id: session.id.clone(),
            });
        }
        let session = ContractionSession::begin(self.user_id.clone(), self.clock.now());
        self.store.create_session(&session)?;
        debug!(session_id = %session.id, "labor session started");
        let session_id = session.id.clone();
        self.session = Some(session);
        Ok(SessionStart::Started { session_id })
    }

    /// Starts timing a contraction now. Idempotent while one is running.
    pub fn start_contraction(&mut self) -> ContractionStart {
        let now = self.clock.now();
        self.start_contraction_at(now)
    }

    /// Starts timing a contraction at an explicit instant (a UI records the
    /// moment of the tap and may hand it over later).
    ///
    /// The open contraction lives in memory only; nothing is persisted
    /// until it is stopped.
    pub fn start_contraction_at(&mut self, started_at: DateTime<Utc>) -> ContractionStart {
        if self.session.is_none() {
            return ContractionStart::NoActiveSession;
        }
        if let Some(open) = &self.open_contraction {
            return ContractionStart::AlreadyRunning {
                started_at: open.started_at,
            };
        }
        let contraction = Contraction::begin(started_at);
        debug!(contraction_id = %contraction.id, "contraction started");
        self.open_contraction = Some(contraction);
        ContractionStart::Started { started_at }
    }

    /// Completes the open contraction with the chosen intensity, persists
    /// it, and recomputes the analytics.
    ///
    /// On a store failure the contraction stays open and the mirror is
    /// untouched; stopping again later measures to the later instant.
    pub fn stop_contraction(
        &mut self,
        intensity: Intensity,
        notes: Option<String>,
    ) -> Result<ContractionStop, ControllerError> {
        let Some(open) = self.open_contraction.clone() else {
            return Ok(ContractionStop::NotRunning);
        };
        let Some(session_id) = self.session.as_ref().map(|s| s.id.clone()) else {
            return Ok(ContractionStop::NotRunning);
        };
        let ended_at = self.clock.now();
        let Ok(completed) = open.complete(ended_at, intensity, notes) else {
            return Ok(ContractionStop::NotRunning);
        };
        self.store.append_contraction(&session_id, &completed)?;
        self.open_contraction = None;
        if let Some(session) = self.session.as_mut() {
            session.push_contraction(completed.clone());
        }
        let analysis = self.analysis();
        debug!(
            contraction_id = %completed.id,
            duration_seconds = completed.duration_seconds,
            intensity = %completed.intensity,
            "contraction recorded"
        );
        Ok(ContractionStop::Stopped {
            contraction: completed,
            analysis,
        })
    }

    /// Ends the active session, dropping any still-open contraction.
    pub fn end_session(&mut self) -> Result<SessionEnd, ControllerError> {
        let Some(session_id) = self.session.as_ref().map(|s| s.id.clone()) else {
            return Ok(SessionEnd::NoActiveSession);
        };
        let ended_at = self.clock.now();
        self.store.close_session(&session_id, ended_at)?;

        let dropped_open_contraction = self.open_contraction.take().is_some();
        let Some(mut session) = self.session.take() else {
            return Ok(SessionEnd::NoActiveSession);
        };
        session.close(ended_at).map_err(|err| StoreError::Consistency {
            message: format!("session {} mirror diverged at close: {err}", session.id),
        })?;
        let analysis = LaborAnalysis::of(&session.contractions);
        debug!(
            session_id = %session.id,
            contractions = session.contractions.len(),
            dropped_open_contraction,
            "labor session ended"
        );
        Ok(SessionEnd::Ended(SessionSummary {
            session,
            analysis,
            dropped_open_contraction,
        }))
    }
}
