//! Labor sessions and the contractions recorded inside them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock;
use crate::types::{ContractionId, SessionId, UserId, ValidationError};

/// Perceived strength of a contraction, chosen by the user at stop time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Mild,
    #[default]
    Moderate,
    Strong,
}

impl Intensity {
    /// Returns the string representation for SQL storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
        }
    }
}

impl std::fmt::Display for Intensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Intensity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mild" => Ok(Self::Mild),
            "moderate" => Ok(Self::Moderate),
            "strong" => Ok(Self::Strong),
            _ => Err(ValidationError::InvalidIntensity {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {session_id} is already closed")]
    AlreadyClosed { session_id: SessionId },
    #[error("contraction {contraction_id} is already completed")]
    AlreadyCompleted { contraction_id: ContractionId },
}

/// A single timed contraction.
///
/// A contraction starts open (no end instant, no duration) and is completed
/// exactly once. The duration is frozen at completion from the two recorded
/// instants and never recomputed on read, so a later clock adjustment cannot
/// change what was measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contraction {
    pub id: ContractionId,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    /// Whole-second floor of `ended_at - started_at`, set at completion.
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub intensity: Intensity,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Contraction {
    /// Starts timing a new contraction at `started_at`.
    #[must_use]
    pub fn begin(started_at: DateTime<Utc>) -> Self {
        Self {
            id: ContractionId::generate(),
            started_at,
            ended_at: None,
            duration_seconds: None,
            intensity: Intensity::default(),
            notes: None,
        }
    }

    /// Completes the contraction, freezing its duration.
    ///
    /// Fails if the contraction was already completed. An end instant before
    /// the start clamps the duration to zero instead of going negative.
    pub fn complete(
        mut self,
        ended_at: DateTime<Utc>,
        intensity: Intensity,
        notes: Option<String>,
    ) -> Result<Self, SessionError> {
        if self.is_complete() {
            return Err(SessionError::AlreadyCompleted {
                contraction_id: self.id,
            });
        }
        self.duration_seconds = Some(clock::elapsed_seconds(self.started_at, ended_at));
        self.ended_at = Some(ended_at);
        self.intensity = intensity;
        self.notes = notes;
        Ok(self)
    }

    /// True once the end instant and duration are recorded.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.ended_at.is_some() && self.duration_seconds.is_some()
    }
}

/// A labor session: an append-only run of timed contractions for one user.
///
/// The contraction list is recording order. Appends only; nothing reorders
/// it, and persistence round-trips preserve it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractionSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[serde(default)]
    pub contractions: Vec<Contraction>,
}

impl ContractionSession {
    /// Opens a new active session for `user_id` starting at `started_at`.
    #[must_use]
    pub fn begin(user_id: UserId, started_at: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::generate(),
            user_id,
            started_at,
            ended_at: None,
            is_active: true,
            contractions: Vec::new(),
        }
    }

    /// Appends a contraction at the end of the recording order.
    pub fn push_contraction(&mut self, contraction: Contraction) {
        self.contractions.push(contraction);
    }

    /// Closes the session, stamping `ended_at` exactly once.
    pub fn close(&mut self, ended_at: DateTime<Utc>) -> Result<(), SessionError> {
        if !self.is_active {
            return Err(SessionError::AlreadyClosed {
                session_id: self.id.clone(),
            });
        }
        self.is_active = false;
        self.ended_at = Some(ended_at);
        Ok(())
    }

    /// Number of completed contractions recorded so far.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.contractions.iter().filter(|c| c.is_complete()).count()
    }
}
