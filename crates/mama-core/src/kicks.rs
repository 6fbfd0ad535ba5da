//! Fetal kick counting.
//!
//! A sitting starts a tally at zero and each perceived movement increments
//! it. Finishing the sitting freezes a record with the elapsed whole minutes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{KickId, UserId};

/// Movements in one sitting that count as meeting the daily goal.
pub const DAILY_KICK_GOAL: u32 = 10;

/// A finished kick-counting sitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KickCount {
    pub id: KickId,
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub count: u32,
    /// Whole-minute floor of `ended_at - started_at`, frozen at finish.
    pub duration_minutes: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl KickCount {
    /// True when the sitting reached [`DAILY_KICK_GOAL`] movements.
    #[must_use]
    pub const fn met_goal(&self) -> bool {
        self.count >= DAILY_KICK_GOAL
    }
}

/// A kick-counting sitting in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KickTally {
    pub started_at: DateTime<Utc>,
    pub count: u32,
}

impl KickTally {
    /// Starts a fresh tally at `started_at`.
    #[must_use]
    pub const fn begin(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            count: 0,
        }
    }

    /// Records one movement.
    pub fn record_kick(&mut self) {
        self.count += 1;
    }

    /// Finishes the sitting at `ended_at`, producing the record to store.
    ///
    /// Duration clamps at zero if the clock moved backwards.
    #[must_use]
    pub fn finish(
        self,
        user_id: UserId,
        ended_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> KickCount {
        KickCount {
            id: KickId::generate(),
            user_id,
            started_at: self.started_at,
            ended_at,
            count: self.count,
            duration_minutes: (ended_at - self.started_at).num_minutes().max(0),
            notes,
        }
    }
}
