//! Labor pattern analytics.
//!
//! Pure functions over a session's recorded contractions. Every surface that
//! shows statistics (live timer, status output, past-session review) goes
//! through this module, so live and historical numbers cannot disagree.
//!
//! Only completed contractions participate. An in-progress contraction has
//! no duration yet and is excluded from every aggregate.

use serde::Serialize;

use crate::session::Contraction;

/// Completed contractions needed before a phase is reported at all.
pub const PHASE_MIN_SAMPLES: usize = 3;

/// Average start-to-start gap below this many whole minutes reads as active
/// labor; at or above it, early labor.
pub const ACTIVE_LABOR_BOUNDARY_MINUTES: i64 = 5;

/// The 5-1-1 check looks at this many most recent completed contractions.
pub const CARE_WINDOW: usize = 5;

/// 5-1-1: contractions starting at most this many seconds apart.
pub const CARE_MAX_INTERVAL_SECONDS: f64 = 300.0;

/// 5-1-1: contractions lasting at least this many seconds.
pub const CARE_MIN_DURATION_SECONDS: f64 = 60.0;

/// Coarse labor phase derived from contraction spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaborPhase {
    /// Fewer than [`PHASE_MIN_SAMPLES`] completed contractions recorded.
    InsufficientData,
    EarlyLabor,
    ActiveLabor,
}

impl LaborPhase {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientData => "not enough data",
            Self::EarlyLabor => "early labor",
            Self::ActiveLabor => "active labor",
        }
    }
}

impl std::fmt::Display for LaborPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One consistent snapshot of everything the analytics derive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaborAnalysis {
    /// Completed contractions the numbers below are computed from.
    pub completed: usize,
    /// Mean contraction duration in seconds, 0 with no completed data.
    pub average_duration_seconds: f64,
    /// Mean start-to-start gap in seconds, 0 with fewer than two samples.
    pub average_interval_seconds: f64,
    pub phase: LaborPhase,
    /// The 5-1-1 recommendation: contact the care provider now.
    pub seek_care: bool,
}

impl LaborAnalysis {
    /// Computes the full snapshot for a session's contraction list.
    #[must_use]
    pub fn of(events: &[Contraction]) -> Self {
        Self {
            completed: completed(events).count(),
            average_duration_seconds: average_duration(events),
            average_interval_seconds: average_interval(events),
            phase: classify_phase(events),
            seek_care: should_seek_care(events),
        }
    }
}

fn completed(events: &[Contraction]) -> impl Iterator<Item = &Contraction> {
    events.iter().filter(|c| c.is_complete())
}

/// Mean duration in seconds over completed contractions, 0 if there are none.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn average_duration(events: &[Contraction]) -> f64 {
    let durations: Vec<i64> = completed(events).filter_map(|c| c.duration_seconds).collect();
    if durations.is_empty() {
        return 0.0;
    }
    durations.iter().sum::<i64>() as f64 / durations.len() as f64
}

/// Mean gap in seconds between consecutive completed contractions' start
/// instants, in recording order. 0 with fewer than two completed samples.
///
/// Intervals are start-to-start, not end-to-start: the clinically tracked
/// frequency is how often contractions begin.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn average_interval(events: &[Contraction]) -> f64 {
    let starts: Vec<_> = completed(events).map(|c| c.started_at).collect();
    if starts.len() < 2 {
        return 0.0;
    }
    let total: i64 = starts
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_seconds())
        .sum();
    total as f64 / (starts.len() - 1) as f64
}

/// Classifies the labor phase from contraction spacing.
///
/// Below [`PHASE_MIN_SAMPLES`] completed contractions nothing is claimed.
/// With enough data the average interval is floored to whole minutes and
/// compared against [`ACTIVE_LABOR_BOUNDARY_MINUTES`]: closer together is
/// active labor, further apart is early labor.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn classify_phase(events: &[Contraction]) -> LaborPhase {
    if completed(events).count() < PHASE_MIN_SAMPLES {
        return LaborPhase::InsufficientData;
    }
    let interval_minutes = (average_interval(events) / 60.0).floor() as i64;
    if interval_minutes < ACTIVE_LABOR_BOUNDARY_MINUTES {
        LaborPhase::ActiveLabor
    } else {
        LaborPhase::EarlyLabor
    }
}

/// The 5-1-1 heuristic: should the user contact their care provider now?
///
/// True when the [`CARE_WINDOW`] most recent completed contractions start at
/// most five minutes apart on average and last at least a minute on average.
/// This is a prompt to call, not a diagnosis; fewer than five completed
/// contractions never trigger it.
#[must_use]
pub fn should_seek_care(events: &[Contraction]) -> bool {
    let recent: Vec<Contraction> = completed(events).cloned().collect();
    if recent.len() < CARE_WINDOW {
        return false;
    }
    let window = &recent[recent.len() - CARE_WINDOW..];
    average_interval(window) <= CARE_MAX_INTERVAL_SECONDS
        && average_duration(window) >= CARE_MIN_DURATION_SECONDS
}
