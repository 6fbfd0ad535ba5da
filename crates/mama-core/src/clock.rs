//! Time sources and elapsed-time arithmetic.
//!
//! Everything below the presentation layer takes "now" from a [`Clock`] or an
//! explicit timestamp, never from `Utc::now()` directly, so tests can inject
//! fixed instants. Elapsed values are always derived from a stored start
//! instant and a fresh clock reading; ticks only trigger re-rendering and are
//! never accumulated, so a delayed or missed tick cannot skew a duration.

use chrono::{DateTime, Utc};

/// A source of the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Whole seconds elapsed since `started_at`, clamped at zero.
///
/// Sub-second remainders are floored. A start instant in the future (clock
/// adjustment, machine resume) yields 0 rather than a negative count.
#[must_use]
pub fn elapsed_seconds(started_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - started_at).num_seconds().max(0)
}
