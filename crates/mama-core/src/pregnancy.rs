//! Gestation progress math.

use chrono::NaiveDate;
use serde::Serialize;

/// Term length the week count is computed against.
pub const FULL_TERM_WEEKS: u32 = 40;

/// Trimester of pregnancy, derived from the gestation week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trimester {
    First,
    Second,
    Third,
}

impl Trimester {
    /// Weeks 1-12 are the first trimester, 13-27 the second, the rest the
    /// third.
    #[must_use]
    pub const fn from_week(week: u32) -> Self {
        if week <= 12 {
            Self::First
        } else if week <= 27 {
            Self::Second
        } else {
            Self::Third
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
            Self::Third => "third",
        }
    }

    /// 1, 2, or 3 for display.
    #[must_use]
    pub const fn number(&self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
        }
    }
}

impl std::fmt::Display for Trimester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current gestation week for a due date, always in `1..=40`.
///
/// The due date marks week 40; the fractional weeks remaining until it are
/// rounded to the nearest whole week. An overdue pregnancy stays at 40 and
/// a due date more than full term away clamps to week 1.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#[must_use]
pub fn gestation_week(due_date: NaiveDate, today: NaiveDate) -> u32 {
    let weeks_left = (due_date - today).num_days() as f64 / 7.0;
    (f64::from(FULL_TERM_WEEKS) - weeks_left)
        .round()
        .clamp(1.0, f64::from(FULL_TERM_WEEKS)) as u32
}

/// Whole days until the due date; negative once overdue.
#[must_use]
pub fn days_until_due(due_date: NaiveDate, today: NaiveDate) -> i64 {
    (due_date - today).num_days()
}
