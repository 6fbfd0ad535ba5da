//! Shared formatting for CLI output.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use mama_core::{LaborAnalysis, UserId};

use crate::Config;

/// The configured user as a validated ID.
pub fn user_id(config: &Config) -> Result<UserId> {
    UserId::new(config.user.as_str()).context("invalid user in configuration")
}

/// Formats whole seconds as `H:MM:SS`, dropping the hour field while zero.
pub fn format_hms(total_seconds: i64) -> String {
    let clamped = total_seconds.max(0);
    let hours = clamped / 3600;
    let minutes = (clamped % 3600) / 60;
    let seconds = clamped % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Formats a mean number of seconds, rounded to the nearest whole second.
#[allow(clippy::cast_possible_truncation)]
pub fn format_mean_seconds(seconds: f64) -> String {
    format_hms(seconds.round() as i64)
}

/// Formats a timestamp for display.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Phrases the signed distance to the due date.
pub fn due_phrase(days: i64) -> String {
    match days {
        0 => "due today".to_string(),
        1 => "1 day until due".to_string(),
        -1 => "1 day overdue".to_string(),
        d if d > 0 => format!("{d} days until due"),
        d => format!("{} days overdue", -d),
    }
}

/// Writes the analysis block shared by stop, status, and session summaries.
pub fn write_analysis<W: Write>(writer: &mut W, analysis: &LaborAnalysis) -> Result<()> {
    writeln!(writer, "Contractions: {}", analysis.completed)?;
    writeln!(
        writer,
        "Average duration: {}",
        format_mean_seconds(analysis.average_duration_seconds)
    )?;
    writeln!(
        writer,
        "Average interval: {}",
        format_mean_seconds(analysis.average_interval_seconds)
    )?;
    writeln!(writer, "Phase: {}", analysis.phase)?;
    if analysis.seek_care {
        writeln!(writer, "Pattern is 5-1-1. Contact your care provider.")?;
    }
    Ok(())
}
