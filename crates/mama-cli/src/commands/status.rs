//! Status command showing the active session and its labor pattern.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use mama_core::{
    ContractionSession, LaborAnalysis, Trimester, days_until_due, elapsed_seconds, gestation_week,
};
use mama_db::Database;

use crate::Config;
use crate::commands::util::{due_phrase, format_hms, format_timestamp, user_id, write_analysis};
use crate::pending::{self, PendingState};

/// Everything `--json` reports; the human output renders the same data.
#[derive(Debug, Serialize)]
struct StatusReport {
    user: String,
    session: Option<SessionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gestation: Option<GestationStatus>,
}

#[derive(Debug, Serialize)]
struct SessionStatus {
    session_id: String,
    started_at: DateTime<Utc>,
    elapsed_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    contraction_running_seconds: Option<i64>,
    analysis: LaborAnalysis,
}

#[derive(Debug, Serialize)]
struct GestationStatus {
    week: u32,
    trimester: Trimester,
    days_until_due: i64,
}

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config, json: bool) -> Result<()> {
    run_at(writer, db, config, json, &pending::pending_json_path()?)
}

fn run_at<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    json: bool,
    pending_path: &Path,
) -> Result<()> {
    let session = db.get_active_session_for(&user_id(config)?)?;
    let state = pending::load_from(pending_path)?;
    let report = build_report(config, session.as_ref(), &state, Utc::now());
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write_human(writer, &report)?;
    }
    Ok(())
}

fn build_report(
    config: &Config,
    session: Option<&ContractionSession>,
    state: &PendingState,
    now: DateTime<Utc>,
) -> StatusReport {
    let session = session.map(|s| {
        let session_id = s.id.to_string();
        let running = state
            .contraction
            .as_ref()
            .filter(|tap| tap.session_id == session_id)
            .map(|tap| elapsed_seconds(tap.started_at, now));
        SessionStatus {
            session_id,
            started_at: s.started_at,
            elapsed_seconds: elapsed_seconds(s.started_at, now),
            contraction_running_seconds: running,
            analysis: LaborAnalysis::of(&s.contractions),
        }
    });
    let gestation = config.due_date.map(|due| {
        let today = now.date_naive();
        let week = gestation_week(due, today);
        GestationStatus {
            week,
            trimester: Trimester::from_week(week),
            days_until_due: days_until_due(due, today),
        }
    });
    StatusReport {
        user: config.user.clone(),
        session,
        gestation,
    }
}

fn write_human<W: Write>(writer: &mut W, report: &StatusReport) -> Result<()> {
    if let Some(gestation) = &report.gestation {
        writeln!(
            writer,
            "Week {} ({} trimester), {}.",
            gestation.week,
            gestation.trimester,
            due_phrase(gestation.days_until_due)
        )?;
    }
    match &report.session {
        None => writeln!(writer, "No active labor session.")?,
        Some(session) => {
            writeln!(
                writer,
                "Labor session active for {} (started {}).",
                format_hms(session.elapsed_seconds),
                format_timestamp(session.started_at)
            )?;
            if let Some(running) = session.contraction_running_seconds {
                writeln!(writer, "Contraction running for {}.", format_hms(running))?;
            }
            write_analysis(writer, &session.analysis)?;
        }
    }
    Ok(())
}
