//! Labor session lifecycle commands.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use mama_core::{
    LaborAnalysis, SessionController, SessionEnd, SessionId, SessionStart, SystemClock,
};
use mama_db::Database;

use crate::Config;
use crate::commands::util::{format_hms, format_timestamp, user_id, write_analysis};
use crate::pending;

pub fn start<W: Write>(writer: &mut W, db: Database, config: &Config) -> Result<()> {
    let mut controller = SessionController::new(db, SystemClock, user_id(config)?)?;
    match controller.start_session()? {
        SessionStart::Started { session_id } => {
            writeln!(writer, "Labor session started ({session_id}).")?;
            writeln!(writer, "Time contractions with 'mama contraction start'.")?;
        }
        SessionStart::AlreadyActive { session_id } => {
            writeln!(writer, "A labor session is already active ({session_id}).")?;
        }
    }
    Ok(())
}

pub fn end<W: Write>(writer: &mut W, db: Database, config: &Config) -> Result<()> {
    end_at(writer, db, config, &pending::pending_json_path()?)
}

fn end_at<W: Write>(
    writer: &mut W,
    db: Database,
    config: &Config,
    pending_path: &Path,
) -> Result<()> {
    let mut controller = SessionController::new(db, SystemClock, user_id(config)?)?;
    match controller.end_session()? {
        SessionEnd::Ended(summary) => {
            // The tap for a still-open contraction lives in the pending file,
            // not in this process's controller. Clearing it here is what
            // drops an unterminated contraction at session end.
            let session_id = summary.session.id.to_string();
            let dropped = pending::update_at(pending_path, |state| {
                Ok(state
                    .contraction
                    .take()
                    .is_some_and(|p| p.session_id == session_id))
            })?;

            let elapsed = summary
                .session
                .ended_at
                .map_or(0, |end| (end - summary.session.started_at).num_seconds());
            writeln!(writer, "Labor session ended after {}.", format_hms(elapsed))?;
            if dropped || summary.dropped_open_contraction {
                writeln!(writer, "A contraction was still running; it was not recorded.")?;
            }
            write_analysis(writer, &summary.analysis)?;
        }
        SessionEnd::NoActiveSession => {
            writeln!(writer, "No active labor session.")?;
        }
    }
    Ok(())
}

/// One session in `list --json` output, stats included.
#[derive(Debug, Serialize)]
struct SessionListEntry {
    session_id: String,
    started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ended_at: Option<DateTime<Utc>>,
    is_active: bool,
    analysis: LaborAnalysis,
}

pub fn list<W: Write>(writer: &mut W, db: &Database, config: &Config, json: bool) -> Result<()> {
    let sessions = db.list_sessions_for(&user_id(config)?)?;
    if json {
        let entries: Vec<SessionListEntry> = sessions
            .iter()
            .map(|session| SessionListEntry {
                session_id: session.id.to_string(),
                started_at: session.started_at,
                ended_at: session.ended_at,
                is_active: session.is_active,
                analysis: LaborAnalysis::of(&session.contractions),
            })
            .collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&entries)?)?;
        return Ok(());
    }
    if sessions.is_empty() {
        writeln!(writer, "No labor sessions recorded.")?;
        return Ok(());
    }
    for session in sessions {
        let status = if session.is_active {
            "active".to_string()
        } else {
            session.ended_at.map_or_else(
                || "closed".to_string(),
                |end| format_hms((end - session.started_at).num_seconds()),
            )
        };
        writeln!(
            writer,
            "{}  {}  {} contractions  {}",
            session.id,
            format_timestamp(session.started_at),
            session.contractions.len(),
            status
        )?;
    }
    Ok(())
}

pub fn show<W: Write>(writer: &mut W, db: &Database, id: &str) -> Result<()> {
    let session_id = SessionId::new(id).context("invalid session ID")?;
    let session = db.get_session_by_id(&session_id)?;

    writeln!(writer, "Session {}", session.id)?;
    writeln!(writer, "Started: {}", format_timestamp(session.started_at))?;
    match session.ended_at {
        Some(end) => {
            writeln!(writer, "Ended: {}", format_timestamp(end))?;
            writeln!(
                writer,
                "Duration: {}",
                format_hms((end - session.started_at).num_seconds())
            )?;
        }
        None => writeln!(writer, "Still active.")?,
    }

    if !session.contractions.is_empty() {
        writeln!(writer)?;
        for (index, contraction) in session.contractions.iter().enumerate() {
            let duration = contraction
                .duration_seconds
                .map_or_else(|| "open".to_string(), format_hms);
            let note = contraction
                .notes
                .as_deref()
                .map(|n| format!("  ({n})"))
                .unwrap_or_default();
            writeln!(
                writer,
                "{:>3}. {}  {}  {}{}",
                index + 1,
                format_timestamp(contraction.started_at),
                duration,
                contraction.intensity,
                note
            )?;
        }
    }

    writeln!(writer)?;
    write_analysis(writer, &LaborAnalysis::of(&session.contractions))?;
    Ok(())
}

pub fn delete<W: Write>(
    writer: &mut W,
    db: &mut Database,
    id: &str,
    force: bool,
) -> Result<()> {
    delete_at(writer, db, id, force, &pending::pending_json_path()?)
}

fn delete_at<W: Write>(
    writer: &mut W,
    db: &mut Database,
    id: &str,
    force: bool,
    pending_path: &Path,
) -> Result<()> {
    let session_id = SessionId::new(id).context("invalid session ID")?;
    let session = db.get_session_by_id(&session_id)?;
    if session.is_active && !force {
        anyhow::bail!("session {session_id} is still active; pass --force to delete it");
    }

    db.delete_session_by_id(&session_id)?;
    if session.is_active {
        let deleted = session_id.to_string();
        pending::update_at(pending_path, |state| {
            if state
                .contraction
                .as_ref()
                .is_some_and(|p| p.session_id == deleted)
            {
                state.contraction = None;
            }
            Ok(())
        })?;
    }
    writeln!(writer, "Deleted session {session_id}.")?;
    Ok(())
}
