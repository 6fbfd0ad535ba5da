//! Contraction timing commands.
//!
//! `start` records the tap instant in the pending file; nothing is persisted
//! to the database until `stop` completes the contraction. A later `stop`
//! re-adopts the recorded instant into a fresh controller, so the measured
//! duration spans the two invocations exactly.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::Utc;

use mama_core::{ContractionStop, Intensity, SessionController, SystemClock};
use mama_db::Database;

use crate::Config;
use crate::commands::util::{format_hms, format_timestamp, user_id, write_analysis};
use crate::pending::{self, PendingContraction};

pub fn start<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    start_at(writer, db, config, &pending::pending_json_path()?)
}

fn start_at<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    pending_path: &Path,
) -> Result<()> {
    let Some(session) = db.get_active_session_for(&user_id(config)?)? else {
        anyhow::bail!("no active labor session; start one with 'mama session start'");
    };
    let session_id = session.id.to_string();

    pending::update_at(pending_path, |state| {
        match &state.contraction {
            Some(tap) if tap.session_id == session_id => {
                writeln!(
                    writer,
                    "A contraction is already being timed (started {}).",
                    format_timestamp(tap.started_at)
                )?;
            }
            _ => {
                // Overwrites a tap left over from a deleted or closed session.
                state.contraction = Some(PendingContraction {
                    session_id: session_id.clone(),
                    started_at: Utc::now(),
                });
                writeln!(writer, "Contraction started. Stop it with 'mama contraction stop'.")?;
            }
        }
        Ok(())
    })
}

pub fn stop<W: Write>(
    writer: &mut W,
    db: Database,
    config: &Config,
    intensity: &str,
    note: Option<String>,
) -> Result<()> {
    stop_at(writer, db, config, intensity, note, &pending::pending_json_path()?)
}

fn stop_at<W: Write>(
    writer: &mut W,
    db: Database,
    config: &Config,
    intensity: &str,
    note: Option<String>,
    pending_path: &Path,
) -> Result<()> {
    let intensity: Intensity = intensity.parse()?;
    let mut controller = SessionController::new(db, SystemClock, user_id(config)?)?;
    let session_id = controller.active_session().map(|s| s.id.to_string());

    pending::update_at(pending_path, |state| {
        let adopted = state
            .contraction
            .take()
            .filter(|tap| session_id.as_deref() == Some(tap.session_id.as_str()));
        let Some(tap) = adopted else {
            writeln!(writer, "No contraction is being timed.")?;
            return Ok(());
        };

        controller.start_contraction_at(tap.started_at);
        match controller.stop_contraction(intensity, note)? {
            ContractionStop::Stopped {
                contraction,
                analysis,
            } => {
                let duration = contraction.duration_seconds.unwrap_or(0);
                writeln!(
                    writer,
                    "Contraction recorded: {} ({}).",
                    format_hms(duration),
                    contraction.intensity
                )?;
                write_analysis(writer, &analysis)?;
            }
            ContractionStop::NotRunning => {
                writeln!(writer, "No contraction is being timed.")?;
            }
        }
        Ok(())
    })
}
