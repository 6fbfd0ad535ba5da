//! Live timer display for the active session.
//!
//! Redraws one status line in place until Ctrl-C. A session-cadence ticker
//! drives the elapsed display once a second; while a contraction is being
//! timed a faster ticker redraws at sub-second cadence. Ticks only trigger
//! re-reading and re-rendering; elapsed values always come from the wall
//! clock, so a delayed tick never skews a duration.
//!
//! State is re-read from the database and the pending file on every redraw,
//! so taps recorded by other invocations show up while watching.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use mama_core::{
    CONTRACTION_TICK, ContractionSession, LaborAnalysis, SESSION_TICK, Ticker, UserId,
    elapsed_seconds,
};
use mama_db::Database;

use crate::Config;
use crate::commands::util::{format_hms, format_mean_seconds, user_id};
use crate::pending::{self, PendingContraction};

enum Tick {
    Session,
    Contraction,
}

/// One rendered frame of the display.
struct WatchLine {
    text: String,
    contraction_running: bool,
}

pub async fn run(db: &Database, config: &Config) -> Result<()> {
    run_at(db, config, &pending::pending_json_path()?).await
}

async fn run_at(db: &Database, config: &Config, pending_path: &Path) -> Result<()> {
    let user_id = user_id(config)?;
    let mut stdout = std::io::stdout();
    writeln!(stdout, "Watching. Press Ctrl-C to stop.")?;

    let (tick_tx, mut tick_rx) = mpsc::channel(16);
    let session_tx = tick_tx.clone();
    let session_ticker = Ticker::spawn(SESSION_TICK, move || {
        let _ = session_tx.try_send(Tick::Session);
    });
    let contraction_ticker = Ticker::spawn(CONTRACTION_TICK, move || {
        let _ = tick_tx.try_send(Tick::Contraction);
    });

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut contraction_running = false;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            tick = tick_rx.recv() => {
                let Some(tick) = tick else { break };
                // Fast-cadence redraws only matter while a contraction is
                // on screen; a session tick picks up a fresh tap soon enough.
                if matches!(tick, Tick::Contraction) && !contraction_running {
                    continue;
                }
                let line = render_now(db, &user_id, pending_path)?;
                contraction_running = line.contraction_running;
                write!(stdout, "\r\x1b[K{}", line.text)?;
                stdout.flush()?;
            }
        }
    }

    session_ticker.shutdown().await;
    contraction_ticker.shutdown().await;
    writeln!(stdout)?;
    Ok(())
}

fn render_now(db: &Database, user_id: &UserId, pending_path: &Path) -> Result<WatchLine> {
    let session = db.get_active_session_for(user_id)?;
    let state = pending::load_from(pending_path)?;
    Ok(render_line(
        session.as_ref(),
        state.contraction.as_ref(),
        Utc::now(),
    ))
}

#[allow(clippy::cast_precision_loss)]
fn render_line(
    session: Option<&ContractionSession>,
    tap: Option<&PendingContraction>,
    now: DateTime<Utc>,
) -> WatchLine {
    let Some(session) = session else {
        return WatchLine {
            text: "No active labor session.".to_string(),
            contraction_running: false,
        };
    };

    let analysis = LaborAnalysis::of(&session.contractions);
    let mut text = format!(
        "Session {} | {} contractions | avg duration {} | avg interval {}",
        format_hms(elapsed_seconds(session.started_at, now)),
        analysis.completed,
        format_mean_seconds(analysis.average_duration_seconds),
        format_mean_seconds(analysis.average_interval_seconds),
    );

    let mut contraction_running = false;
    if let Some(tap) = tap {
        if tap.session_id == session.id.to_string() {
            let millis = (now - tap.started_at).num_milliseconds().max(0);
            text.push_str(&format!(" | contraction {:.1}s", millis as f64 / 1000.0));
            contraction_running = true;
        }
    }
    if analysis.seek_care {
        text.push_str(" | 5-1-1: call your care provider");
    }

    WatchLine {
        text,
        contraction_running,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};

    use mama_core::{Contraction, Intensity, SessionId};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 2, 0, 0).unwrap()
    }

    /// Five completed contractions, 62 s long, starting 250 s apart.
    fn active_fixture() -> ContractionSession {
        let mut session =
            ContractionSession::begin(UserId::new("default").unwrap(), t0());
        session.id = SessionId::new("sess-live").unwrap();
        for i in 0..5 {
            let started_at = t0() + Duration::seconds(i * 250);
            session.push_contraction(
                Contraction::begin(started_at)
                    .complete(
                        started_at + Duration::seconds(62),
                        Intensity::Strong,
                        None,
                    )
                    .unwrap(),
            );
        }
        session
    }

    #[test]
    fn no_session_renders_a_placeholder() {
        let line = render_line(None, None, t0());
        assert_eq!(line.text, "No active labor session.");
        assert!(!line.contraction_running);
    }

    #[test]
    fn session_line_shows_elapsed_and_analysis() {
        let session = active_fixture();
        let line = render_line(Some(&session), None, t0() + Duration::seconds(100));
        assert_eq!(
            line.text,
            "Session 1:40 | 5 contractions | avg duration 1:02 | avg interval 4:10 \
             | 5-1-1: call your care provider"
        );
        assert!(!line.contraction_running);
    }

    #[test]
    fn a_matching_tap_adds_the_running_contraction() {
        let session = active_fixture();
        let now = t0() + Duration::seconds(100);
        let tap = PendingContraction {
            session_id: "sess-live".to_string(),
            started_at: now - Duration::milliseconds(42_300),
        };
        let line = render_line(Some(&session), Some(&tap), now);
        assert!(line.text.contains("| contraction 42.3s"));
        assert!(line.contraction_running);
    }

    #[test]
    fn a_stale_tap_is_ignored() {
        let session = active_fixture();
        let now = t0() + Duration::seconds(100);
        let tap = PendingContraction {
            session_id: "sess-gone".to_string(),
            started_at: now - Duration::seconds(10),
        };
        let line = render_line(Some(&session), Some(&tap), now);
        assert!(!line.text.contains("| contraction "));
        assert!(!line.contraction_running);
    }
}
