//! Kick counting commands.
//!
//! The running tally lives in the pending file so kicks can be recorded
//! across invocations; `finish` freezes it into a database record.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

use mama_core::{DAILY_KICK_GOAL, KickId, KickTally};
use mama_db::Database;

use crate::Config;
use crate::commands::util::{format_timestamp, user_id};
use crate::pending;

pub fn start<W: Write>(writer: &mut W) -> Result<()> {
    start_at(writer, &pending::pending_json_path()?)
}

fn start_at<W: Write>(writer: &mut W, pending_path: &Path) -> Result<()> {
    pending::update_at(pending_path, |state| {
        if let Some(tally) = &state.kicks {
            writeln!(
                writer,
                "A kick count is already running ({} kicks since {}).",
                tally.count,
                format_timestamp(tally.started_at)
            )?;
        } else {
            state.kicks = Some(KickTally::begin(Utc::now()));
            writeln!(writer, "Kick counting started. Record kicks with 'mama kicks add'.")?;
        }
        Ok(())
    })
}

pub fn add<W: Write>(writer: &mut W, count: u32) -> Result<()> {
    add_at(writer, count, &pending::pending_json_path()?)
}

fn add_at<W: Write>(writer: &mut W, count: u32, pending_path: &Path) -> Result<()> {
    pending::update_at(pending_path, |state| {
        let Some(tally) = state.kicks.as_mut() else {
            anyhow::bail!("no kick count is running; start one with 'mama kicks start'");
        };
        for _ in 0..count {
            tally.record_kick();
        }
        if tally.count == 1 {
            writeln!(writer, "1 kick so far.")?;
        } else {
            writeln!(writer, "{} kicks so far.", tally.count)?;
        }
        if tally.count >= DAILY_KICK_GOAL {
            writeln!(writer, "Daily goal reached.")?;
        }
        Ok(())
    })
}

pub fn finish<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    note: Option<String>,
) -> Result<()> {
    finish_at(writer, db, config, note, &pending::pending_json_path()?)
}

fn finish_at<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    note: Option<String>,
    pending_path: &Path,
) -> Result<()> {
    let user_id = user_id(config)?;
    pending::update_at(pending_path, |state| {
        let Some(tally) = state.kicks.take() else {
            anyhow::bail!("no kick count is running; start one with 'mama kicks start'");
        };
        let record = tally.finish(user_id, Utc::now(), note);
        db.insert_kick_count_record(&record)?;

        writeln!(
            writer,
            "Recorded {} kicks over {} minutes.",
            record.count, record.duration_minutes
        )?;
        if record.met_goal() {
            writeln!(writer, "Daily goal met.")?;
        } else {
            writeln!(
                writer,
                "{} more kicks would have met the daily goal of {}.",
                DAILY_KICK_GOAL - record.count,
                DAILY_KICK_GOAL
            )?;
        }
        Ok(())
    })
}

pub fn list<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let records = db.list_kick_counts_for(&user_id(config)?)?;
    if records.is_empty() {
        writeln!(writer, "No kick counts recorded.")?;
        return Ok(());
    }
    for record in records {
        let goal = if record.met_goal() { "  goal met" } else { "" };
        writeln!(
            writer,
            "{}  {}  {} kicks in {} min{}",
            record.id,
            format_timestamp(record.started_at),
            record.count,
            record.duration_minutes,
            goal
        )?;
    }
    Ok(())
}

pub fn delete<W: Write>(writer: &mut W, db: &mut Database, id: &str) -> Result<()> {
    let kick_id = KickId::new(id).context("invalid kick count ID")?;
    db.delete_kick_count_by_id(&kick_id)?;
    writeln!(writer, "Deleted kick count {kick_id}.")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};

    use mama_core::{KickCount, UserId};

    fn test_config() -> Config {
        Config {
            database_path: "unused".into(),
            user: "default".to_string(),
            due_date: None,
        }
    }

    #[test]
    fn start_then_add_accumulates_in_the_pending_file() {
        let dir = tempfile::tempdir().unwrap();
        let pending_path = dir.path().join("pending.json");

        let mut output = Vec::new();
        start_at(&mut output, &pending_path).unwrap();
        assert!(
            String::from_utf8(output)
                .unwrap()
                .contains("Kick counting started")
        );

        let mut output = Vec::new();
        add_at(&mut output, 3, &pending_path).unwrap();
        add_at(&mut output, 1, &pending_path).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("3 kicks so far."));
        assert!(text.contains("4 kicks so far."));

        let state = pending::load_from(&pending_path).unwrap();
        assert_eq!(state.kicks.unwrap().count, 4);
    }

    #[test]
    fn second_start_keeps_the_running_tally() {
        let dir = tempfile::tempdir().unwrap();
        let pending_path = dir.path().join("pending.json");

        start_at(&mut Vec::new(), &pending_path).unwrap();
        add_at(&mut Vec::new(), 2, &pending_path).unwrap();

        let mut output = Vec::new();
        start_at(&mut output, &pending_path).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("already running (2 kicks"));

        let state = pending::load_from(&pending_path).unwrap();
        assert_eq!(state.kicks.unwrap().count, 2);
    }

    #[test]
    fn add_without_a_running_tally_fails_with_a_hint() {
        let dir = tempfile::tempdir().unwrap();
        let err = add_at(&mut Vec::new(), 1, &dir.path().join("pending.json")).unwrap_err();
        assert!(err.to_string().contains("mama kicks start"));
    }

    #[test]
    fn reaching_the_goal_is_announced() {
        let dir = tempfile::tempdir().unwrap();
        let pending_path = dir.path().join("pending.json");

        start_at(&mut Vec::new(), &pending_path).unwrap();
        let mut output = Vec::new();
        add_at(&mut output, DAILY_KICK_GOAL, &pending_path).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Daily goal reached."));
    }

    #[test]
    fn finish_saves_a_record_and_clears_the_tally() {
        let dir = tempfile::tempdir().unwrap();
        let pending_path = dir.path().join("pending.json");
        let config = test_config();
        let mut db = Database::open_in_memory().unwrap();

        start_at(&mut Vec::new(), &pending_path).unwrap();
        add_at(&mut Vec::new(), 7, &pending_path).unwrap();

        let mut output = Vec::new();
        finish_at(
            &mut output,
            &mut db,
            &config,
            Some("after dinner".to_string()),
            &pending_path,
        )
        .unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Recorded 7 kicks"));
        assert!(text.contains("3 more kicks would have met the daily goal of 10."));

        let records = db
            .list_kick_counts_for(&UserId::new("default").unwrap())
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].count, 7);
        assert_eq!(records[0].notes.as_deref(), Some("after dinner"));
        assert!(pending::load_from(&pending_path).unwrap().kicks.is_none());
    }

    #[test]
    fn finish_without_a_running_tally_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open_in_memory().unwrap();
        let err = finish_at(
            &mut Vec::new(),
            &mut db,
            &test_config(),
            None,
            &dir.path().join("pending.json"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("no kick count is running"));
    }

    #[test]
    fn list_marks_records_that_met_the_goal() {
        let config = test_config();
        let mut db = Database::open_in_memory().unwrap();
        let user = UserId::new("default").unwrap();
        let t0 = Utc.with_ymd_and_hms(2025, 3, 14, 15, 0, 0).unwrap();

        let mut met = KickTally::begin(t0);
        for _ in 0..10 {
            met.record_kick();
        }
        let mut met = met.finish(user.clone(), t0 + Duration::minutes(20), None);
        met.id = KickId::new("kicks-met").unwrap();
        db.insert_kick_count_record(&met).unwrap();

        let mut short = KickTally::begin(t0 + Duration::hours(4));
        short.record_kick();
        let mut short: KickCount =
            short.finish(user, t0 + Duration::hours(4) + Duration::minutes(45), None);
        short.id = KickId::new("kicks-short").unwrap();
        db.insert_kick_count_record(&short).unwrap();

        let mut output = Vec::new();
        list(&mut output, &db, &config).unwrap();
        let text = String::from_utf8(output).unwrap();
        insta::assert_snapshot!(text, @r"
        kicks-short  2025-03-14 19:00:00  1 kicks in 45 min
        kicks-met  2025-03-14 15:00:00  10 kicks in 20 min  goal met
        ");
    }

    #[test]
    fn delete_removes_the_record() {
        let mut db = Database::open_in_memory().unwrap();
        let user = UserId::new("default").unwrap();
        let t0 = Utc.with_ymd_and_hms(2025, 3, 14, 15, 0, 0).unwrap();

        let mut record = KickTally::begin(t0).finish(user.clone(), t0 + Duration::minutes(5), None);
        record.id = KickId::new("kicks-gone").unwrap();
        db.insert_kick_count_record(&record).unwrap();

        let mut output = Vec::new();
        delete(&mut output, &mut db, "kicks-gone").unwrap();
        assert!(
            String::from_utf8(output)
                .unwrap()
                .contains("Deleted kick count kicks-gone")
        );
        assert!(db.list_kick_counts_for(&user).unwrap().is_empty());
    }
}
