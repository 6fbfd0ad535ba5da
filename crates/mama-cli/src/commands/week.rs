//! Gestation progress command.

use std::io::Write;

use anyhow::Result;
use chrono::{NaiveDate, Utc};

use mama_core::{FULL_TERM_WEEKS, Trimester, days_until_due, gestation_week};

use crate::Config;
use crate::commands::util::due_phrase;

pub fn run<W: Write>(writer: &mut W, config: &Config, due_override: Option<NaiveDate>) -> Result<()> {
    run_on(writer, config, due_override, Utc::now().date_naive())
}

fn run_on<W: Write>(
    writer: &mut W,
    config: &Config,
    due_override: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<()> {
    let Some(due_date) = due_override.or(config.due_date) else {
        anyhow::bail!("no due date configured; set due_date in config.toml or MAMA_DUE_DATE");
    };
    let week = gestation_week(due_date, today);
    let trimester = Trimester::from_week(week);
    writeln!(writer, "Week {week} of {FULL_TERM_WEEKS} ({trimester} trimester).")?;
    writeln!(
        writer,
        "Due {due_date} ({}).",
        due_phrase(days_until_due(due_date, today))
    )?;
    Ok(())
}
