//! Scratch state carried between command invocations.
//!
//! Every `mama` invocation is a separate process, but a running contraction
//! or kick tally spans two of them: one command marks the start, a later one
//! the end. The in-flight piece lives in `pending.json` in the state
//! directory; only completed records reach the database.
//!
//! Mutations run under an exclusive file lock so two concurrent commands
//! cannot interleave a read-modify-write.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use mama_core::KickTally;

/// A contraction started by a previous invocation and not yet stopped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingContraction {
    /// Session the tap belongs to. A tap left over from a session that is no
    /// longer active is stale and gets discarded.
    pub session_id: String,
    pub started_at: DateTime<Utc>,
}

/// In-flight state stored in `pending.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contraction: Option<PendingContraction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kicks: Option<KickTally>,
}

/// Returns the path to pending.json in the state directory.
pub fn pending_json_path() -> Result<PathBuf> {
    let state_dir =
        crate::config::dirs_state_path().context("could not determine state directory")?;
    Ok(state_dir.join("pending.json"))
}

/// Loads pending state from a specific path.
///
/// A missing file reads as empty state.
pub fn load_from(path: &Path) -> Result<PendingState> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let state: PendingState =
                serde_json::from_str(&content).context("failed to parse pending.json")?;
            Ok(state)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PendingState::default()),
        Err(e) => Err(e).context("failed to read pending.json"),
    }
}

/// Writes pending state to a specific path.
fn save_to(path: &Path, state: &PendingState) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create state directory")?;
    }
    let json = serde_json::to_string_pretty(state).context("failed to serialize pending state")?;
    fs::write(path, json).context("failed to write pending.json")?;
    Ok(())
}

/// Loads, mutates, and saves pending state under an exclusive lock.
///
/// If the closure fails the file is left as it was, so a command that
/// cannot persist its result can be retried.
pub fn update_at<T>(path: &Path, f: impl FnOnce(&mut PendingState) -> Result<T>) -> Result<T> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create state directory")?;
    }

    let lock_file =
        File::create(path.with_extension("lock")).context("failed to create lock file")?;
    lock_file
        .lock_exclusive()
        .context("failed to acquire pending state lock")?;

    let mut state = load_from(path)?;
    let result = f(&mut state)?;
    save_to(path, &state)?;
    Ok(result)
}
