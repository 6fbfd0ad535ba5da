//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Pregnancy companion.
///
/// Times labor contractions, watches for the 5-1-1 pattern, counts fetal
/// kicks, and tracks gestation progress.
#[derive(Debug, Parser)]
#[command(name = "mama", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage labor sessions.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Time contractions within the active session.
    Contraction {
        #[command(subcommand)]
        action: ContractionAction,
    },

    /// Show the active session and its labor pattern.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Live timer display for the active session.
    Watch,

    /// Count fetal kicks.
    Kicks {
        #[command(subcommand)]
        action: KickAction,
    },

    /// Show gestation week and trimester.
    Week {
        /// Due date to compute against, overriding the configured one.
        #[arg(long, value_name = "YYYY-MM-DD")]
        due_date: Option<NaiveDate>,
    },
}

/// Labor session operations.
#[derive(Debug, Subcommand)]
pub enum SessionAction {
    /// Start a labor session.
    Start,

    /// End the active labor session.
    End,

    /// List recorded sessions.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one session with its contractions.
    Show {
        /// The session ID.
        id: String,
    },

    /// Delete a session and its contractions.
    Delete {
        /// The session ID.
        id: String,

        /// Delete even if the session is still active.
        #[arg(long)]
        force: bool,
    },
}

/// Contraction timing operations.
#[derive(Debug, Subcommand)]
pub enum ContractionAction {
    /// Mark the start of a contraction.
    Start,

    /// Mark the end of the running contraction.
    Stop {
        /// Perceived intensity.
        #[arg(long, default_value = "moderate", value_parser = ["mild", "moderate", "strong"])]
        intensity: String,

        /// Free-form note attached to the contraction.
        #[arg(long)]
        note: Option<String>,
    },
}

/// Kick counting operations.
#[derive(Debug, Subcommand)]
pub enum KickAction {
    /// Start a kick-counting sitting.
    Start,

    /// Record kicks in the running sitting.
    Add {
        /// How many kicks to record.
        #[arg(long, default_value_t = 1)]
        count: u32,
    },

    /// Finish the sitting and save it.
    Finish {
        /// Free-form note attached to the record.
        #[arg(long)]
        note: Option<String>,
    },

    /// List saved kick counts.
    List,

    /// Delete a saved kick count.
    Delete {
        /// The kick count ID.
        id: String,
    },
}
