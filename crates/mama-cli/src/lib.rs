//! Pregnancy companion CLI library.
//!
//! This crate provides the CLI interface for the mama pregnancy tracker.

mod cli;
pub mod commands;
mod config;
mod pending;

pub use cli::{Cli, Commands, ContractionAction, KickAction, SessionAction};
pub use config::Config;
