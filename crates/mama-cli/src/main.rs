use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mama_cli::commands::{contraction, kicks, session, status, watch, week};
use mama_cli::{Cli, Commands, Config, ContractionAction, KickAction, SessionAction};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(mama_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = mama_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut stdout = io::stdout();

    match &cli.command {
        Some(Commands::Session { action }) => match action {
            SessionAction::Start => {
                let (db, config) = open_database(cli.config.as_deref())?;
                session::start(&mut stdout, db, &config)?;
            }
            SessionAction::End => {
                let (db, config) = open_database(cli.config.as_deref())?;
                session::end(&mut stdout, db, &config)?;
            }
            SessionAction::List { json } => {
                let (db, config) = open_database(cli.config.as_deref())?;
                session::list(&mut stdout, &db, &config, *json)?;
            }
            SessionAction::Show { id } => {
                let (db, _config) = open_database(cli.config.as_deref())?;
                session::show(&mut stdout, &db, id)?;
            }
            SessionAction::Delete { id, force } => {
                let (mut db, _config) = open_database(cli.config.as_deref())?;
                session::delete(&mut stdout, &mut db, id, *force)?;
            }
        },
        Some(Commands::Contraction { action }) => match action {
            ContractionAction::Start => {
                let (db, config) = open_database(cli.config.as_deref())?;
                contraction::start(&mut stdout, &db, &config)?;
            }
            ContractionAction::Stop { intensity, note } => {
                let (db, config) = open_database(cli.config.as_deref())?;
                contraction::stop(&mut stdout, db, &config, intensity, note.clone())?;
            }
        },
        Some(Commands::Status { json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut stdout, &db, &config, *json)?;
        }
        Some(Commands::Watch) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let runtime =
                tokio::runtime::Runtime::new().context("failed to start async runtime")?;
            runtime.block_on(watch::run(&db, &config))?;
        }
        Some(Commands::Kicks { action }) => match action {
            KickAction::Start => {
                kicks::start(&mut stdout)?;
            }
            KickAction::Add { count } => {
                kicks::add(&mut stdout, *count)?;
            }
            KickAction::Finish { note } => {
                let (mut db, config) = open_database(cli.config.as_deref())?;
                kicks::finish(&mut stdout, &mut db, &config, note.clone())?;
            }
            KickAction::List => {
                let (db, config) = open_database(cli.config.as_deref())?;
                kicks::list(&mut stdout, &db, &config)?;
            }
            KickAction::Delete { id } => {
                let (mut db, _config) = open_database(cli.config.as_deref())?;
                kicks::delete(&mut stdout, &mut db, id)?;
            }
        },
        Some(Commands::Week { due_date }) => {
            let config =
                Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
            week::run(&mut stdout, &config, *due_date)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
