//! Limber CLI - log rehabilitation progress from the terminal
//!
//! Entries are stored locally first; `limber sync` reconciles them with the
//! signed-in account.

mod auth;
mod cli;
mod commands;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::{run_login, run_logout};
use crate::commands::check::run_check;
use crate::commands::common::{load_config, resolve_config_path, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::list::run_list;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config);

    match cli.command {
        Commands::Add { collection, fields } => {
            run_add(collection, fields.as_deref(), &resolve_db_path(cli.db_path)?).await?;
        }
        Commands::List {
            collection,
            pending,
            limit,
            json,
        } => {
            run_list(
                collection,
                pending,
                limit,
                json,
                &resolve_db_path(cli.db_path)?,
            )
            .await?;
        }
        Commands::Status { json } => {
            let config = load_config(config_path.as_deref())?;
            run_status(&config, json, &resolve_db_path(cli.db_path)?).await?;
        }
        Commands::Sync { json, watch } => {
            let config = load_config(config_path.as_deref())?;
            run_sync(&config, json, watch, &resolve_db_path(cli.db_path)?).await?;
        }
        Commands::Login { email, password } => {
            let config = load_config(config_path.as_deref())?;
            run_login(&config, &email, &password).await?;
        }
        Commands::Logout => {
            let config = load_config(config_path.as_deref())?;
            run_logout(&config).await?;
        }
        Commands::Check => {
            let config = load_config(config_path.as_deref())?;
            run_check(&config)?;
        }
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "limber=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
