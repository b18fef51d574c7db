//! SynkTank CLI - temporary and permanent memos from the command line
//!
//! Every edit goes through the same debounced autosave engine the other
//! clients use.

mod cli;
mod commands;
mod config;
mod error;

#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::append::run_append;
use crate::commands::common::Session;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::new::run_new;
use crate::commands::promote::{run_finish_promotion, run_promote};
use crate::commands::show::run_show;
use crate::config::resolve_settings;
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

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("synktank=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command.as_ref() else {
        Cli::command().print_help().map_err(CliError::Io)?;
        println!();
        return Ok(());
    };

    let settings = resolve_settings(&cli)?;
    let session = Session::open(&settings)?;

    let (result, warnings) = execute(command, &session).await;
    for warning in warnings {
        eprintln!("{warning}");
    }
    result
}

/// Run one command and collect the warnings it raised, whether or not it
/// succeeded.
async fn execute(command: &Commands, session: &Session) -> (Result<(), CliError>, Vec<String>) {
    let result = match command {
        Commands::New { permanent, content } => run_new(content, *permanent, session).await,
        Commands::List { permanent, json } => run_list(*permanent, *json, session).await,
        Commands::Show { id, permanent } => run_show(id, *permanent, session).await,
        Commands::Edit { id, permanent } => run_edit(id, *permanent, session).await,
        Commands::Append { id, permanent } => run_append(id, *permanent, session).await,
        Commands::Delete { id } => run_delete(id, session).await,
        Commands::Promote { id } => run_promote(id, session).await,
        Commands::FinishPromotion { id } => run_finish_promotion(id, session).await,
    };

    let warnings = session
        .notifier
        .drain()
        .into_iter()
        .map(|message| format!("Warning: {message}"))
        .collect();
    (result, warnings)
}
