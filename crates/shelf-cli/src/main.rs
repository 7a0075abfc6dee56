//! Shelf CLI - manage a personal book catalog from the terminal
//!
//! Local-first: every command works against the embedded database, and the
//! `sync` commands reconcile it with a JSON document in a GitHub
//! repository.

mod cli;
mod commands;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::common::resolve_db_path;
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
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shelf_core=info".parse().expect("static directive"))
                .add_directive("shelf_cli=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Add {
            title,
            author,
            fields,
        } => commands::add::run_add(title, author, fields, &db_path).await,
        Commands::List {
            limit,
            category,
            json,
        } => commands::list::run_list(limit, category.as_deref(), json, &db_path).await,
        Commands::Search { query, limit, json } => {
            commands::search::run_search(&query, limit, json, &db_path).await
        }
        Commands::Edit {
            id,
            title,
            author,
            fields,
        } => commands::edit::run_edit(&id, title, author, fields, &db_path).await,
        Commands::Delete { id } => commands::delete::run_delete(&id, &db_path).await,
        Commands::Import { input } => commands::import::run_import(&input, &db_path).await,
        Commands::Export { format, output } => {
            commands::export::run_export(format, output.as_deref(), &db_path).await
        }
        Commands::Sync { command } => commands::sync::run_sync(command, &db_path).await,
        Commands::Config { command } => commands::config::run_config(command, &db_path).await,
        Commands::Completions { shell, output } => {
            commands::completions::run_completions(shell, output.as_deref())
        }
    }
}
