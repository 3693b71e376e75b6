//! CLI entry point for keepsake.
//!
//! This binary provides the `keepsake` command with subcommands for
//! migrating stored data, managing todos and inspecting raw values.

mod cli;
mod commands;
mod helpers;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::helpers::{init_tracing, open_storage, resolve_config};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine.
    dotenvy::dotenv().ok();
    init_tracing("warn");

    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref(), cli.db)?;
    let (mut storage, outcome) = open_storage(&config)?;
    let storage = &mut storage;

    match cli.command {
        Commands::Migrate => commands::cmd_migrate(outcome),
        Commands::Add { text } => commands::cmd_add(storage, &text),
        Commands::List { filter } => commands::cmd_list(storage, filter),
        Commands::Toggle { id } => commands::cmd_toggle(storage, &id),
        Commands::Remove { id } => commands::cmd_remove(storage, &id),
        Commands::Edit { id, text } => commands::cmd_edit(storage, &id, &text),
        Commands::Move { source, target } => commands::cmd_move(storage, &source, &target),
        Commands::ClearCompleted => commands::cmd_clear_completed(storage),
        Commands::ToggleAll => commands::cmd_toggle_all(storage),
        Commands::Get { key } => commands::cmd_get(storage, &key),
        Commands::Set { key, value } => commands::cmd_set(storage, &key, &value),
        Commands::Stats => commands::cmd_stats(storage, &config),
        Commands::Watch { interval_ms } => {
            commands::cmd_watch(storage, Duration::from_millis(interval_ms.max(1))).await
        }
    }
}
