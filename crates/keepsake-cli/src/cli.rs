//! CLI argument definitions for keepsake.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use keepsake_store::todo::Filter;

/// keepsake -- a cached key-value store with a todo list on top.
#[derive(Parser)]
#[command(
    name = "keepsake",
    version,
    about = "keepsake -- cached key-value store and todo list",
    long_about = "Keeps small pieces of state in a local SQLite file behind a TTL cache, \
                  migrates stored data between schema versions, and manages a todo list."
)]
pub struct Cli {
    /// TOML config file. Defaults to `config/keepsake.toml` when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overriding config and environment.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply pending schema migrations and report the version.
    Migrate,

    /// Add a todo. `!`, `!!`, `!!!` set priority; `#word` adds a tag.
    Add {
        /// Todo text.
        text: String,
    },

    /// List todos.
    List {
        /// all, active, completed or priority. Defaults to the saved filter.
        #[arg(long, short)]
        filter: Option<Filter>,
    },

    /// Flip a todo between active and completed.
    Toggle { id: String },

    /// Delete a todo.
    Remove { id: String },

    /// Replace a todo's text.
    Edit { id: String, text: String },

    /// Move a todo into another todo's slot.
    Move { source: String, target: String },

    /// Delete every completed todo.
    ClearCompleted,

    /// Complete everything, or reopen everything if all are completed.
    ToggleAll,

    /// Print a raw stored value.
    Get { key: String },

    /// Store a raw value.
    Set { key: String, value: String },

    /// Show store and cache statistics.
    Stats,

    /// Print changes made to the database by other processes.
    Watch {
        /// Poll interval in milliseconds.
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
}
