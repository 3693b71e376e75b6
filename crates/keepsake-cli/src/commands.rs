//! Subcommand handlers.
//!
//! Each handler works on an already migrated [`CachedStorage`] and prints
//! its result to stdout.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use keepsake_store::todo::{Filter, Todo, TodoList};
use keepsake_store::{
    CachedStorage, ListenerResult, MigrationOutcome, SchemaMigrator, SqliteStore, StorageEvent,
    StoreConfig,
};
use tracing::info;

type Storage = CachedStorage<SqliteStore>;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Report what the startup migration did.
pub fn cmd_migrate(outcome: MigrationOutcome) -> Result<()> {
    match outcome {
        MigrationOutcome::Applied { from, to } => println!("  Migrated schema v{from} -> v{to}"),
        MigrationOutcome::UpToDate { current } => println!("  Schema is up to date (v{current})"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Todos
// ---------------------------------------------------------------------------

pub fn cmd_add(storage: &mut Storage, text: &str) -> Result<()> {
    let mut list = TodoList::load(storage);
    let todo = list.add(storage, text, Utc::now()).context("failed to add todo")?;
    println!("  Added {}", describe(&todo));
    Ok(())
}

pub fn cmd_list(storage: &mut Storage, filter: Option<Filter>) -> Result<()> {
    let filter = match filter {
        Some(filter) => {
            filter.save(storage).context("failed to save filter")?;
            filter
        }
        None => Filter::load(storage),
    };
    let list = TodoList::load(storage);

    let mut shown = 0;
    for todo in list.filtered(filter) {
        println!("  {}", describe(todo));
        shown += 1;
    }
    if shown == 0 {
        println!("  (no {filter} todos)");
    }
    println!();
    println!(
        "  {} active, {} completed, {} high priority [filter: {filter}]",
        list.active_count(),
        list.completed_count(),
        list.high_priority_count()
    );
    Ok(())
}

pub fn cmd_toggle(storage: &mut Storage, id: &str) -> Result<()> {
    let mut list = TodoList::load(storage);
    let completed = list.toggle(storage, id).context("failed to toggle todo")?;
    println!("  {id} is now {}", if completed { "completed" } else { "active" });
    Ok(())
}

pub fn cmd_remove(storage: &mut Storage, id: &str) -> Result<()> {
    let mut list = TodoList::load(storage);
    let removed = list.remove(storage, id).context("failed to remove todo")?;
    println!("  Removed {}", describe(&removed));
    Ok(())
}

pub fn cmd_edit(storage: &mut Storage, id: &str, text: &str) -> Result<()> {
    let mut list = TodoList::load(storage);
    list.edit(storage, id, text).context("failed to edit todo")?;
    if let Some(todo) = list.get(id) {
        println!("  Updated {}", describe(todo));
    }
    Ok(())
}

pub fn cmd_move(storage: &mut Storage, source: &str, target: &str) -> Result<()> {
    let mut list = TodoList::load(storage);
    if list.move_item(storage, source, target).context("failed to move todo")? {
        println!("  Moved {source} to the slot of {target}");
    } else {
        println!("  Nothing to move");
    }
    Ok(())
}

pub fn cmd_clear_completed(storage: &mut Storage) -> Result<()> {
    let mut list = TodoList::load(storage);
    let removed = list
        .clear_completed(storage)
        .context("failed to clear completed todos")?;
    println!("  Cleared {removed} completed todo(s)");
    Ok(())
}

pub fn cmd_toggle_all(storage: &mut Storage) -> Result<()> {
    let mut list = TodoList::load(storage);
    let changed = list.toggle_all(storage).context("failed to toggle todos")?;
    println!("  Toggled {changed} todo(s)");
    Ok(())
}

fn describe(todo: &Todo) -> String {
    let mark = if todo.completed { "x" } else { " " };
    let priority = "!".repeat(usize::from(todo.priority));
    let tags: String = todo.tags.iter().map(|t| format!(" #{t}")).collect();
    format!("[{mark}] {} {}{priority}{tags}  ({})", todo.position, todo.text, todo.id)
}

// ---------------------------------------------------------------------------
// Raw values
// ---------------------------------------------------------------------------

pub fn cmd_get(storage: &mut Storage, key: &str) -> Result<()> {
    match storage.get(key) {
        Some(value) => println!("{value}"),
        None => println!("  (not set)"),
    }
    Ok(())
}

pub fn cmd_set(storage: &mut Storage, key: &str, value: &str) -> Result<()> {
    storage
        .set(key, value)
        .with_context(|| format!("failed to set {key}"))?;
    println!("  {key} = {value}");
    Ok(())
}

pub fn cmd_stats(storage: &mut Storage, config: &StoreConfig) -> Result<()> {
    let version = SchemaMigrator::from_config(config)
        .current_version(storage)
        .context("failed to read schema version")?;
    let keys = storage.len().context("failed to count keys")?;
    let list = TodoList::load(storage);

    let summary = serde_json::json!({
        "database": config.db_path.display().to_string(),
        "schema_version": version,
        "keys": keys,
        "cache_ttl_secs": config.cache_ttl_secs,
        "cached_entries": storage.cached_len(),
        "todos": {
            "total": list.len(),
            "active": list.active_count(),
            "completed": list.completed_count(),
            "high_priority": list.high_priority_count(),
        },
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    println!("  cache: {}", storage.stats());
    Ok(())
}

// ---------------------------------------------------------------------------
// Watch
// ---------------------------------------------------------------------------

/// Poll for external changes until Ctrl+C.
pub async fn cmd_watch(storage: &mut Storage, interval: Duration) -> Result<()> {
    storage
        .observe_all(|event: &StorageEvent| -> ListenerResult {
            println!(
                "  {} {}: {} -> {}",
                Utc::now().format("%H:%M:%S"),
                event.key,
                event.old_value.as_deref().unwrap_or("(unset)"),
                event.new_value.as_deref().unwrap_or("(unset)"),
            );
            Ok(())
        })
        .context("failed to subscribe to changes")?;

    println!("  Watching for changes every {}ms. Ctrl+C to stop.", interval.as_millis());
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                storage.sync_external().context("failed to read changes")?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping watch");
                break;
            }
        }
    }
    Ok(())
}
