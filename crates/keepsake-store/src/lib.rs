//! # keepsake-store
//!
//! Cached key-value persistence with change notification and versioned
//! data migrations.
//!
//! A [`PersistentStore`] is the store of record (SQLite, or an in-memory
//! map for tests). [`CachedStorage`] sits in front of it with a per-key
//! TTL cache, typed accessors and observers that hear about local writes
//! and about writes made by other connections to the same database.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  TodoList / Filter      (todo domain)    │
//! ├─────────────────────────────────────────┤
//! │  SchemaMigrator  (version-gated runs)    │
//! │  CachedStorage   (TTL cache + typed)     │
//! │  ChangeNotifier  (per-key + wildcard)    │
//! ├─────────────────────────────────────────┤
//! │  PersistentStore: SqliteStore | Memory   │
//! │  Database (rusqlite WAL)                 │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use keepsake_store::{CachedStorage, SchemaMigrator, SqliteStore, StoreConfig, todo};
//!
//! let config = StoreConfig::load("keepsake.toml")?.with_env_overrides()?;
//! let store = SqliteStore::open(&config.db_path)?;
//! let mut storage = CachedStorage::from_config(store, &config);
//!
//! SchemaMigrator::from_config(&config).run_pending(&mut storage, &todo::todo_migrations())?;
//! let mut todos = todo::TodoList::load(&mut storage);
//! todos.add(&mut storage, "water the plants !! #home", chrono::Utc::now())?;
//! ```

pub mod backend;
pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod migration;
pub mod notifier;
pub mod position;
pub mod todo;
mod typed;

// ── re-exports ───────────────────────────────────────────────────────

pub use backend::{ExternalChange, MemoryStore, PersistentStore, SqliteStore};
pub use cache::{CacheStats, CachedStorage};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::StoreConfig;
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use migration::{Migration, MigrationOutcome, SchemaMigrator};
pub use notifier::{
    ChangeNotifier, ChangeOrigin, DispatchReport, ListenerError, ListenerResult, ObserverId,
    StorageEvent,
};
pub use position::{
    Positioned, next_position, normalize_positions, reconcile_positions, sort_by_position,
};
