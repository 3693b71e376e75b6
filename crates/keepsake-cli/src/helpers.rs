//! Shared helpers: tracing, config resolution and storage startup.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use keepsake_store::{
    CachedStorage, MigrationOutcome, SchemaMigrator, SqliteStore, StoreConfig, todo,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Config file picked up when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config/keepsake.toml";

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default level.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Resolve the store config: file, then `KEEPSAKE_*` environment, then the
/// `--db` flag.
pub fn resolve_config(config_path: Option<&Path>, db_override: Option<PathBuf>) -> Result<StoreConfig> {
    let base = match config_path {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => StoreConfig::load(DEFAULT_CONFIG_PATH)
            .context("failed to load default config")?,
        None => {
            debug!("no config file, using defaults");
            StoreConfig::default()
        }
    };

    let mut config = base
        .with_env_overrides()
        .context("invalid KEEPSAKE_* environment override")?;
    if let Some(db) = db_override {
        config = config.with_db_path(db);
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Open the database and bring its data up to the current schema.
pub fn open_storage(
    config: &StoreConfig,
) -> Result<(CachedStorage<SqliteStore>, MigrationOutcome)> {
    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("failed to open database {}", config.db_path.display()))?;
    let mut storage = CachedStorage::from_config(store, config);

    let outcome = SchemaMigrator::from_config(config)
        .run_pending(&mut storage, &todo::todo_migrations())
        .context("startup migration failed")?;
    info!(?outcome, path = %config.db_path.display(), "storage ready");
    Ok((storage, outcome))
}
