//! Version-gated data migrations.
//!
//! The schema version is a non-negative integer persisted under a single
//! key. [`SchemaMigrator::run`] calls the migration body only when the
//! stored version is below the target, and writes the target version only
//! after the body succeeds. A failed body leaves the marker where it was,
//! so the same migration is attempted again on the next startup.

use tracing::{debug, info, warn};

use crate::backend::PersistentStore;
use crate::cache::CachedStorage;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

/// A single step in an ordered migration list.
pub struct Migration<S> {
    /// Version reached once this step has run (1, 2, 3, ...).
    pub version: u32,
    /// Human-readable description.
    pub description: &'static str,
    /// The step body. Receives the version the data is currently at.
    pub apply: fn(&mut CachedStorage<S>, u32) -> StoreResult<()>,
}

/// What a migration run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Data was migrated from `from` to `to`.
    Applied { from: u32, to: u32 },
    /// Nothing to do; the stored version was already `current`.
    UpToDate { current: u32 },
}

/// Runs migrations against a [`CachedStorage`], gated by the persisted
/// schema version.
#[derive(Debug, Clone)]
pub struct SchemaMigrator {
    version_key: String,
}

impl SchemaMigrator {
    pub fn new(version_key: impl Into<String>) -> Self {
        Self {
            version_key: version_key.into(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.schema_version_key.clone())
    }

    pub fn version_key(&self) -> &str {
        &self.version_key
    }

    /// The persisted version, or 0 if none was ever written.
    ///
    /// Read straight from the store: an unreachable store or a malformed
    /// marker is an error rather than a reason to start over from 0.
    pub fn current_version<S: PersistentStore>(&self, storage: &CachedStorage<S>) -> StoreResult<u32> {
        let Some(raw) = storage.store().get_item(&self.version_key)? else {
            return Ok(0);
        };
        raw.trim().parse::<u32>().map_err(|_| StoreError::Migration {
            version: 0,
            message: format!("schema version marker `{}` holds `{raw}`", self.version_key),
        })
    }

    /// Migrate to `target` with `body(storage, from, to)` if the stored
    /// version is lower.
    pub fn run<S, F>(
        &self,
        storage: &mut CachedStorage<S>,
        target: u32,
        body: F,
    ) -> StoreResult<MigrationOutcome>
    where
        S: PersistentStore,
        F: FnOnce(&mut CachedStorage<S>, u32, u32) -> StoreResult<()>,
    {
        let current = self.current_version(storage)?;
        if current >= target {
            debug!(current_version = current, target, "schema is up to date");
            return Ok(MigrationOutcome::UpToDate { current });
        }

        info!(from = current, to = target, "running migration");
        if let Err(err) = body(storage, current, target) {
            warn!(from = current, to = target, %err, "migration failed, version left unchanged");
            storage.invalidate_all();
            return Err(err);
        }

        self.write_version(storage, target)?;
        storage.invalidate_all();
        info!(version = target, "migration applied");
        Ok(MigrationOutcome::Applied {
            from: current,
            to: target,
        })
    }

    /// Apply every step in `steps` newer than the stored version, in
    /// order. The marker advances after each successful step, so a failure
    /// part-way keeps the steps that did succeed.
    pub fn run_pending<S: PersistentStore>(
        &self,
        storage: &mut CachedStorage<S>,
        steps: &[Migration<S>],
    ) -> StoreResult<MigrationOutcome> {
        if let Some(pair) = steps.windows(2).find(|w| w[1].version <= w[0].version) {
            return Err(StoreError::InvalidArgument(format!(
                "migration versions must be strictly increasing: {} then {}",
                pair[0].version, pair[1].version
            )));
        }

        let start = self.current_version(storage)?;
        let pending: Vec<&Migration<S>> = steps.iter().filter(|m| m.version > start).collect();
        if pending.is_empty() {
            debug!(current_version = start, "schema is up to date");
            return Ok(MigrationOutcome::UpToDate { current: start });
        }

        info!(current_version = start, pending = pending.len(), "running pending migrations");

        let mut current = start;
        for step in pending {
            info!(version = step.version, description = step.description, "applying migration");
            if let Err(err) = (step.apply)(storage, current) {
                warn!(version = step.version, %err, "migration failed, version left unchanged");
                storage.invalidate_all();
                return Err(err);
            }
            self.write_version(storage, step.version)?;
            current = step.version;
        }

        storage.invalidate_all();
        info!(new_version = current, "all migrations applied");
        Ok(MigrationOutcome::Applied {
            from: start,
            to: current,
        })
    }

    fn write_version<S: PersistentStore>(
        &self,
        storage: &mut CachedStorage<S>,
        version: u32,
    ) -> StoreResult<()> {
        storage.set_int(&self.version_key, i64::from(version))
    }
}

// ── tests ────────────────────────────────────────────────────────────
