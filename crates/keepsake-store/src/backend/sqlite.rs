//! SQLite-backed [`PersistentStore`].
//!
//! Values live in a single `kv` table. Several processes may open the same
//! file; changes they commit are picked up through `PRAGMA data_version`
//! and reported as [`ExternalChange`]s by diffing against the last snapshot
//! this store has seen.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tracing::{debug, instrument};

use super::{ExternalChange, PersistentStore};
use crate::db::Database;
use crate::error::{StoreError, StoreResult};

/// Snapshot state kept only once someone subscribed to external changes.
#[derive(Debug)]
struct ExternalTracker {
    data_version: i64,
    snapshot: BTreeMap<String, String>,
}

/// Persistent key-value store on SQLite.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
    tracker: Arc<Mutex<Option<ExternalTracker>>>,
}

impl SqliteStore {
    /// Create a store on top of an open database.
    pub fn new(db: Database) -> Self {
        Self {
            db,
            tracker: Arc::new(Mutex::new(None)),
        }
    }

    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn load_snapshot(&self) -> StoreResult<BTreeMap<String, String>> {
        self.db.execute(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM kv")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            let mut snapshot = BTreeMap::new();
            for row in rows {
                let (key, value): (String, String) = row?;
                snapshot.insert(key, value);
            }
            Ok(snapshot)
        })
    }

    /// Keep the snapshot in step with our own writes so they never come
    /// back as external changes.
    fn track_local(&self, update: impl FnOnce(&mut BTreeMap<String, String>)) -> StoreResult<()> {
        let mut tracker = self
            .tracker
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {e}")))?;
        if let Some(tracker) = tracker.as_mut() {
            update(&mut tracker.snapshot);
        }
        Ok(())
    }
}

impl PersistentStore for SqliteStore {
    #[instrument(level = "debug", skip(self))]
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        self.db.execute(|conn| {
            let value = conn
                .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    #[instrument(level = "debug", skip(self, value))]
    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        let now = Utc::now().timestamp_millis();
        self.db.execute(|conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )?;
            Ok(())
        })?;
        self.track_local(|snapshot| {
            snapshot.insert(key.to_string(), value.to_string());
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.db.execute(|conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
            Ok(())
        })?;
        self.track_local(|snapshot| {
            snapshot.remove(key);
        })
    }

    fn clear(&self) -> StoreResult<()> {
        let deleted = self
            .db
            .execute(|conn| Ok(conn.execute("DELETE FROM kv", [])?))?;
        debug!(deleted, "sqlite store cleared");
        self.track_local(BTreeMap::clear)
    }

    fn key(&self, index: usize) -> StoreResult<Option<String>> {
        let offset = i64::try_from(index)
            .map_err(|_| StoreError::InvalidArgument(format!("key index {index} out of range")))?;
        self.db.execute(|conn| {
            let key = conn
                .query_row(
                    "SELECT key FROM kv ORDER BY key LIMIT 1 OFFSET ?1",
                    params![offset],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(key)
        })
    }

    fn len(&self) -> StoreResult<usize> {
        let count: i64 = self
            .db
            .execute(|conn| Ok(conn.query_row("SELECT count(*) FROM kv", [], |row| row.get(0))?))?;
        usize::try_from(count).map_err(|_| StoreError::Unavailable(format!("bad row count {count}")))
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        self.db.execute(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key")?;
            let keys = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(keys)
        })
    }

    fn subscribe_external(&self) -> StoreResult<()> {
        let mut tracker = self
            .tracker
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {e}")))?;
        if tracker.is_none() {
            let data_version = self.db.data_version()?;
            let snapshot = self.load_snapshot()?;
            debug!(keys = snapshot.len(), data_version, "sqlite store: external change feed enabled");
            *tracker = Some(ExternalTracker {
                data_version,
                snapshot,
            });
        }
        Ok(())
    }

    fn take_external_changes(&self) -> StoreResult<Vec<ExternalChange>> {
        let mut guard = self
            .tracker
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {e}")))?;
        let Some(tracker) = guard.as_mut() else {
            return Ok(Vec::new());
        };

        let data_version = self.db.data_version()?;
        if data_version == tracker.data_version {
            return Ok(Vec::new());
        }

        let current = self.load_snapshot()?;
        let changes = diff_snapshots(&tracker.snapshot, &current);
        debug!(
            changes = changes.len(),
            data_version, "sqlite store: external changes detected"
        );
        tracker.data_version = data_version;
        tracker.snapshot = current;
        Ok(changes)
    }
}

/// Per-key differences between two snapshots, ordered by key.
fn diff_snapshots(
    before: &BTreeMap<String, String>,
    after: &BTreeMap<String, String>,
) -> Vec<ExternalChange> {
    let mut changes: Vec<ExternalChange> = after
        .iter()
        .filter(|(key, value)| before.get(*key) != Some(*value))
        .map(|(key, value)| ExternalChange {
            key: key.clone(),
            old_value: before.get(key).cloned(),
            new_value: Some(value.clone()),
        })
        .collect();

    changes.extend(
        before
            .iter()
            .filter(|(key, _)| !after.contains_key(*key))
            .map(|(key, value)| ExternalChange {
                key: key.clone(),
                old_value: Some(value.clone()),
                new_value: None,
            }),
    );

    changes.sort_by(|a, b| a.key.cmp(&b.key));
    changes
}

// ── tests ────────────────────────────────────────────────────────────
