//! Upgrade of todo records written before positions, priorities and tags
//! existed.
//!
//! Version 1 records carry only `id`, `text`, `completed` and `createdAt`
//! (which older writers stored as a JSON float). Version 2 adds
//! `position`, `priority` and `tags`. Positions are reassigned from the
//! stored order so the upgraded list always holds `0..n`.

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{TODOS_KEY, Todo};
use crate::backend::PersistentStore;
use crate::cache::CachedStorage;
use crate::error::{StoreError, StoreResult};
use crate::migration::Migration;

/// Schema version produced by [`migrate_legacy_todos`].
pub const TODO_SCHEMA_VERSION: u32 = 2;

/// The ordered todo migration list, for [`crate::SchemaMigrator::run_pending`].
pub fn todo_migrations<S: PersistentStore>() -> Vec<Migration<S>> {
    vec![Migration {
        version: TODO_SCHEMA_VERSION,
        description: "add position, priority and tags to todos",
        apply: upgrade_to_v2::<S>,
    }]
}

fn upgrade_to_v2<S: PersistentStore>(storage: &mut CachedStorage<S>, from: u32) -> StoreResult<()> {
    migrate_legacy_todos(storage, from, TODO_SCHEMA_VERSION)
}

/// Migration body converting loosely typed legacy records into [`Todo`]s.
///
/// Usable directly as the body of [`crate::SchemaMigrator::run`]. Nothing
/// is written unless every record converts, and a failed read of the
/// stored list is an error rather than an empty list.
pub fn migrate_legacy_todos<S: PersistentStore>(
    storage: &mut CachedStorage<S>,
    from: u32,
    to: u32,
) -> StoreResult<()> {
    if from >= TODO_SCHEMA_VERSION || to < TODO_SCHEMA_VERSION {
        debug!(from, to, "todo records need no upgrade");
        return Ok(());
    }

    let Some(raw) = storage.try_get(TODOS_KEY)? else {
        debug!("no stored todos to migrate");
        return Ok(());
    };
    let parsed: Value = serde_json::from_str(&raw).map_err(|e| fail(format!("todos are not JSON: {e}")))?;
    let Value::Array(records) = parsed else {
        return Err(fail("todos are not a JSON array".to_string()));
    };
    if records.is_empty() {
        return Ok(());
    }

    let todos = records
        .iter()
        .enumerate()
        .map(|(index, record)| convert(index, record))
        .collect::<StoreResult<Vec<Todo>>>()?;

    storage.set_json(TODOS_KEY, &todos)?;
    info!(count = todos.len(), from, to, "todo records upgraded");
    Ok(())
}

fn convert(index: usize, record: &Value) -> StoreResult<Todo> {
    let Value::Object(fields) = record else {
        return Err(fail(format!("record {index} is not an object")));
    };

    let id = required(index, fields, "id", |v| v.as_str().map(str::to_string))?;
    let text = required(index, fields, "text", |v| v.as_str().map(str::to_string))?;
    let completed = required(index, fields, "completed", Value::as_bool)?;
    let created_at = required(index, fields, "createdAt", whole_number)?;

    let position = u32::try_from(index)
        .map_err(|_| fail(format!("record {index} is past the last position")))?;
    let priority = fields
        .get("priority")
        .and_then(Value::as_u64)
        .and_then(|p| u8::try_from(p).ok())
        .filter(|p| *p <= 3)
        .unwrap_or(0);
    let tags = fields
        .get("tags")
        .and_then(Value::as_array)
        .and_then(|tags| {
            tags.iter()
                .map(|t| t.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        })
        .unwrap_or_default();

    Ok(Todo {
        id,
        text,
        completed,
        created_at,
        position,
        priority,
        tags,
    })
}

fn required<T>(
    index: usize,
    fields: &Map<String, Value>,
    name: &str,
    extract: impl Fn(&Value) -> Option<T>,
) -> StoreResult<T> {
    match fields.get(name) {
        None => Err(fail(format!("record {index} is missing `{name}`"))),
        Some(value) => extract(value)
            .ok_or_else(|| fail(format!("record {index} has a malformed `{name}`: {value}"))),
    }
}

/// Integers, and floats with no fractional part.
fn whole_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn fail(message: String) -> StoreError {
    StoreError::Migration {
        version: TODO_SCHEMA_VERSION,
        message,
    }
}

// ── tests ────────────────────────────────────────────────────────────
