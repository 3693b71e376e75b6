//! Typed accessors over [`CachedStorage`].
//!
//! Values are stored as text: booleans as `true`/`false`, numbers in their
//! shortest decimal form, timestamps as Unix milliseconds and structured
//! values as JSON. Each `get_*` takes a default and never fails; a value
//! that does not parse is logged as malformed and the default is returned.
//! The `try_get_*` forms surface that condition as [`StoreError::Decode`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::backend::PersistentStore;
use crate::cache::CachedStorage;
use crate::error::{StoreError, StoreResult};

impl<S: PersistentStore> CachedStorage<S> {
    // ── bool ─────────────────────────────────────────────────────────

    pub fn try_get_bool(&mut self, key: &str) -> StoreResult<Option<bool>> {
        self.try_get_parsed(key, "a boolean", parse_bool)
    }

    pub fn get_bool(&mut self, key: &str, default: bool) -> bool {
        let result = self.try_get_bool(key);
        or_default(key, result, default)
    }

    pub fn set_bool(&mut self, key: &str, value: bool) -> StoreResult<()> {
        self.set(key, if value { "true" } else { "false" })
    }

    // ── int ──────────────────────────────────────────────────────────

    pub fn try_get_int(&mut self, key: &str) -> StoreResult<Option<i64>> {
        self.try_get_parsed(key, "an integer", |raw| raw.parse().ok())
    }

    pub fn get_int(&mut self, key: &str, default: i64) -> i64 {
        let result = self.try_get_int(key);
        or_default(key, result, default)
    }

    pub fn set_int(&mut self, key: &str, value: i64) -> StoreResult<()> {
        self.set(key, &value.to_string())
    }

    // ── float ────────────────────────────────────────────────────────

    pub fn try_get_float(&mut self, key: &str) -> StoreResult<Option<f64>> {
        self.try_get_parsed(key, "a number", |raw| raw.parse().ok())
    }

    pub fn get_float(&mut self, key: &str, default: f64) -> f64 {
        let result = self.try_get_float(key);
        or_default(key, result, default)
    }

    pub fn set_float(&mut self, key: &str, value: f64) -> StoreResult<()> {
        self.set(key, &value.to_string())
    }

    // ── time ─────────────────────────────────────────────────────────

    /// Read a timestamp stored as Unix milliseconds.
    pub fn try_get_time(&mut self, key: &str) -> StoreResult<Option<DateTime<Utc>>> {
        self.try_get_parsed(key, "a millisecond timestamp", |raw| {
            raw.parse().ok().and_then(DateTime::from_timestamp_millis)
        })
    }

    pub fn get_time(&mut self, key: &str, default: DateTime<Utc>) -> DateTime<Utc> {
        let result = self.try_get_time(key);
        or_default(key, result, default)
    }

    /// Store a timestamp as Unix milliseconds. Sub-millisecond precision
    /// is dropped.
    pub fn set_time(&mut self, key: &str, value: DateTime<Utc>) -> StoreResult<()> {
        self.set(key, &value.timestamp_millis().to_string())
    }

    // ── json ─────────────────────────────────────────────────────────

    pub fn try_get_json<T: DeserializeOwned>(&mut self, key: &str) -> StoreResult<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::decode(key, e.to_string())),
        }
    }

    pub fn get_json<T: DeserializeOwned>(&mut self, key: &str, default: T) -> T {
        let result = self.try_get_json(key);
        or_default(key, result, default)
    }

    /// Serialize `value` and write it. If serialization fails nothing is
    /// written to the store or the cache.
    pub fn set_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> StoreResult<()> {
        let encoded = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.set(key, &encoded)
    }

    fn try_get_parsed<T, F>(&mut self, key: &str, expected: &str, parse: F) -> StoreResult<Option<T>>
    where
        F: FnOnce(&str) -> Option<T>,
    {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => match parse(&raw) {
                Some(value) => Ok(Some(value)),
                None => Err(StoreError::decode(key, format!("expected {expected}, got `{raw}`"))),
            },
        }
    }
}

fn or_default<T>(key: &str, result: StoreResult<Option<T>>, default: T) -> T {
    match result {
        Ok(Some(value)) => value,
        Ok(None) => default,
        Err(err) => {
            warn!(key, %err, "malformed stored value, using default");
            default
        }
    }
}

/// Accepts the usual spellings: `1 t T TRUE true True` and
/// `0 f F FALSE false False`.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

// ── tests ────────────────────────────────────────────────────────────
