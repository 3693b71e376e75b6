//! In-process [`PersistentStore`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::{ExternalChange, PersistentStore};
use crate::error::{StoreError, StoreResult};

#[derive(Debug)]
struct Inner {
    items: BTreeMap<String, String>,
    subscribed: bool,
    pending: Vec<ExternalChange>,
    available: bool,
    reads: u64,
}

/// A map-backed store. Keys enumerate in lexicographic order.
///
/// Clones share state, which lets a test hold on to a handle after moving
/// the store into a [`CachedStorage`](crate::CachedStorage) and then play
/// the part of "another tab" with [`apply_external_set`](Self::apply_external_set)
/// or simulate an outage with [`set_available`](Self::set_available).
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                items: BTreeMap::new(),
                subscribed: false,
                pending: Vec::new(),
                available: true,
                reads: 0,
            })),
        }
    }

    /// Build a store pre-populated with `items`.
    pub fn with_items<K, V>(items: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        {
            let mut inner = store.lock_unchecked();
            for (key, value) in items {
                inner.items.insert(key.into(), value.into());
            }
        }
        store
    }

    /// Number of `get_item` calls served so far.
    pub fn reads(&self) -> u64 {
        self.lock_unchecked().reads
    }

    /// Toggle availability. While unavailable every trait method fails
    /// with [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.lock_unchecked().available = available;
    }

    /// Write a value as if another execution context did it.
    pub fn apply_external_set(&self, key: &str, value: &str) {
        let mut inner = self.lock_unchecked();
        let old_value = inner.items.insert(key.to_string(), value.to_string());
        if inner.subscribed {
            inner.pending.push(ExternalChange {
                key: key.to_string(),
                old_value,
                new_value: Some(value.to_string()),
            });
        }
    }

    /// Remove a value as if another execution context did it.
    pub fn apply_external_remove(&self, key: &str) {
        let mut inner = self.lock_unchecked();
        let old_value = inner.items.remove(key);
        if inner.subscribed && old_value.is_some() {
            inner.pending.push(ExternalChange {
                key: key.to_string(),
                old_value,
                new_value: None,
            });
        }
    }

    fn lock_unchecked(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        let inner = self.lock_unchecked();
        if inner.available {
            Ok(inner)
        } else {
            Err(StoreError::Unavailable("memory store is offline".into()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistentStore for MemoryStore {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        let mut inner = self.lock()?;
        inner.reads += 1;
        Ok(inner.items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        self.lock()?.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.lock()?.items.remove(key);
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.lock()?.items.clear();
        Ok(())
    }

    fn key(&self, index: usize) -> StoreResult<Option<String>> {
        Ok(self.lock()?.items.keys().nth(index).cloned())
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.lock()?.items.len())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.lock()?.items.keys().cloned().collect())
    }

    fn subscribe_external(&self) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if !inner.subscribed {
            debug!("memory store: external change feed enabled");
            inner.subscribed = true;
        }
        Ok(())
    }

    fn take_external_changes(&self) -> StoreResult<Vec<ExternalChange>> {
        Ok(std::mem::take(&mut self.lock()?.pending))
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get_item("a").unwrap(), None);

        store.set_item("a", "1").unwrap();
        assert_eq!(store.get_item("a").unwrap(), Some("1".to_string()));

        store.remove_item("a").unwrap();
        assert_eq!(store.get_item("a").unwrap(), None);
        // Removing again is fine.
        store.remove_item("a").unwrap();
    }

    #[test]
    fn keys_enumerate_in_order() {
        let store = MemoryStore::with_items([("b", "2"), ("a", "1"), ("c", "3")]);
        assert_eq!(store.len().unwrap(), 3);
        assert_eq!(store.key(0).unwrap(), Some("a".to_string()));
        assert_eq!(store.key(3).unwrap(), None);
        assert_eq!(store.keys().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn clear_empties_everything() {
        let store = MemoryStore::with_items([("a", "1"), ("b", "2")]);
        store.clear().unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn external_changes_only_recorded_after_subscribe() {
        let store = MemoryStore::new();
        store.apply_external_set("a", "1");
        assert!(store.take_external_changes().unwrap().is_empty());

        store.subscribe_external().unwrap();
        store.apply_external_set("a", "2");
        store.apply_external_remove("a");
        store.apply_external_remove("missing");

        let changes = store.take_external_changes().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].old_value.as_deref(), Some("1"));
        assert_eq!(changes[0].new_value.as_deref(), Some("2"));
        assert_eq!(changes[1].new_value, None);

        assert!(store.take_external_changes().unwrap().is_empty());
    }

    #[test]
    fn offline_store_fails_every_call() {
        let store = MemoryStore::with_items([("a", "1")]);
        store.set_available(false);

        assert!(store.get_item("a").unwrap_err().is_unavailable());
        assert!(store.set_item("a", "2").is_err());
        assert!(store.keys().is_err());

        store.set_available(true);
        assert_eq!(store.get_item("a").unwrap(), Some("1".to_string()));
    }

    #[test]
    fn reads_are_counted() {
        let store = MemoryStore::new();
        store.get_item("x").unwrap();
        store.get_item("y").unwrap();
        assert_eq!(store.reads(), 2);
    }
}
