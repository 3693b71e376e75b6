//! Persistent key-value backends.
//!
//! [`PersistentStore`] is the synchronous, string-keyed contract the cache
//! sits in front of. Two implementations ship:
//!
//! - [`MemoryStore`]: an in-process map, mainly for tests.
//! - [`SqliteStore`]: a `kv` table in SQLite, shareable across processes.
//!
//! Besides plain get/set, a store exposes a feed of *external* changes,
//! mutations made by some other execution context (another connection,
//! another process). The feed is off until [`PersistentStore::subscribe_external`]
//! is called, so stores pay nothing for it when nobody observes.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreResult;

/// A change to the store made outside this execution context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalChange {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Synchronous string-keyed storage.
pub trait PersistentStore {
    /// Read a value. `Ok(None)` means the key is absent.
    fn get_item(&self, key: &str) -> StoreResult<Option<String>>;

    /// Insert or overwrite a value.
    fn set_item(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete a key. Deleting a missing key is not an error.
    fn remove_item(&self, key: &str) -> StoreResult<()>;

    /// Delete every key.
    fn clear(&self) -> StoreResult<()>;

    /// The key at `index` in the store's enumeration order.
    fn key(&self, index: usize) -> StoreResult<Option<String>>;

    /// Number of stored keys.
    fn len(&self) -> StoreResult<usize>;

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// All keys in enumeration order.
    fn keys(&self) -> StoreResult<Vec<String>> {
        let len = self.len()?;
        let mut keys = Vec::with_capacity(len);
        for index in 0..len {
            if let Some(key) = self.key(index)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    /// Start recording external changes. Idempotent.
    fn subscribe_external(&self) -> StoreResult<()>;

    /// Drain external changes recorded since the previous call, oldest
    /// first. Always empty before [`subscribe_external`](Self::subscribe_external).
    fn take_external_changes(&self) -> StoreResult<Vec<ExternalChange>>;
}
