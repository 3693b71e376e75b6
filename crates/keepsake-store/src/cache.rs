//! Write-through TTL cache in front of a [`PersistentStore`], using [`moka`].
//!
//! [`CachedStorage`] serves recent reads from memory and forwards every
//! write to the store before touching the cache. Entries expire after a
//! default TTL or a per-key TTL set with [`CachedStorage::set_ttl`]; an
//! expired entry is dropped and the next read goes back to the store.
//! Every mutation is reported to the owned [`ChangeNotifier`].
//!
//! moka enforces each entry's TTL through [`Expiry`]. The deadline is also
//! recorded against the injected [`Clock`] and checked on every read, so
//! expiry follows that clock exactly.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::sync::Cache;
use tracing::{debug, warn};

use crate::backend::PersistentStore;
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::notifier::{
    ChangeNotifier, ChangeOrigin, ListenerResult, ObserverId, StorageEvent,
};

// ── cache stats ──────────────────────────────────────────────────────

/// Counters tracking cache effectiveness.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads answered from memory.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Reads that went to the store.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Entries dropped because their TTL ran out.
    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    /// Total lookups (hits + misses).
    pub fn total(&self) -> u64 {
        self.hits() + self.misses()
    }

    /// Hit rate as a value between 0.0 and 1.0 (returns 0.0 if no lookups).
    pub fn hit_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.hits() as f64 / total as f64
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} expired={} total={} rate={:.2}%",
            self.hits(),
            self.misses(),
            self.expirations(),
            self.total(),
            self.hit_rate() * 100.0,
        )
    }
}

// ── cached storage ───────────────────────────────────────────────────

/// Entries held in memory at most.
pub const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// Longest TTL tracked as a deadline. Longer TTLs never expire.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// A cached copy of one stored value.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    /// `None` never expires.
    ttl: Option<Duration>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: String, ttl: Duration, now: Instant) -> Self {
        let expires_at = if ttl <= MAX_TTL { now.checked_add(ttl) } else { None };
        Self {
            value,
            ttl: expires_at.map(|_| ttl),
            expires_at,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

/// Per-entry expiry: each entry carries its own TTL.
struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// Write-through, TTL-bounded cache over a [`PersistentStore`].
///
/// # Example
///
/// ```ignore
/// use keepsake_store::{CachedStorage, MemoryStore};
///
/// let mut storage = CachedStorage::new(MemoryStore::new(), Duration::from_secs(300));
/// storage.set("greeting", "hello")?;
/// assert_eq!(storage.get("greeting").as_deref(), Some("hello"));
/// ```
pub struct CachedStorage<S> {
    store: S,
    entries: Cache<String, CacheEntry>,
    ttls: HashMap<String, Duration>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
    notifier: ChangeNotifier,
    stats: CacheStats,
}

impl<S: PersistentStore> CachedStorage<S> {
    /// Wrap `store` with the given default TTL and the system clock.
    pub fn new(store: S, default_ttl: Duration) -> Self {
        Self::with_clock(store, default_ttl, Arc::new(SystemClock))
    }

    /// Wrap `store` using the TTL from `config`.
    pub fn from_config(store: S, config: &StoreConfig) -> Self {
        Self::new(store, config.default_ttl())
    }

    /// Wrap `store` with an explicit clock.
    pub fn with_clock(store: S, default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        debug!(default_ttl_ms = default_ttl.as_millis() as u64, "cached storage created");
        Self {
            store,
            entries: Cache::builder()
                .max_capacity(DEFAULT_MAX_CAPACITY)
                .expire_after(EntryExpiry)
                .build(),
            ttls: HashMap::new(),
            default_ttl,
            clock,
            notifier: ChangeNotifier::new(),
            stats: CacheStats::default(),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// The TTL applied when no per-key TTL is set.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Number of entries currently held in memory (live or not yet swept).
    pub fn cached_len(&self) -> usize {
        self.entries.run_pending_tasks();
        self.entries.iter().count()
    }

    /// Read a value, from memory when a live entry exists, otherwise from
    /// the store. A store failure is logged and reads as absent.
    pub fn get(&mut self, key: &str) -> Option<String> {
        self.try_get(key).unwrap_or_else(|err| {
            warn!(key, %err, "store read failed, treating value as absent");
            None
        })
    }

    /// Like [`get`](Self::get), but a store failure is returned.
    pub fn try_get(&mut self, key: &str) -> StoreResult<Option<String>> {
        let now = self.clock.now();

        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                self.stats.record_hit();
                debug!(key, "cache hit");
                return Ok(Some(entry.value));
            }
            self.entries.invalidate(key);
            self.stats.record_expiration();
            debug!(key, "cache entry expired");
        }

        self.stats.record_miss();
        match self.store.get_item(key)? {
            Some(value) => {
                let entry = CacheEntry::new(value.clone(), self.ttl_for(key), now);
                self.entries.insert(key.to_string(), entry);
                debug!(key, "cache miss, populated from store");
                Ok(Some(value))
            }
            None => {
                debug!(key, "cache miss, absent in store");
                Ok(None)
            }
        }
    }

    /// Write `value` through to the store, then cache it and notify.
    ///
    /// The old value reported to observers is read from the store before
    /// the write, not from the cache.
    pub fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        let old_value = self.store.get_item(key)?;
        self.store.set_item(key, value)?;

        let entry = CacheEntry::new(value.to_string(), self.ttl_for(key), self.clock.now());
        self.entries.insert(key.to_string(), entry);
        debug!(key, "cache insert");

        self.dispatch(&StorageEvent::local(key, old_value, Some(value.to_string())));
        Ok(())
    }

    /// Remove `key` from the store and the cache. Observers hear about it
    /// only if the key existed.
    pub fn remove(&mut self, key: &str) -> StoreResult<()> {
        let old_value = self.store.get_item(key)?;
        self.store.remove_item(key)?;
        self.entries.invalidate(key);

        if old_value.is_some() {
            self.dispatch(&StorageEvent::local(key, old_value, None));
        }
        Ok(())
    }

    /// Remove everything from the store and the cache, then notify once
    /// per key that existed.
    pub fn clear(&mut self) -> StoreResult<()> {
        let keys = self.store.keys()?;
        let mut previous = Vec::with_capacity(keys.len());
        for key in keys {
            let old_value = self.store.get_item(&key)?;
            previous.push((key, old_value));
        }

        self.store.clear()?;
        self.entries.invalidate_all();
        debug!(keys = previous.len(), "storage cleared");

        for (key, old_value) in previous {
            self.dispatch(&StorageEvent::local(&key, old_value, None));
        }
        Ok(())
    }

    /// Drop the cached entry for `key`. The store is not touched.
    pub fn invalidate(&mut self, key: &str) {
        self.entries.invalidate(key);
        debug!(key, "cache invalidate");
    }

    /// Drop every cached entry. The store is not touched.
    pub fn invalidate_all(&mut self) {
        self.entries.invalidate_all();
        debug!("cache invalidate_all");
    }

    /// Use `ttl` for `key` from now on, and re-arm its live entry, if any.
    pub fn set_ttl(&mut self, key: &str, ttl: Duration) {
        self.ttls.insert(key.to_string(), ttl);
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(key).filter(|entry| entry.is_live(now)) {
            self.entries
                .insert(key.to_string(), CacheEntry::new(entry.value, ttl, now));
        }
    }

    /// Whether the store holds `key`. Reads through the cache.
    pub fn has_key(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Every key in the store.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        self.store.keys()
    }

    /// Number of keys in the store.
    pub fn len(&self) -> StoreResult<usize> {
        self.store.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> StoreResult<bool> {
        self.store.is_empty()
    }

    // ── observation ──────────────────────────────────────────────────

    /// Register a listener for `key`. The first registration of any kind
    /// wires the store's external change feed.
    pub fn observe<F>(&mut self, key: &str, listener: F) -> StoreResult<ObserverId>
    where
        F: FnMut(&StorageEvent) -> ListenerResult + Send + 'static,
    {
        let id = self.notifier.observe(key, listener);
        self.wire_external()?;
        Ok(id)
    }

    /// Register a listener for every key.
    pub fn observe_all<F>(&mut self, listener: F) -> StoreResult<ObserverId>
    where
        F: FnMut(&StorageEvent) -> ListenerResult + Send + 'static,
    {
        let id = self.notifier.observe_all(listener);
        self.wire_external()?;
        Ok(id)
    }

    /// Pull changes other execution contexts made to the store, evict the
    /// affected cache entries, and dispatch each change to observers.
    ///
    /// Returns the number of changes delivered. Does nothing until someone
    /// has observed.
    pub fn sync_external(&mut self) -> StoreResult<usize> {
        if !self.notifier.is_subscribed() {
            return Ok(0);
        }

        let changes = self.store.take_external_changes()?;
        for change in &changes {
            self.entries.invalidate(change.key.as_str());
            let event = StorageEvent {
                key: change.key.clone(),
                old_value: change.old_value.clone(),
                new_value: change.new_value.clone(),
                origin: ChangeOrigin::External,
            };
            self.dispatch(&event);
        }

        if !changes.is_empty() {
            debug!(changes = changes.len(), "external changes dispatched");
        }
        Ok(changes.len())
    }

    fn wire_external(&mut self) -> StoreResult<()> {
        let store = &self.store;
        self.notifier.ensure_subscribed(|| store.subscribe_external())
    }

    fn dispatch(&mut self, event: &StorageEvent) {
        let report = self.notifier.notify(event);
        if report.failed > 0 {
            debug!(
                key = %event.key,
                delivered = report.delivered,
                failed = report.failed,
                "observers failed during dispatch"
            );
        }
    }

    fn ttl_for(&self, key: &str) -> Duration {
        self.ttls.get(key).copied().unwrap_or(self.default_ttl)
    }
}

impl<S> fmt::Debug for CachedStorage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedStorage")
            .field("entries", &self.entries.entry_count())
            .field("default_ttl", &self.default_ttl)
            .field("notifier", &self.notifier)
            .field("stats", &self.stats)
            .finish()
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::backend::MemoryStore;
    use crate::clock::ManualClock;

    const TTL: Duration = Duration::from_secs(60);

    fn make_storage(store: MemoryStore) -> (CachedStorage<MemoryStore>, ManualClock) {
        let clock = ManualClock::new();
        let storage = CachedStorage::with_clock(store, TTL, Arc::new(clock.clone()));
        (storage, clock)
    }

    fn event_log(storage: &mut CachedStorage<MemoryStore>) -> Arc<Mutex<Vec<StorageEvent>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        storage
            .observe_all(move |event: &StorageEvent| -> ListenerResult {
                sink.lock().unwrap().push(event.clone());
                Ok(())
            })
            .unwrap();
        log
    }

    #[test]
    fn get_serves_from_cache_until_ttl() {
        let store = MemoryStore::with_items([("k", "v")]);
        let (mut storage, clock) = make_storage(store.clone());

        assert_eq!(storage.get("k").as_deref(), Some("v"));
        assert_eq!(store.reads(), 1);

        clock.advance(TTL - Duration::from_millis(1));
        assert_eq!(storage.get("k").as_deref(), Some("v"));
        assert_eq!(store.reads(), 1);

        clock.advance(Duration::from_millis(1));
        assert_eq!(storage.get("k").as_deref(), Some("v"));
        assert_eq!(store.reads(), 2);
        assert_eq!(storage.stats().expirations(), 1);

        // Re-populated entry is live again.
        assert_eq!(storage.get("k").as_deref(), Some("v"));
        assert_eq!(store.reads(), 2);
    }

    #[test]
    fn absent_values_are_not_cached() {
        let store = MemoryStore::new();
        let (mut storage, _clock) = make_storage(store.clone());

        assert_eq!(storage.get("missing"), None);
        assert_eq!(storage.get("missing"), None);
        assert_eq!(store.reads(), 2);
        assert_eq!(storage.cached_len(), 0);
    }

    #[test]
    fn set_writes_through_and_caches() {
        let store = MemoryStore::new();
        let (mut storage, _clock) = make_storage(store.clone());

        storage.set("k", "v").unwrap();
        assert_eq!(store.get_item("k").unwrap(), Some("v".to_string()));

        let reads = store.reads();
        assert_eq!(storage.get("k").as_deref(), Some("v"));
        assert_eq!(store.reads(), reads);
    }

    #[test]
    fn set_reports_old_value_from_store_not_cache() {
        let store = MemoryStore::with_items([("k", "v1")]);
        let (mut storage, _clock) = make_storage(store.clone());
        let log = event_log(&mut storage);

        // Cache now holds v1; another writer moves the store on.
        assert_eq!(storage.get("k").as_deref(), Some("v1"));
        store.set_item("k", "v2").unwrap();

        storage.set("k", "v3").unwrap();

        let events = log.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].old_value.as_deref(), Some("v2"));
        assert_eq!(events[0].new_value.as_deref(), Some("v3"));
        assert_eq!(events[0].origin, ChangeOrigin::Local);
    }

    #[test]
    fn last_write_wins_in_store_and_cache() {
        let store = MemoryStore::new();
        let (mut storage, _clock) = make_storage(store.clone());

        storage.set("k", "first").unwrap();
        storage.set("k", "second").unwrap();

        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("second"));
        assert_eq!(storage.get("k").as_deref(), Some("second"));
    }

    #[test]
    fn failed_write_leaves_cache_untouched() {
        let store = MemoryStore::with_items([("k", "v")]);
        let (mut storage, _clock) = make_storage(store.clone());
        assert_eq!(storage.get("k").as_deref(), Some("v"));

        store.set_available(false);
        let err = storage.set("k", "new").unwrap_err();
        assert!(err.is_unavailable());

        // Still served from the live entry, still the old value.
        assert_eq!(storage.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn unavailable_store_reads_as_absent() {
        let store = MemoryStore::with_items([("k", "v")]);
        let (mut storage, _clock) = make_storage(store.clone());

        store.set_available(false);
        assert_eq!(storage.get("k"), None);
    }

    #[test]
    fn try_get_surfaces_store_failure() {
        let store = MemoryStore::with_items([("k", "v")]);
        let (mut storage, _clock) = make_storage(store.clone());

        store.set_available(false);
        assert!(storage.try_get("k").unwrap_err().is_unavailable());

        store.set_available(true);
        assert_eq!(storage.try_get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn remove_evicts_and_notifies_existing_keys_only() {
        let store = MemoryStore::with_items([("k", "v")]);
        let (mut storage, _clock) = make_storage(store.clone());
        let log = event_log(&mut storage);

        storage.get("k");
        storage.remove("k").unwrap();
        storage.remove("never-there").unwrap();

        assert_eq!(storage.get("k"), None);
        assert_eq!(store.get_item("k").unwrap(), None);

        let events = log.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].old_value.as_deref(), Some("v"));
        assert_eq!(events[0].new_value, None);
    }

    #[test]
    fn clear_notifies_once_per_existing_key() {
        let store = MemoryStore::with_items([("k1", "a"), ("k2", "b")]);
        let (mut storage, _clock) = make_storage(store.clone());
        let log = event_log(&mut storage);

        storage.clear().unwrap();

        assert!(store.is_empty().unwrap());
        assert_eq!(storage.cached_len(), 0);

        let events = log.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].key, "k1");
        assert_eq!(events[0].old_value.as_deref(), Some("a"));
        assert_eq!(events[1].key, "k2");
        assert_eq!(events[1].old_value.as_deref(), Some("b"));
        assert!(events.iter().all(|e| e.new_value.is_none()));
    }

    #[test]
    fn invalidate_forces_reread_without_notifying() {
        let store = MemoryStore::with_items([("k", "v")]);
        let (mut storage, _clock) = make_storage(store.clone());
        let log = event_log(&mut storage);

        storage.get("k");
        store.set_item("k", "changed").unwrap();
        assert_eq!(storage.get("k").as_deref(), Some("v"));

        storage.invalidate("k");
        assert_eq!(storage.get("k").as_deref(), Some("changed"));

        storage.invalidate_all();
        assert_eq!(storage.cached_len(), 0);
        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("changed"));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn per_key_ttl_overrides_default() {
        let store = MemoryStore::with_items([("short", "s"), ("long", "l")]);
        let (mut storage, clock) = make_storage(store.clone());
        storage.set_ttl("short", Duration::from_secs(1));

        storage.get("short");
        storage.get("long");
        assert_eq!(store.reads(), 2);

        clock.advance(Duration::from_secs(2));
        storage.get("short");
        storage.get("long");
        assert_eq!(store.reads(), 3);
    }

    #[test]
    fn set_ttl_rearms_live_entry() {
        let store = MemoryStore::with_items([("k", "v")]);
        let (mut storage, clock) = make_storage(store.clone());

        storage.get("k");
        clock.advance(Duration::from_secs(50));
        storage.set_ttl("k", Duration::from_secs(30));
        clock.advance(Duration::from_secs(20));

        // 70s after population, but only 20s after re-arming.
        storage.get("k");
        assert_eq!(store.reads(), 1);
    }

    #[test]
    fn huge_default_ttl_never_expires() {
        let store = MemoryStore::with_items([("k", "v")]);
        let clock = ManualClock::new();
        let huge = Duration::from_secs(u64::MAX);
        let mut storage = CachedStorage::with_clock(store.clone(), huge, Arc::new(clock.clone()));

        assert_eq!(storage.get("k").as_deref(), Some("v"));
        clock.advance(MAX_TTL);
        assert_eq!(storage.get("k").as_deref(), Some("v"));
        assert_eq!(store.reads(), 1);
        assert_eq!(storage.stats().expirations(), 0);

        storage.set("k", "w").unwrap();
        assert_eq!(storage.get("k").as_deref(), Some("w"));
    }

    #[test]
    fn set_ttl_accepts_duration_max() {
        let store = MemoryStore::with_items([("k", "v")]);
        let (mut storage, clock) = make_storage(store.clone());

        storage.get("k");
        storage.set_ttl("k", Duration::MAX);
        clock.advance(TTL * 10);
        assert_eq!(storage.get("k").as_deref(), Some("v"));
        assert_eq!(store.reads(), 1);
    }

    #[test]
    fn failing_observer_does_not_fail_the_write() {
        let store = MemoryStore::new();
        let (mut storage, _clock) = make_storage(store.clone());
        let log = Arc::new(Mutex::new(Vec::new()));

        storage
            .observe("k", |_: &StorageEvent| -> ListenerResult { Err("boom".into()) })
            .unwrap();
        let sink = Arc::clone(&log);
        storage
            .observe("k", move |event: &StorageEvent| -> ListenerResult {
                sink.lock().unwrap().push(event.new_value.clone());
                Ok(())
            })
            .unwrap();

        storage.set("k", "v").unwrap();
        storage.remove("k").unwrap();

        assert_eq!(*log.lock().unwrap(), vec![Some("v".to_string()), None]);
        assert_eq!(store.get_item("k").unwrap(), None);
    }

    #[test]
    fn key_listeners_run_in_registration_order_once() {
        let store = MemoryStore::new();
        let (mut storage, _clock) = make_storage(store);
        let log = Arc::new(Mutex::new(Vec::new()));

        for name in ["L1", "L2"] {
            let sink = Arc::clone(&log);
            storage
                .observe("k", move |_: &StorageEvent| -> ListenerResult {
                    sink.lock().unwrap().push(name);
                    Ok(())
                })
                .unwrap();
        }

        storage.set("k", "v").unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["L1", "L2"]);
    }

    #[test]
    fn sync_external_is_inert_without_observers() {
        let store = MemoryStore::new();
        let (mut storage, _clock) = make_storage(store.clone());

        store.apply_external_set("k", "v");
        assert_eq!(storage.sync_external().unwrap(), 0);
    }

    #[test]
    fn sync_external_evicts_and_dispatches() {
        let store = MemoryStore::with_items([("k", "v1")]);
        let (mut storage, _clock) = make_storage(store.clone());
        let log = event_log(&mut storage);

        assert_eq!(storage.get("k").as_deref(), Some("v1"));
        store.apply_external_set("k", "v2");

        assert_eq!(storage.sync_external().unwrap(), 1);
        assert_eq!(storage.get("k").as_deref(), Some("v2"));

        let events = log.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].origin, ChangeOrigin::External);
        assert_eq!(events[0].old_value.as_deref(), Some("v1"));

        // Drained: a second sync delivers nothing.
        drop(events);
        assert_eq!(storage.sync_external().unwrap(), 0);
    }

    #[test]
    fn stats_tracking() {
        let store = MemoryStore::with_items([("k", "v")]);
        let (mut storage, _clock) = make_storage(store);

        storage.get("k");
        storage.get("k");
        storage.get("nope");

        assert_eq!(storage.stats().hits(), 1);
        assert_eq!(storage.stats().misses(), 2);
        assert!((storage.stats().hit_rate() - (1.0 / 3.0)).abs() < 0.01);
    }

    #[test]
    fn stats_display() {
        let stats = CacheStats::default();
        stats.hits.store(50, Ordering::Relaxed);
        stats.misses.store(50, Ordering::Relaxed);
        let display = format!("{stats}");
        assert!(display.contains("hits=50"));
        assert!(display.contains("misses=50"));
        assert!(display.contains("50.00%"));
    }

    #[test]
    fn stats_reset() {
        let stats = CacheStats::default();
        stats.hits.store(10, Ordering::Relaxed);
        stats.expirations.store(5, Ordering::Relaxed);
        stats.reset();
        assert_eq!(stats.hits(), 0);
        assert_eq!(stats.expirations(), 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }
}
