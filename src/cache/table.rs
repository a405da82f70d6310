//! A single TTL + LRU table.
//!
//! Lookups that hit take only the read lock: the per-entry access counter and
//! last-access time are atomics, so touching an entry needs no exclusive
//! access. Everything that changes the key set takes the write lock.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// One cached value with its bookkeeping.
#[derive(Debug)]
pub(crate) struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    expires_at: Instant,
    access_count: AtomicU64,
    /// Nanoseconds since the owning table's epoch
    last_access: AtomicU64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    fn touch(&self, at: u64) {
        self.access_count.fetch_add(1, Ordering::Relaxed);
        self.last_access.store(at, Ordering::Relaxed);
    }
}

/// Counters for one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TableStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    /// `hits / (hits + misses)`, 0 when nothing was looked up yet
    pub hit_rate: f64,
    /// Mean access count over live entries, 0 when empty
    pub avg_access: f64,
}

enum Lookup<V> {
    Hit(V),
    Absent,
    Rejected,
    Expired,
}

/// String-keyed cache table with per-entry expiry and LRU eviction at
/// capacity.
#[derive(Debug)]
pub struct CacheTable<V> {
    label: &'static str,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    ttl: Duration,
    capacity: usize,
    epoch: Instant,
}

impl<V: Clone> CacheTable<V> {
    /// `capacity` is clamped to at least one entry.
    pub fn new(label: &'static str, ttl: Duration, capacity: usize) -> Self {
        Self {
            label,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            ttl,
            capacity: capacity.max(1),
            epoch: Instant::now(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_with(key, |_| true)
    }

    /// Look up `key`, counting the lookup as a hit only if `accept` agrees
    /// the stored value is the one wanted.
    ///
    /// Expired entries are removed. Rejected entries stay in place; the next
    /// store for the key replaces them.
    pub fn get_with(&self, key: &str, accept: impl Fn(&V) -> bool) -> Option<V> {
        let now = Instant::now();
        let outcome = {
            let entries = self.read();
            match entries.get(key) {
                None => Lookup::Absent,
                Some(entry) if entry.is_expired(now) => Lookup::Expired,
                Some(entry) if accept(&entry.value) => {
                    entry.touch(self.offset(now));
                    Lookup::Hit(entry.value.clone())
                }
                Some(_) => Lookup::Rejected,
            }
        };

        match outcome {
            Lookup::Hit(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("{} cache hit: {}", self.label, key);
                return Some(value);
            }
            Lookup::Expired => {
                let mut entries = self.write();
                // another thread may have replaced it in between
                let age = entries
                    .get(key)
                    .filter(|entry| entry.is_expired(now))
                    .map(|entry| now.saturating_duration_since(entry.created_at));
                if let Some(age) = age {
                    entries.remove(key);
                    tracing::trace!("{} cache entry expired after {:?}: {}", self.label, age, key);
                }
            }
            Lookup::Rejected => {
                tracing::debug!("{} cache entry for '{}' rejected on verification", self.label, key);
            }
            Lookup::Absent => {}
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("{} cache miss: {}", self.label, key);
        None
    }

    /// Insert or replace `key`. Inserting a new key into a full table first
    /// evicts the least recently used entry.
    pub fn store(&self, key: impl Into<String>, value: V) {
        self.store_if(key, value, || true);
    }

    /// [`store`](Self::store), unless `admit` returns false. `admit` runs
    /// under the write lock, so nothing removed after it agreed can be
    /// overwritten by this store.
    pub fn store_if(&self, key: impl Into<String>, value: V, admit: impl FnOnce() -> bool) -> bool {
        let key = key.into();
        let now = Instant::now();
        let at = self.offset(now);
        let mut entries = self.write();
        if !admit() {
            tracing::trace!("{} cache store skipped: {}", self.label, key);
            return false;
        }

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            Self::evict_lru(&mut entries, self.label);
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                expires_at: now + self.ttl,
                access_count: AtomicU64::new(1),
                last_access: AtomicU64::new(at),
            },
        );
        true
    }

    fn evict_lru(entries: &mut HashMap<String, CacheEntry<V>>, label: &str) {
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access.load(Ordering::Relaxed))
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            entries.remove(&key);
            tracing::debug!("{} cache full, evicted '{}'", label, key);
        }
    }

    /// Remove every entry for which `predicate` holds. Returns how many went.
    pub fn remove_where(&self, mut predicate: impl FnMut(&str, &V) -> bool) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|key, entry| !predicate(key, &entry.value));
        before - entries.len()
    }

    /// Drop every entry expired at `now`.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Remove all entries and reset the hit/miss counters.
    pub fn clear(&self) {
        self.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> TableStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let entries = self.read();

        let total_access: u64 = entries.values().map(|e| e.access_count.load(Ordering::Relaxed)).sum();
        let lookups = hits + misses;

        TableStats {
            hits,
            misses,
            entries: entries.len(),
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
            avg_access: if entries.is_empty() {
                0.0
            } else {
                total_access as f64 / entries.len() as f64
            },
        }
    }

    fn offset(&self, now: Instant) -> u64 {
        u64::try_from(now.saturating_duration_since(self.epoch).as_nanos()).unwrap_or(u64::MAX)
    }

    // A panic while holding the lock leaves at worst a stale cache entry.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
