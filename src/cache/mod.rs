//! Two-tier cache for inheritance resolution.
//!
//! - The **hierarchy** table maps a template name to its built
//!   [`InheritanceHierarchy`]. Only static hierarchies are stored: a dynamic
//!   one depends on the render context.
//! - The **resolved** table maps `name::digest` to the fully merged and
//!   `super()`-resolved tree. Static hierarchies use the digest `static`;
//!   dynamic ones use the short context digest, and the entry keeps the full
//!   digest so that a truncated-key collision is treated as a miss.
//!
//! Both tables expire entries after their TTL and evict the least recently
//! used entry when full. Expired entries are also removed by a background
//! sweep that runs at most once per sweep interval and never twice at the
//! same time. The sweep runs on Tokio's blocking pool when a runtime is
//! present, otherwise on a short-lived OS thread.
//!
//! The cache is shared through `Arc<InheritanceCache>`; several processors may
//! use one instance.
//!
//! Invalidation and clearing bump a generation counter. A resolution records
//! the generation before it starts and stores through the `*_at` methods,
//! which refuse results that started before the latest invalidation.

mod table;

pub use table::{CacheTable, TableStats};

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::ast::Template;
use crate::config::CacheConfig;
use crate::constants::RESOLVED_KEY_SEPARATOR;
use crate::inheritance::InheritanceHierarchy;

/// A cached resolution result.
#[derive(Debug, Clone)]
pub struct ResolvedEntry {
    pub template: Arc<Template>,
    /// Full context digest the result was produced for
    pub full_digest: String,
    /// Names of every template the result was built from, child first
    pub chain: Vec<String>,
}

impl ResolvedEntry {
    fn depends_on(&self, name: &str) -> bool {
        self.chain.iter().any(|entry| entry == name)
    }
}

/// Per-table statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hierarchy: TableStats,
    pub resolved: TableStats,
}

/// Shared hierarchy and resolved-template cache.
pub struct InheritanceCache {
    hierarchies: Arc<CacheTable<Arc<InheritanceHierarchy>>>,
    resolved: Arc<CacheTable<Arc<ResolvedEntry>>>,
    generation: AtomicU64,
    sweeper: Sweeper,
}

impl std::fmt::Debug for InheritanceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InheritanceCache")
            .field("hierarchies", &self.hierarchies.len())
            .field("resolved", &self.resolved.len())
            .field("capacity", &self.resolved.capacity())
            .field("generation", &self.generation())
            .field("sweep_interval", &self.sweeper.interval)
            .finish()
    }
}

impl Default for InheritanceCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl InheritanceCache {
    /// Cache with default TTLs and capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            hierarchies: Arc::new(CacheTable::new(
                "hierarchy",
                config.hierarchy_ttl(),
                config.capacity(),
            )),
            resolved: Arc::new(CacheTable::new("resolved", config.resolved_ttl(), config.capacity())),
            generation: AtomicU64::new(0),
            sweeper: Sweeper::new(config.sweep_interval()),
        }
    }

    pub fn get_hierarchy(&self, name: &str) -> Option<Arc<InheritanceHierarchy>> {
        self.maybe_sweep();
        self.hierarchies.get(name)
    }

    pub fn store_hierarchy(&self, name: &str, hierarchy: Arc<InheritanceHierarchy>) {
        self.hierarchies.store(name, hierarchy);
    }

    /// Store `hierarchy` only if nothing was invalidated since `generation`.
    pub fn store_hierarchy_at(&self, name: &str, hierarchy: Arc<InheritanceHierarchy>, generation: u64) -> bool {
        self.hierarchies.store_if(name, hierarchy, || self.is_current(generation))
    }

    /// Resolved tree for `name` under `digest`, if it was produced for a
    /// context whose full digest is `full_digest`.
    pub fn get_resolved(&self, name: &str, digest: &str, full_digest: &str) -> Option<Arc<Template>> {
        self.maybe_sweep();
        self.resolved
            .get_with(&resolved_key(name, digest), |entry| entry.full_digest == full_digest)
            .map(|entry| Arc::clone(&entry.template))
    }

    pub fn store_resolved(&self, name: &str, digest: &str, entry: ResolvedEntry) {
        self.resolved.store(resolved_key(name, digest), Arc::new(entry));
    }

    /// Store `entry` only if nothing was invalidated since `generation`.
    pub fn store_resolved_at(&self, name: &str, digest: &str, entry: ResolvedEntry, generation: u64) -> bool {
        let stored = self
            .resolved
            .store_if(resolved_key(name, digest), Arc::new(entry), || self.is_current(generation));
        if !stored {
            tracing::debug!("Dropped result for '{}' resolved before an invalidation", name);
        }
        stored
    }

    /// Current invalidation generation; see [`store_resolved_at`](Self::store_resolved_at).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Drop everything that was built from `name`: its own hierarchy entry,
    /// hierarchies that pass through it, and resolved trees whose chain
    /// contains it.
    pub fn invalidate_template(&self, name: &str) {
        // bumped before removing, so a store that passed its check is removed below
        self.generation.fetch_add(1, Ordering::AcqRel);
        let hierarchies = self
            .hierarchies
            .remove_where(|key, hierarchy| key == name || hierarchy.contains(name));
        let resolved = self.resolved.remove_where(|_, entry| entry.depends_on(name));
        tracing::debug!(
            "Invalidated '{}': {} hierarchy and {} resolved entries",
            name,
            hierarchies,
            resolved
        );
    }

    /// Empty both tables and reset their counters.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.hierarchies.clear();
        self.resolved.clear();
        tracing::debug!("Inheritance cache cleared");
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hierarchy: self.hierarchies.stats(),
            resolved: self.resolved.stats(),
        }
    }

    /// Remove expired entries from both tables now, on the calling thread.
    pub fn sweep_expired(&self) -> usize {
        sweep_tables(&self.hierarchies, &self.resolved)
    }

    /// Start a background sweep if one is due and none is running.
    fn maybe_sweep(&self) {
        let Some(guard) = self.sweeper.try_start(Instant::now()) else {
            return;
        };

        let hierarchies = Arc::clone(&self.hierarchies);
        let resolved = Arc::clone(&self.resolved);
        let job = move || {
            let _guard = guard;
            sweep_tables(&hierarchies, &resolved);
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => {
                if let Err(e) = std::thread::Builder::new().name("tpl-inherit-sweep".to_string()).spawn(job) {
                    tracing::warn!("Failed to start cache sweep thread: {}", e);
                }
            }
        }
    }

    #[cfg(test)]
    fn sweep_running(&self) -> bool {
        self.sweeper.running.load(Ordering::Acquire)
    }
}

fn resolved_key(name: &str, digest: &str) -> String {
    format!("{name}{RESOLVED_KEY_SEPARATOR}{digest}")
}

fn sweep_tables(
    hierarchies: &CacheTable<Arc<InheritanceHierarchy>>,
    resolved: &CacheTable<Arc<ResolvedEntry>>,
) -> usize {
    let now = Instant::now();
    let removed = hierarchies.sweep_expired(now) + resolved.sweep_expired(now);
    if removed > 0 {
        tracing::debug!("Cache sweep removed {} expired entries", removed);
    }
    removed
}

/// Rate limiter and single-flight flag for background sweeps.
struct Sweeper {
    interval: Duration,
    epoch: Instant,
    /// Nanoseconds since `epoch` at which the last sweep started
    last_sweep: AtomicU64,
    running: Arc<AtomicBool>,
}

impl Sweeper {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            epoch: Instant::now(),
            last_sweep: AtomicU64::new(0),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    fn try_start(&self, now: Instant) -> Option<SweepGuard> {
        let now = u64::try_from(now.saturating_duration_since(self.epoch).as_nanos()).unwrap_or(u64::MAX);
        let interval = u64::try_from(self.interval.as_nanos()).unwrap_or(u64::MAX);
        if now.saturating_sub(self.last_sweep.load(Ordering::Acquire)) < interval {
            return None;
        }
        if self.running.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return None;
        }
        self.last_sweep.store(now, Ordering::Release);
        Some(SweepGuard(Arc::clone(&self.running)))
    }
}

/// Clears the running flag when the sweep finishes, panics included.
struct SweepGuard(Arc<AtomicBool>);

impl Drop for SweepGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
