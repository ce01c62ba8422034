//! # Page Store
//!
//! The engine memoizes accumulated page sequences per query identity in a
//! [`PageStore`]. The store is injected: the engine only holds an `Arc<dyn PageStore>`
//! and never reaches for global state on its own.
//!
//! [`MemoryPageStore`] is the in-process implementation, supporting:
//! - **Staleness**: reads report whether an entry is older than the caller's stale time.
//! - **Inactivity expiry**: entries untouched for longer than their cache time are dropped.
//! - **LRU Eviction**: least-recently-used entries are evicted to maintain a size limit.
//! - **Stats**: entry counts, access counts and ages for introspection.
//!
//! ## Example
//! ```rust
//! use dioxus_infinite_provider::cache::{MemoryPageStore, PageStore, read_typed};
//! use std::{sync::Arc, time::Duration};
//!
//! let store = MemoryPageStore::new();
//! store.write("my_key", Arc::new(42u32), Duration::from_secs(60));
//! let hit = read_typed::<u32>(&store, "my_key", Duration::from_secs(30)).unwrap();
//! assert_eq!(hit.data, 42);
//! assert!(!hit.is_stale);
//! ```

use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::platform::{DEFAULT_MAX_CACHE_SIZE, Instant};

/// Type-erased value held by a store
pub type StoredValue = Arc<dyn Any + Send + Sync>;

/// A raw store hit
#[derive(Clone)]
pub struct StoreRead {
    pub value: StoredValue,
    pub is_stale: bool,
}

/// Result type for typed reads with staleness information
#[derive(Debug, Clone)]
pub struct CacheGetResult<T> {
    /// The cached data
    pub data: T,
    /// Whether the data is older than the requested stale time
    pub is_stale: bool,
}

/// The cache primitive consumed by the pagination engine.
///
/// Keys are canonical query keys. Implementations memoize values per key, report
/// staleness and decide when inactive entries are dropped.
pub trait PageStore: Send + Sync + 'static {
    /// Read the value stored under `key`, marking it as accessed.
    ///
    /// `is_stale` is true when the value is at least `stale_time` old.
    fn read(&self, key: &str, stale_time: Duration) -> Option<StoreRead>;

    /// Store `value` under `key`; it may be dropped once unused for `cache_time`
    fn write(&self, key: &str, value: StoredValue, cache_time: Duration);

    /// Remove the value under `key`, returning whether one existed
    fn remove(&self, key: &str) -> bool;

    /// Remove every value
    fn clear(&self);

    /// Number of stored values
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read and downcast a value from any store
pub fn read_typed<T: Clone + Send + Sync + 'static>(
    store: &dyn PageStore,
    key: &str,
    stale_time: Duration,
) -> Option<CacheGetResult<T>> {
    let hit = store.read(key, stale_time)?;
    let data = hit.value.downcast_ref::<T>()?.clone();
    Some(CacheGetResult {
        data,
        is_stale: hit.is_stale,
    })
}

/// A cache entry with timestamp and access tracking
struct CacheEntry {
    data: StoredValue,
    cached_at: Instant,
    last_accessed: Instant,
    access_count: u32,
    cache_time: Duration,
}

impl CacheEntry {
    fn new(data: StoredValue, cache_time: Duration) -> Self {
        let now = Instant::now();
        Self {
            data,
            cached_at: now,
            last_accessed: now,
            access_count: 0,
            cache_time,
        }
    }

    fn touch(&mut self) {
        self.last_accessed = Instant::now();
        self.access_count = self.access_count.saturating_add(1);
    }

    fn is_stale(&self, stale_time: Duration) -> bool {
        self.cached_at.elapsed() >= stale_time
    }

    fn is_unused_for(&self, duration: Duration) -> bool {
        self.last_accessed.elapsed() > duration
    }

    fn is_inactive(&self) -> bool {
        self.is_unused_for(self.cache_time)
    }

    fn time_since_last_access(&self) -> Duration {
        self.last_accessed.elapsed()
    }

    fn age(&self) -> Duration {
        self.cached_at.elapsed()
    }
}

/// Configuration for the in-memory store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    max_entries: usize,
    maintain_on_write: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_CACHE_SIZE,
            maintain_on_write: true,
        }
    }
}

impl StoreConfig {
    /// Create a new store configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum number of page sequences to keep before LRU eviction
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Skip maintenance on write; callers then run [`MemoryPageStore::maintain`] themselves
    pub fn without_write_maintenance(mut self) -> Self {
        self.maintain_on_write = false;
        self
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Install a global store built from this configuration
    pub fn init(self) -> crate::errors::PaginationResult<()> {
        crate::global::init_with(self)
    }
}

/// In-memory [`PageStore`] with inactivity expiry and LRU eviction
#[derive(Clone, Default)]
pub struct MemoryPageStore {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    config: StoreConfig,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            entries: Arc::default(),
            config,
        }
    }

    /// Removes entries not accessed for longer than their cache time.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_inactive_entries(&self) -> usize {
        if let Ok(mut entries) = self.entries.lock() {
            let initial_size = entries.len();
            entries.retain(|_key, entry| {
                let keep = !entry.is_inactive();
                if !keep {
                    crate::log_cache_evict!("Removing inactive entry: {}", _key);
                }
                keep
            });
            initial_size - entries.len()
        } else {
            0
        }
    }

    /// Removes entries not accessed within `unused_threshold`, whatever their cache time
    pub fn cleanup_unused_entries(&self, unused_threshold: Duration) -> usize {
        if let Ok(mut entries) = self.entries.lock() {
            let initial_size = entries.len();
            entries.retain(|_key, entry| !entry.is_unused_for(unused_threshold));
            let removed = initial_size - entries.len();
            if removed > 0 {
                crate::log_cache_evict!("Removed {} unused entries", removed);
            }
            removed
        } else {
            0
        }
    }

    /// Evicts least recently used entries to keep at most `max_size` entries.
    ///
    /// Returns the number of entries evicted.
    pub fn evict_lru_entries(&self, max_size: usize) -> usize {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.len() <= max_size {
                return 0;
            }

            let mut all: Vec<_> = entries.drain().collect();
            // Most recently used first
            all.sort_by_key(|(_, entry)| entry.time_since_last_access());
            let evicted = all.split_off(max_size).len();
            entries.extend(all);

            crate::log_cache_evict!("Evicted {} entries due to store size limit", evicted);
            evicted
        } else {
            0
        }
    }

    /// Runs inactivity cleanup followed by LRU eviction
    pub fn maintain(&self) -> CacheMaintenanceStats {
        CacheMaintenanceStats {
            inactive_removed: self.cleanup_inactive_entries(),
            lru_evicted: self.evict_lru_entries(self.config.max_entries),
            final_size: self.len(),
        }
    }

    /// Gets store statistics
    pub fn stats(&self) -> CacheStats {
        if let Ok(entries) = self.entries.lock() {
            let entry_count = entries.len();
            let total_accesses = entries.values().map(|e| e.access_count).sum();
            let total_age: Duration = entries.values().map(CacheEntry::age).sum();
            let avg_age = if entry_count > 0 {
                total_age / entry_count as u32
            } else {
                Duration::ZERO
            };

            CacheStats {
                entry_count,
                total_accesses,
                avg_age,
            }
        } else {
            CacheStats::default()
        }
    }
}

impl PageStore for MemoryPageStore {
    fn read(&self, key: &str, stale_time: Duration) -> Option<StoreRead> {
        let mut entries = self.entries.lock().ok()?;
        let entry = entries.get_mut(key)?;
        entry.touch();
        crate::debug_log!("Store read {} (accesses: {})", key, entry.access_count);
        Some(StoreRead {
            value: entry.data.clone(),
            is_stale: entry.is_stale(stale_time),
        })
    }

    fn write(&self, key: &str, value: StoredValue, cache_time: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), CacheEntry::new(value, cache_time));
        }
        if self.config.maintain_on_write {
            self.maintain();
        }
    }

    fn remove(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|mut entries| entries.remove(key).is_some())
            .unwrap_or(false)
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

/// Statistics for store maintenance operations
#[derive(Debug, Clone, Default)]
pub struct CacheMaintenanceStats {
    pub inactive_removed: usize,
    pub lru_evicted: usize,
    pub final_size: usize,
}

/// General store statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entry_count: usize,
    pub total_accesses: u32,
    pub avg_age: Duration,
}

impl CacheStats {
    pub fn avg_accesses_per_entry(&self) -> f64 {
        if self.entry_count > 0 {
            self.total_accesses as f64 / self.entry_count as f64
        } else {
            0.0
        }
    }
}
