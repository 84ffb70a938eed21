//! Bounded in-memory cache with priority and expiration based eviction.
//!
//! The cache never evicts inline. `put` only *schedules* a purge when the
//! entry count exceeds the maximum, and every removal only *queues* its
//! notification. Both are carried out by [`BoundedCache::run_pending_tasks`],
//! which the owning event loop calls once per tick. Removal callbacks
//! therefore never run inside `get`, `put`, `remove` or `clear`.
//!
//! The cache is a single-loop object: all methods take `&mut self` and no
//! internal locking is done.

use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, trace};

use super::types::{
    CacheError, CacheKey, CachePriority, CacheStats, EntryOptions, EvictCallback,
    MaintenanceReport, RemovalCause,
};

/// Default fraction of `max_size` a purge shrinks the cache to.
pub const DEFAULT_FILL_FACTOR: f64 = 0.75;

type EvictionListener<K, V> = Box<dyn FnMut(&K, &V, RemovalCause)>;

struct Entry<K, V> {
    value: V,
    last_accessed: Instant,
    /// Tie-break for entries touched within the same clock reading.
    access_seq: u64,
    priority: CachePriority,
    expire_at: Option<Instant>,
    expire_after_idle: Option<Duration>,
    on_evict: Option<EvictCallback<K, V>>,
}

impl<K, V> Entry<K, V> {
    fn is_expired(&self, now: Instant) -> bool {
        if let Some(deadline) = self.expire_at {
            if now > deadline {
                return true;
            }
        }
        if let Some(idle) = self.expire_after_idle {
            if now > self.last_accessed + idle {
                return true;
            }
        }
        false
    }
}

struct PendingRemoval<K, V> {
    key: K,
    value: V,
    cause: RemovalCause,
    on_evict: Option<EvictCallback<K, V>>,
}

/// Builder for [`BoundedCache`].
pub struct BoundedCacheBuilder<K, V> {
    max_size: usize,
    fill_factor: f64,
    listener: Option<EvictionListener<K, V>>,
}

impl<K: CacheKey, V> BoundedCacheBuilder<K, V> {
    /// Target size after a purge as a fraction of `max_size`.
    ///
    /// # Panics
    ///
    /// Panics unless `0.0 < fill_factor <= 1.0`.
    pub fn fill_factor(mut self, fill_factor: f64) -> Self {
        assert!(
            fill_factor > 0.0 && fill_factor <= 1.0,
            "fill_factor must be in (0, 1], got {}",
            fill_factor
        );
        self.fill_factor = fill_factor;
        self
    }

    /// Listener called for every removed entry, after its own `on_evict`.
    ///
    /// This is the value disposer hook: it sees every value leaving the
    /// cache exactly once together with the reason.
    pub fn eviction_listener<F>(mut self, listener: F) -> Self
    where
        F: FnMut(&K, &V, RemovalCause) + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn build(self) -> BoundedCache<K, V> {
        let purge_size = if self.max_size == 0 {
            0
        } else {
            (self.max_size as f64 * self.fill_factor).round() as usize
        };
        BoundedCache {
            entries: HashMap::new(),
            max_size: self.max_size,
            purge_size,
            purge_scheduled: false,
            pending: VecDeque::new(),
            listener: self.listener,
            access_seq: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
            failed_callbacks: 0,
        }
    }
}

/// Key/value store with a soft maximum size.
///
/// See the [module documentation](self) for the deferred maintenance model.
pub struct BoundedCache<K: CacheKey, V> {
    entries: HashMap<K, Entry<K, V>>,
    max_size: usize,
    purge_size: usize,
    purge_scheduled: bool,
    pending: VecDeque<PendingRemoval<K, V>>,
    listener: Option<EvictionListener<K, V>>,
    access_seq: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
    failed_callbacks: u64,
}

impl<K: CacheKey, V> BoundedCache<K, V> {
    /// Create a cache holding roughly `max_size` entries.
    ///
    /// `max_size == 0` disables size based eviction.
    pub fn new(max_size: usize) -> Self {
        Self::builder(max_size).build()
    }

    pub fn builder(max_size: usize) -> BoundedCacheBuilder<K, V> {
        BoundedCacheBuilder {
            max_size,
            fill_factor: DEFAULT_FILL_FACTOR,
            listener: None,
        }
    }

    /// Look up `key`.
    ///
    /// A hit refreshes the entry's recency. An expired entry is removed
    /// and reported as a miss.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let now = Instant::now();

        let expired = match self.entries.get(key) {
            None => {
                self.misses += 1;
                trace!(key = ?key, "cache miss");
                return None;
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            self.misses += 1;
            self.expirations += 1;
            self.detach(key, RemovalCause::Expired);
            trace!(key = ?key, "cache miss (expired)");
            return None;
        }

        self.hits += 1;
        self.access_seq += 1;
        let seq = self.access_seq;
        trace!(key = ?key, "cache hit");
        self.entries.get_mut(key).map(|entry| {
            entry.last_accessed = now;
            entry.access_seq = seq;
            &entry.value
        })
    }

    /// Returns true if `key` is present and not expired.
    ///
    /// Does not refresh recency or touch the hit/miss counters.
    pub fn contains_key(&self, key: &K) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired(now))
            .unwrap_or(false)
    }

    /// Value for `key` if present and not expired.
    ///
    /// Like [`contains_key`](Self::contains_key), this neither refreshes
    /// recency nor counts a hit or miss.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| &entry.value)
    }

    /// Insert `value` under `key`.
    ///
    /// An existing entry for `key` is removed first and its removal is
    /// notified with [`RemovalCause::Replaced`]. If the cache now holds more
    /// than `max_size` entries a purge is scheduled for the next
    /// [`run_pending_tasks`](Self::run_pending_tasks).
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::EmptyKey`] for a blank key.
    pub fn put(&mut self, key: K, value: V, options: EntryOptions<K, V>) -> Result<(), CacheError> {
        if key.is_blank() {
            return Err(CacheError::EmptyKey);
        }

        self.detach(&key, RemovalCause::Replaced);

        self.access_seq += 1;
        trace!(key = ?key, priority = ?options.priority, "cache set");
        self.entries.insert(
            key,
            Entry {
                value,
                last_accessed: Instant::now(),
                access_seq: self.access_seq,
                priority: options.priority,
                expire_at: options.expire_at,
                expire_after_idle: options.expire_after_idle,
                on_evict: options.on_evict,
            },
        );

        if self.max_size > 0 && self.entries.len() > self.max_size && !self.purge_scheduled {
            debug!(
                entries = self.entries.len(),
                max_size = self.max_size,
                "cache over capacity, purge scheduled"
            );
            self.purge_scheduled = true;
        }
        Ok(())
    }

    /// Remove `key`. Returns false if it was not present.
    pub fn remove(&mut self, key: &K) -> bool {
        self.detach(key, RemovalCause::Explicit)
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        let keys: Vec<K> = self.entries.keys().cloned().collect();
        for key in keys {
            self.detach(&key, RemovalCause::Cleared);
        }
        self.purge_scheduled = false;
    }

    /// Run the scheduled purge, if any, then deliver queued removal
    /// notifications.
    pub fn run_pending_tasks(&mut self) -> MaintenanceReport {
        self.run_pending_tasks_with(|_, _, _| {})
    }

    /// Like [`run_pending_tasks`](Self::run_pending_tasks), additionally
    /// handing each removed value to `sink` once its callbacks have run.
    pub fn run_pending_tasks_with<F>(&mut self, mut sink: F) -> MaintenanceReport
    where
        F: FnMut(K, V, RemovalCause),
    {
        let mut report = MaintenanceReport::default();

        if self.purge_scheduled {
            let (expired, evicted) = self.purge();
            report.purged = true;
            report.expired = expired;
            report.evicted = evicted;
        }

        while let Some(mut removal) = self.pending.pop_front() {
            report.failed_callbacks += self.notify(&mut removal);
            report.notified += 1;
            sink(removal.key, removal.value, removal.cause);
        }

        if !report.is_empty() {
            debug!(%report, entries = self.entries.len(), "cache maintenance");
        }
        report
    }

    /// True if a purge or removal notifications are waiting.
    pub fn has_pending_tasks(&self) -> bool {
        self.purge_scheduled || !self.pending.is_empty()
    }

    /// Number of resident entries, including ones that have expired but
    /// have not been looked up or purged yet.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Size a purge shrinks the cache to.
    pub fn purge_size(&self) -> usize {
        self.purge_size
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            expirations: self.expirations,
            failed_callbacks: self.failed_callbacks,
            entry_count: self.entries.len(),
            max_size: self.max_size,
        }
    }

    /// Move an entry from the map to the notification queue.
    fn detach(&mut self, key: &K, cause: RemovalCause) -> bool {
        match self.entries.remove_entry(key) {
            Some((key, entry)) => {
                trace!(key = ?key, %cause, "cache remove");
                self.pending.push_back(PendingRemoval {
                    key,
                    value: entry.value,
                    cause,
                    on_evict: entry.on_evict,
                });
                true
            }
            None => false,
        }
    }

    /// Drop expired entries, then evict the least important entries until
    /// the cache is at `purge_size`. Returns (expired, evicted).
    fn purge(&mut self) -> (usize, usize) {
        self.purge_scheduled = false;
        let now = Instant::now();

        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.detach(key, RemovalCause::Expired);
        }
        self.expirations += expired.len() as u64;

        if self.entries.len() <= self.purge_size {
            return (expired.len(), 0);
        }

        // Least important first: lower priority, then older access.
        let mut ranked: Vec<(CachePriority, Instant, u64, K)> = self
            .entries
            .iter()
            .map(|(key, e)| (e.priority, e.last_accessed, e.access_seq, key.clone()))
            .collect();
        ranked.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));

        let excess = self.entries.len() - self.purge_size;
        for (_, _, _, key) in ranked.into_iter().take(excess) {
            self.detach(&key, RemovalCause::Size);
        }
        self.evictions += excess as u64;

        (expired.len(), excess)
    }

    /// Fire the entry callback, then the cache listener. A panic in either
    /// is logged and counted; it never stops the remaining notifications.
    /// Returns the number of callbacks that panicked.
    fn notify(&mut self, removal: &mut PendingRemoval<K, V>) -> usize {
        let mut failed = 0;
        let (key, value, cause) = (&removal.key, &removal.value, removal.cause);

        if let Some(callback) = removal.on_evict.take() {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(key, value))).is_err() {
                error!(key = ?key, %cause, "on_evict callback panicked");
                failed += 1;
            }
        }
        if let Some(listener) = self.listener.as_mut() {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(key, value, cause))).is_err() {
                error!(key = ?key, %cause, "eviction listener panicked");
                failed += 1;
            }
        }

        self.failed_callbacks += failed as u64;
        failed
    }
}

impl<K: CacheKey, V> Drop for BoundedCache<K, V> {
    fn drop(&mut self) {
        while let Some(mut removal) = self.pending.pop_front() {
            self.notify(&mut removal);
        }
    }
}

impl<K: CacheKey, V> std::fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("entries", &self.entries.len())
            .field("max_size", &self.max_size)
            .field("purge_size", &self.purge_size)
            .field("pending", &self.pending.len())
            .finish()
    }
}
