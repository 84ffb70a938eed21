//! Types shared by the bounded cache.

use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::coord::QuadKey;

/// Eviction priority of a cache entry.
///
/// When a purge must drop entries, a higher priority entry always
/// survives a lower priority one regardless of how recently either
/// was accessed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CachePriority {
    Low = 1,
    #[default]
    Normal = 2,
    High = 4,
}

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalCause {
    /// Removed by [`BoundedCache::remove`](super::BoundedCache::remove).
    Explicit,
    /// Overwritten by a `put` for the same key.
    Replaced,
    /// Absolute or idle expiration elapsed.
    Expired,
    /// Dropped by a purge to bring the cache back to its target size.
    Size,
    /// Removed by [`BoundedCache::clear`](super::BoundedCache::clear).
    Cleared,
}

impl fmt::Display for RemovalCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemovalCause::Explicit => "explicit",
            RemovalCause::Replaced => "replaced",
            RemovalCause::Expired => "expired",
            RemovalCause::Size => "size",
            RemovalCause::Cleared => "cleared",
        };
        f.write_str(name)
    }
}

/// One-shot callback fired when a specific entry is removed.
pub type EvictCallback<K, V> = Box<dyn FnOnce(&K, &V)>;

/// Per-entry insertion options.
///
/// Absolute and idle expiration are independent; either one elapsing
/// expires the entry.
pub struct EntryOptions<K, V> {
    pub expire_at: Option<Instant>,
    pub expire_after_idle: Option<Duration>,
    pub priority: CachePriority,
    pub on_evict: Option<EvictCallback<K, V>>,
}

impl<K, V> Default for EntryOptions<K, V> {
    fn default() -> Self {
        Self {
            expire_at: None,
            expire_after_idle: None,
            priority: CachePriority::Normal,
            on_evict: None,
        }
    }
}

impl<K, V> EntryOptions<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(mut self, priority: CachePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Expire the entry once `deadline` has passed.
    pub fn with_expire_at(mut self, deadline: Instant) -> Self {
        self.expire_at = Some(deadline);
        self
    }

    /// Expire the entry after `idle` without a successful `get`.
    pub fn with_expire_after_idle(mut self, idle: Duration) -> Self {
        self.expire_after_idle = Some(idle);
        self
    }

    /// Run `callback` exactly once when the entry is removed, for any reason.
    pub fn with_on_evict<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&K, &V) + 'static,
    {
        self.on_evict = Some(Box::new(callback));
        self
    }
}

impl<K, V> fmt::Debug for EntryOptions<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryOptions")
            .field("expire_at", &self.expire_at)
            .field("expire_after_idle", &self.expire_after_idle)
            .field("priority", &self.priority)
            .field("on_evict", &self.on_evict.is_some())
            .finish()
    }
}

/// Keys usable in a [`BoundedCache`](super::BoundedCache).
pub trait CacheKey: Eq + Hash + Clone + fmt::Debug {
    /// Blank keys are rejected by `put`.
    fn is_blank(&self) -> bool {
        false
    }
}

impl CacheKey for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

// The root quadkey is empty but still a real tile.
impl CacheKey for QuadKey {}

impl CacheKey for u64 {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache keys must not be empty")]
    EmptyKey,
}

/// Counters for a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped by a size purge.
    pub evictions: u64,
    pub expirations: u64,
    /// Removal callbacks that panicked.
    pub failed_callbacks: u64,
    pub entry_count: usize,
    /// Soft maximum, 0 when unbounded.
    pub max_size: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0.0 when there were none.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let capacity = if self.max_size == 0 {
            "unbounded".to_string()
        } else {
            self.max_size.to_string()
        };
        write!(
            f,
            "{} entries (max {}), {} hits, {} misses ({:.1}% hit rate), {} evicted, {} expired",
            self.entry_count,
            capacity,
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.evictions,
            self.expirations
        )?;
        if self.failed_callbacks > 0 {
            write!(f, ", {} failed callbacks", self.failed_callbacks)?;
        }
        Ok(())
    }
}

/// Outcome of one [`run_pending_tasks`](super::BoundedCache::run_pending_tasks) call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Whether a scheduled purge ran.
    pub purged: bool,
    pub expired: usize,
    pub evicted: usize,
    /// Removal notifications delivered (all causes).
    pub notified: usize,
    pub failed_callbacks: usize,
}

impl MaintenanceReport {
    pub fn is_empty(&self) -> bool {
        !self.purged && self.notified == 0
    }
}

impl fmt::Display for MaintenanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "purged={}, expired={}, evicted={}, notified={}",
            self.purged, self.expired, self.evicted, self.notified
        )?;
        if self.failed_callbacks > 0 {
            write!(f, ", failed_callbacks={}", self.failed_callbacks)?;
        }
        Ok(())
    }
}
