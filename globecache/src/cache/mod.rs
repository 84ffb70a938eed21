//! Generic bounded cache.
//!
//! [`BoundedCache`] holds keyed values under a soft size limit. Entries can
//! expire at an absolute deadline or after a period of inactivity, and carry
//! a [`CachePriority`] that decides who survives a purge. Eviction and
//! removal callbacks are deferred to [`BoundedCache::run_pending_tasks`].

mod memory;
mod types;

pub use memory::{BoundedCache, BoundedCacheBuilder, DEFAULT_FILL_FACTOR};
pub use types::{
    CacheError, CacheKey, CachePriority, CacheStats, EntryOptions, EvictCallback,
    MaintenanceReport, RemovalCause,
};
