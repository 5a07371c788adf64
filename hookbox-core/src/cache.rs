//! Response cache trait.
//!
//! A fetcher looks up every non-blank key in its [`ResponseCache`] before
//! touching the network, and stores every successfully decoded payload in it.
//! Lookups are synchronous: a cache hit must be dispatched without yielding to
//! the runtime.
//!
//! The default implementation lives in the `hookbox` crate (`MemoryCache`).
//! Other storage, such as a persistent key-value store, can be plugged in by
//! implementing this trait.

use crate::ResourceKey;

/// Storage for decoded payloads, keyed by exact resource key.
///
/// Entries are never evicted by the fetcher. Implementations may choose to
/// evict on their own, at the cost of extra network calls.
pub trait ResponseCache<P>: Send + Sync + 'static {
    /// Returns a copy of the payload stored under `key`.
    fn get(&self, key: &ResourceKey) -> Option<P>;

    /// Stores `payload` under `key`, replacing any previous entry.
    fn insert(&self, key: ResourceKey, payload: P);

    /// Returns `true` when an entry exists for `key`.
    fn contains(&self, key: &ResourceKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of stored entries.
    fn len(&self) -> usize;

    /// Returns `true` when the cache holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
