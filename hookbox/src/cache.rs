//! In-memory response cache.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use hookbox_core::{ResourceKey, ResponseCache};

/// Unbounded in-memory [`ResponseCache`] backed by a [`DashMap`].
///
/// Entries live as long as the cache. Clones share the same storage, so a
/// handle kept by the host observes everything its fetcher stores.
///
/// ```
/// use hookbox::MemoryCache;
/// use hookbox_core::{ResourceKey, ResponseCache};
///
/// let cache = MemoryCache::new();
/// cache.insert(ResourceKey::from("/users/1"), "Ada");
/// assert_eq!(cache.get(&"/users/1".into()), Some("Ada"));
/// assert_eq!(cache.len(), 1);
/// ```
pub struct MemoryCache<P> {
    entries: Arc<DashMap<ResourceKey, P>>,
}

impl<P> MemoryCache<P> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Keys currently stored, in no particular order.
    pub fn keys(&self) -> Vec<ResourceKey> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl<P> Default for MemoryCache<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for MemoryCache<P> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<P> fmt::Debug for MemoryCache<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl<P> ResponseCache<P> for MemoryCache<P>
where
    P: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &ResourceKey) -> Option<P> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn insert(&self, key: ResourceKey, payload: P) {
        self.entries.insert(key, payload);
    }

    fn contains(&self, key: &ResourceKey) -> bool {
        self.entries.contains_key(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
