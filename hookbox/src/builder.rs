//! Builder for configuring [`CachingFetcher`].

use hookbox_core::{ResourceKey, ResponseCache, Transport};

use crate::MemoryCache;
use crate::config::FetcherConfig;
use crate::fetcher::CachingFetcher;

/// Builder for [`CachingFetcher`].
///
/// Starts with an empty [`MemoryCache`], the default [`FetcherConfig`] and no
/// key.
///
/// ```
/// use hookbox::{CachingFetcher, FetcherConfig, MemoryCache};
/// # use std::future::Ready;
/// # use hookbox::{CancellationToken, FetchError, ResourceKey, Transport};
/// # struct Noop;
/// # impl Transport for Noop {
/// #     type Payload = ();
/// #     type Future = Ready<Result<(), FetchError>>;
/// #     fn fetch(&self, _: &ResourceKey, _: CancellationToken) -> Self::Future {
/// #         std::future::ready(Ok(()))
/// #     }
/// # }
///
/// let shared_cache = MemoryCache::new();
/// let fetcher = CachingFetcher::builder(Noop)
///     .cache(shared_cache.clone())
///     .config(FetcherConfig::builder().disable_cache().build())
///     .build();
/// assert!(!fetcher.config().cache_enabled());
/// ```
pub struct CachingFetcherBuilder<Tr, C> {
    transport: Tr,
    cache: C,
    config: FetcherConfig,
    key: Option<ResourceKey>,
}

impl<Tr> CachingFetcherBuilder<Tr, MemoryCache<Tr::Payload>>
where
    Tr: Transport,
{
    /// Creates a builder using `transport`.
    pub fn new(transport: Tr) -> Self {
        Self {
            transport,
            cache: MemoryCache::new(),
            config: FetcherConfig::default(),
            key: None,
        }
    }
}

impl<Tr, C> CachingFetcherBuilder<Tr, C>
where
    Tr: Transport,
{
    /// Use `cache` instead of a fresh [`MemoryCache`].
    pub fn cache<NewC>(self, cache: NewC) -> CachingFetcherBuilder<Tr, NewC>
    where
        NewC: ResponseCache<Tr::Payload>,
    {
        CachingFetcherBuilder {
            transport: self.transport,
            cache,
            config: self.config,
            key: self.key,
        }
    }

    /// Set the fetcher configuration.
    pub fn config(self, config: FetcherConfig) -> Self {
        Self { config, ..self }
    }

    /// Key to apply right after construction.
    ///
    /// `build` then behaves like [`CachingFetcher::set_key`] and needs a Tokio
    /// runtime when the key is not cached.
    pub fn key(self, key: impl Into<ResourceKey>) -> Self {
        Self {
            key: Some(key.into()),
            ..self
        }
    }

    /// Build the fetcher.
    pub fn build(self) -> CachingFetcher<Tr, C>
    where
        C: ResponseCache<Tr::Payload>,
    {
        let fetcher = CachingFetcher::from_parts(self.transport, self.cache, self.config);
        if let Some(key) = self.key {
            fetcher.set_key(key);
        }
        fetcher
    }
}
