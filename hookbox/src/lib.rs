#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Builder for [`CachingFetcher`].
pub mod builder;

/// In-memory response cache.
///
/// [`MemoryCache`](cache::MemoryCache) is the default
/// [`ResponseCache`](hookbox_core::ResponseCache) of every fetcher: unbounded,
/// never expiring, shared between clones.
pub mod cache;

/// Fetcher configuration types.
///
/// Provides [`FetcherConfig`](config::FetcherConfig) with the cache policy and
/// the slow request warning threshold.
pub mod config;

/// Observable execution of async operations.
///
/// [`AsyncExecutor`](executor::AsyncExecutor) turns any async, possibly failing
/// operation into an `idle → pending → success/error` state machine that can
/// run on demand or once at creation.
pub mod executor;

/// Keyed fetching with caching and supersession.
///
/// [`CachingFetcher`](fetcher::CachingFetcher) resolves the current key through
/// a [`Transport`](hookbox_core::Transport), answers repeated keys from its
/// cache and guarantees that only the most recent key can change its state.
pub mod fetcher;

/// Metrics collection for fetchers and executors.
///
/// When the `metrics` feature is enabled, this module provides counters
/// and histograms for:
/// - Cache hits and misses
/// - Network request outcomes and latency
/// - Execution outcomes and latency
pub mod metrics;

pub use builder::CachingFetcherBuilder;
pub use cache::MemoryCache;
pub use config::{CachePolicy, FetcherConfig, FetcherConfigBuilder};
pub use executor::AsyncExecutor;
pub use fetcher::CachingFetcher;

pub use hookbox_core::{
    AsyncState, AsyncStatus, CancellationToken, FetchAction, FetchError, FetchState, FetchStatus,
    ResourceKey, ResponseCache, Transport,
};

/// The `hookbox` prelude.
///
/// ```rust
/// use hookbox::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AsyncExecutor, AsyncState, AsyncStatus, CachingFetcher, FetchState, FetchStatus,
        ResourceKey, Transport,
    };
}
