//! Fetcher configuration.
//!
//! [`FetcherConfig`] is plain serde data, so it can be embedded in a larger
//! application config and loaded from YAML or JSON:
//!
//! ```yaml
//! cache: Enabled
//! slow_request: 2s
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Whether a fetcher consults and fills its response cache.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Default)]
pub enum CachePolicy {
    /// Look up every key before requesting it, store every decoded payload.
    #[default]
    Enabled,
    /// Always go to the network; nothing is stored.
    Disabled,
}

/// Configuration of a [`CachingFetcher`](crate::CachingFetcher).
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct FetcherConfig {
    /// Response cache policy.
    #[serde(default)]
    pub cache: CachePolicy,
    /// Log a warning when a request takes longer than this (e.g., "2s", "500ms").
    ///
    /// The request is not cancelled; fetchers enforce no timeouts of their own.
    #[serde(default, with = "humantime_serde")]
    pub slow_request: Option<Duration>,
}

impl FetcherConfig {
    /// Create a new builder for `FetcherConfig`.
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::default()
    }

    /// Returns `true` when the response cache is in use.
    pub fn cache_enabled(&self) -> bool {
        self.cache == CachePolicy::Enabled
    }
}

/// Builder for [`FetcherConfig`].
#[derive(Debug, Clone, Default)]
pub struct FetcherConfigBuilder {
    cache: CachePolicy,
    slow_request: Option<Duration>,
}

impl FetcherConfigBuilder {
    /// Set the cache policy.
    pub fn cache(self, cache: CachePolicy) -> Self {
        Self { cache, ..self }
    }

    /// Disable the response cache.
    pub fn disable_cache(self) -> Self {
        self.cache(CachePolicy::Disabled)
    }

    /// Set the slow request warning threshold.
    pub fn slow_request(self, threshold: Duration) -> Self {
        Self {
            slow_request: Some(threshold),
            ..self
        }
    }

    /// Build the `FetcherConfig`.
    pub fn build(self) -> FetcherConfig {
        FetcherConfig {
            cache: self.cache,
            slow_request: self.slow_request,
        }
    }
}
