//! Network capability used by fetchers.

use std::future::Future;

use crate::{CancellationToken, FetchError, ResourceKey};

/// Trait for the network capability a fetcher issues requests through.
///
/// The trait is protocol-agnostic: an HTTP client, a test double, or any other
/// keyed async source can implement it. The returned future must be
/// `'static`, so implementations clone whatever client handle they need into
/// it.
///
/// The `cancel` token is cancelled when the request is superseded. Honoring it
/// is optional; the fetcher drops the future on cancellation either way and
/// discards anything it would have produced.
///
/// # Examples
///
/// ```rust
/// use std::future::Ready;
/// use hookbox_core::{CancellationToken, FetchError, ResourceKey, Transport};
///
/// struct Echo;
///
/// impl Transport for Echo {
///     type Payload = String;
///     type Future = Ready<Result<String, FetchError>>;
///
///     fn fetch(&self, key: &ResourceKey, _cancel: CancellationToken) -> Self::Future {
///         std::future::ready(Ok(key.to_string()))
///     }
/// }
/// ```
pub trait Transport: Send + Sync + 'static {
    /// Decoded response body.
    type Payload: Clone + Send + Sync + 'static;

    /// The future that resolves to the decoded payload.
    type Future: Future<Output = Result<Self::Payload, FetchError>> + Send + 'static;

    /// Request the resource identified by `key`.
    fn fetch(&self, key: &ResourceKey, cancel: CancellationToken) -> Self::Future;
}
