//! Keyed fetching with a response cache and supersession.

use std::fmt;
use std::sync::Arc;

use hookbox_core::{
    CancellationToken, FetchAction, FetchError, FetchState, FetchStatus, ResourceKey,
    ResponseCache, Transport,
};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{Instrument, debug, info_span, trace, warn};

use crate::MemoryCache;
use crate::builder::CachingFetcherBuilder;
use crate::config::FetcherConfig;
use crate::metrics::{RequestOutcome, record_cache_lookup, record_request};

/// Key and attempt currently owned by a fetcher.
#[derive(Debug, Default)]
struct Slot {
    key: Option<ResourceKey>,
    /// Token of the live attempt. Cancelling it both aborts the request and
    /// marks any late resolution as superseded.
    attempt: Option<CancellationToken>,
}

/// How a new key is answered.
enum Resolution<P> {
    Blank,
    Cached(P),
    Request(Handle),
}

impl Slot {
    fn teardown(&mut self) {
        if let Some(token) = self.attempt.take() {
            token.cancel();
        }
    }
}

struct Shared<Tr: Transport, C> {
    transport: Tr,
    cache: C,
    config: FetcherConfig,
    state: watch::Sender<FetchState<Tr::Payload>>,
    slot: Mutex<Slot>,
}

impl<Tr, C> Shared<Tr, C>
where
    Tr: Transport,
    C: ResponseCache<Tr::Payload>,
{
    fn dispatch(&self, action: FetchAction<Tr::Payload>) {
        self.state.send_modify(|state| state.apply(action));
        trace!(status = %self.state.borrow().status(), "fetch state updated");
    }

    /// Dispatches `action` unless `attempt` has been superseded.
    ///
    /// Runs under the slot lock, so a teardown either happens entirely before
    /// the check or entirely after the dispatch.
    fn settle(&self, attempt: &CancellationToken, action: FetchAction<Tr::Payload>) -> bool {
        let mut slot = self.slot.lock();
        if attempt.is_cancelled() {
            return false;
        }
        slot.attempt = None;
        self.dispatch(action);
        true
    }

    async fn request(self: Arc<Self>, key: ResourceKey, attempt: CancellationToken) {
        let started = Instant::now();
        let fetch = self.transport.fetch(&key, attempt.clone());
        let result = tokio::select! {
            biased;
            _ = attempt.cancelled() => Err(FetchError::Aborted),
            result = fetch => result,
        };

        let elapsed = started.elapsed();
        if let Some(threshold) = self.config.slow_request
            && elapsed > threshold
            && !matches!(result, Err(FetchError::Aborted))
        {
            warn!(
                elapsed_ms = elapsed.as_millis(),
                threshold_ms = threshold.as_millis(),
                "Request exceeded slow request threshold"
            );
        }

        let outcome = match result {
            Ok(payload) => {
                // Stored even when superseded: the payload is still valid for this key.
                if self.config.cache_enabled() {
                    self.cache.insert(key, payload.clone());
                }
                if self.settle(&attempt, FetchAction::Fetched(payload)) {
                    debug!("request fetched");
                    RequestOutcome::Fetched
                } else {
                    debug!("request superseded, payload discarded");
                    RequestOutcome::Superseded
                }
            }
            Err(FetchError::Aborted) => {
                debug!("request aborted");
                RequestOutcome::Aborted
            }
            Err(error) => {
                if let FetchError::Http { status } = error {
                    debug!(status, "request rejected by server");
                }
                if self.settle(&attempt, FetchAction::Error(error.to_string())) {
                    debug!(%error, "request failed");
                    RequestOutcome::Error
                } else {
                    debug!(%error, "request superseded, failure discarded");
                    RequestOutcome::Superseded
                }
            }
        };
        record_request(outcome, elapsed);
    }
}

/// Fetches the resource identified by the current key, caching payloads and
/// discarding results of superseded requests.
///
/// The host drives the fetcher by calling [`set_key`](Self::set_key) whenever the
/// key input changes and observes the published [`FetchState`]. For every
/// change to a non-blank key the fetcher:
///
/// 1. cancels the previous attempt,
/// 2. moves to `Fetching`,
/// 3. answers from the cache when the key was fetched before, without any request,
/// 4. otherwise requests the key through its [`Transport`] and moves to `Fetched`
///    or `Error` when the request settles.
///
/// Only the attempt for the most recent key can change the state. Requests for
/// earlier keys are cancelled, and if one settles anyway its outcome is dropped.
/// Cancelled requests never surface an error.
///
/// Dropping the fetcher (or calling [`detach`](Self::detach)) cancels the
/// in-flight request.
///
/// # Examples
///
/// ```
/// use std::future::Ready;
/// use hookbox::CachingFetcher;
/// use hookbox::{CancellationToken, FetchError, FetchStatus, ResourceKey, Transport};
///
/// struct Bios;
///
/// impl Transport for Bios {
///     type Payload = String;
///     type Future = Ready<Result<String, FetchError>>;
///
///     fn fetch(&self, key: &ResourceKey, _cancel: CancellationToken) -> Self::Future {
///         std::future::ready(Ok(format!("bio of {key}")))
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fetcher = CachingFetcher::new(Bios);
/// let mut state = fetcher.subscribe();
///
/// fetcher.set_key("ada");
/// state.wait_for(|state| state.is_settled()).await.unwrap();
///
/// assert_eq!(fetcher.status(), FetchStatus::Fetched);
/// assert_eq!(fetcher.state().data().map(String::as_str), Some("bio of ada"));
/// # }
/// ```
pub struct CachingFetcher<Tr: Transport, C = MemoryCache<<Tr as Transport>::Payload>> {
    shared: Arc<Shared<Tr, C>>,
}

impl<Tr> CachingFetcher<Tr>
where
    Tr: Transport,
{
    /// Creates a fetcher with an empty [`MemoryCache`] and default configuration.
    pub fn new(transport: Tr) -> Self {
        Self::builder(transport).build()
    }

    /// Creates a fetcher with an empty [`MemoryCache`] and `config`.
    pub fn with_config(transport: Tr, config: FetcherConfig) -> Self {
        Self::builder(transport).config(config).build()
    }

    /// Creates a builder for a fetcher using `transport`.
    pub fn builder(transport: Tr) -> CachingFetcherBuilder<Tr, MemoryCache<Tr::Payload>> {
        CachingFetcherBuilder::new(transport)
    }
}

impl<Tr, C> CachingFetcher<Tr, C>
where
    Tr: Transport,
    C: ResponseCache<Tr::Payload>,
{
    /// Creates a fetcher storing payloads in `cache`.
    ///
    /// Passing a clone of another fetcher's [`MemoryCache`] shares its entries.
    pub fn with_cache(transport: Tr, cache: C) -> Self {
        Self::from_parts(transport, cache, FetcherConfig::default())
    }

    pub(crate) fn from_parts(transport: Tr, cache: C, config: FetcherConfig) -> Self {
        let (state, _) = watch::channel(FetchState::Idle);
        Self {
            shared: Arc::new(Shared {
                transport,
                cache,
                config,
                state,
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    /// Points the fetcher at `key`.
    ///
    /// Does nothing when `key` equals the current key. Otherwise the previous
    /// attempt is cancelled before anything else happens. A blank key stops
    /// there and leaves the state untouched. A cache hit is dispatched before
    /// this returns; a miss starts a request on the Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if a request has to be started outside a Tokio runtime. The
    /// fetcher is left exactly as it was before the call.
    pub fn set_key(&self, key: impl Into<ResourceKey>) {
        let key = key.into();
        let mut slot = self.shared.slot.lock();
        if slot.key.as_ref() == Some(&key) {
            trace!(%key, "key unchanged");
            return;
        }

        let resolution = self.resolve(&key);

        slot.teardown();
        slot.key = Some(key.clone());

        let runtime = match resolution {
            Resolution::Blank => {
                debug!("blank key, nothing to fetch");
                return;
            }
            Resolution::Cached(payload) => {
                debug!(%key, "cache hit");
                self.shared.dispatch(FetchAction::Fetching);
                self.shared.dispatch(FetchAction::Fetched(payload));
                return;
            }
            Resolution::Request(runtime) => runtime,
        };

        self.shared.dispatch(FetchAction::Fetching);
        let attempt = CancellationToken::new();
        slot.attempt = Some(attempt.clone());
        drop(slot);

        let span = info_span!("fetch", key = %key);
        runtime.spawn(Arc::clone(&self.shared).request(key, attempt).instrument(span));
    }

    /// Decides how `key` is answered, before any state changes.
    fn resolve(&self, key: &ResourceKey) -> Resolution<Tr::Payload> {
        if key.is_blank() {
            return Resolution::Blank;
        }

        if self.shared.config.cache_enabled() {
            let cached = self.shared.cache.get(key);
            record_cache_lookup(cached.is_some());
            if let Some(payload) = cached {
                return Resolution::Cached(payload);
            }
            debug!(%key, "cache miss");
        }

        match Handle::try_current() {
            Ok(runtime) => Resolution::Request(runtime),
            Err(error) => {
                panic!("CachingFetcher must request `{key}` within a Tokio runtime: {error}")
            }
        }
    }

    /// Cancels the in-flight request and forgets the current key.
    ///
    /// The state is left as it is. A later [`set_key`](Self::set_key) starts over,
    /// even with the same key as before.
    pub fn detach(&self) {
        let mut slot = self.shared.slot.lock();
        slot.teardown();
        slot.key = None;
    }

    /// The key most recently passed to [`set_key`](Self::set_key), blank keys included.
    pub fn key(&self) -> Option<ResourceKey> {
        self.shared.slot.lock().key.clone()
    }

    /// Current lifecycle stage.
    pub fn status(&self) -> FetchStatus {
        self.shared.state.borrow().status()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> FetchState<Tr::Payload> {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<FetchState<Tr::Payload>> {
        self.shared.state.subscribe()
    }

    /// The response cache of this fetcher.
    pub fn cache(&self) -> &C {
        &self.shared.cache
    }

    /// The transport requests are issued through.
    pub fn transport(&self) -> &Tr {
        &self.shared.transport
    }

    /// The configuration this fetcher was built with.
    pub fn config(&self) -> &FetcherConfig {
        &self.shared.config
    }
}

impl<Tr: Transport, C> Drop for CachingFetcher<Tr, C> {
    fn drop(&mut self) {
        self.shared.slot.lock().teardown();
    }
}

impl<Tr: Transport, C> fmt::Debug for CachingFetcher<Tr, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.shared.slot.lock();
        f.debug_struct("CachingFetcher")
            .field("key", &slot.key)
            .field("in_flight", &slot.attempt.is_some())
            .field("status", &self.shared.state.borrow().status())
            .field("config", &self.shared.config)
            .finish()
    }
}
