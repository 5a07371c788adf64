//! Metrics declaration and recording helpers.

use std::time::Duration;

use hookbox_core::AsyncStatus;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    // Fetcher cache metrics

    /// Track number of fetcher cache hits.
    pub static ref FETCH_CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "hookbox_fetch_cache_hit_total",
            "Total number of key changes resolved from the response cache."
        );
        "hookbox_fetch_cache_hit_total"
    };
    /// Track number of fetcher cache misses.
    pub static ref FETCH_CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "hookbox_fetch_cache_miss_total",
            "Total number of key changes that required a network request."
        );
        "hookbox_fetch_cache_miss_total"
    };

    // Fetcher request metrics

    /// Track settled network requests by outcome.
    pub static ref FETCH_REQUESTS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "hookbox_fetch_requests_total",
            "Total number of settled network requests by outcome."
        );
        "hookbox_fetch_requests_total"
    };
    /// Histogram of network request duration.
    pub static ref FETCH_REQUEST_DURATION: &'static str = {
        metrics::describe_histogram!(
            "hookbox_fetch_request_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of network requests in seconds."
        );
        "hookbox_fetch_request_duration_seconds"
    };

    // Executor metrics

    /// Track settled executions by status.
    pub static ref EXECUTIONS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "hookbox_executions_total",
            "Total number of settled executions by status."
        );
        "hookbox_executions_total"
    };
    /// Histogram of execution duration.
    pub static ref EXECUTION_DURATION: &'static str = {
        metrics::describe_histogram!(
            "hookbox_execution_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of executions in seconds."
        );
        "hookbox_execution_duration_seconds"
    };
}

/// How a network request issued by a fetcher ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Payload dispatched to state.
    Fetched,
    /// Failure dispatched to state.
    Error,
    /// Settled after being superseded; nothing dispatched.
    Superseded,
    /// Cancelled before settling; nothing dispatched.
    Aborted,
}

impl RequestOutcome {
    /// Label value used in metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetched => "fetched",
            Self::Error => "error",
            Self::Superseded => "superseded",
            Self::Aborted => "aborted",
        }
    }
}

/// Record a response cache lookup.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_cache_lookup(hit: bool) {
    let counter = if hit {
        *FETCH_CACHE_HIT_COUNTER
    } else {
        *FETCH_CACHE_MISS_COUNTER
    };
    metrics::counter!(counter).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_cache_lookup(_hit: bool) {}

/// Record the end of a network request.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_request(outcome: RequestOutcome, duration: Duration) {
    metrics::counter!(*FETCH_REQUESTS_COUNTER, "outcome" => outcome.as_str()).increment(1);
    metrics::histogram!(*FETCH_REQUEST_DURATION, "outcome" => outcome.as_str())
        .record(duration.as_secs_f64());
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_request(_outcome: RequestOutcome, _duration: Duration) {}

/// Record a settled execution.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_execution(status: AsyncStatus, duration: Duration) {
    metrics::counter!(*EXECUTIONS_COUNTER, "status" => status.as_str()).increment(1);
    metrics::histogram!(*EXECUTION_DURATION, "status" => status.as_str())
        .record(duration.as_secs_f64());
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_execution(_status: AsyncStatus, _duration: Duration) {}
