//! Error types for fetch operations.

use thiserror::Error;

/// Boxed error source used by transport implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Message surfaced for any non-success HTTP status.
pub const FAILED_TO_FETCH: &str = "Failed to fetch data";

/// Error type for a single fetch attempt.
///
/// Every variant is converted into a human-readable message and stored in the
/// fetch state. [`FetchError::Aborted`] is the exception: an aborted attempt was
/// superseded on purpose and is never surfaced.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    ///
    /// The status code is kept for logging; the message is always
    /// [`FAILED_TO_FETCH`].
    #[error("Failed to fetch data")]
    Http {
        /// HTTP status code of the response.
        status: u16,
    },

    /// Transport failure (connection refused, DNS, timeout, ...).
    #[error(transparent)]
    Network(BoxError),

    /// The response body could not be decoded into the payload type.
    #[error(transparent)]
    Decode(BoxError),

    /// The key could not be turned into a request.
    #[error("invalid resource key `{0}`")]
    InvalidKey(String),

    /// The request was cancelled because it was superseded or detached.
    #[error("The operation was aborted")]
    Aborted,
}

impl FetchError {
    /// Wraps any error as a network failure.
    pub fn network(error: impl Into<BoxError>) -> Self {
        Self::Network(error.into())
    }

    /// Wraps any error as a decode failure.
    pub fn decode(error: impl Into<BoxError>) -> Self {
        Self::Decode(error.into())
    }

    /// Returns `true` for a voluntary cancellation.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}
