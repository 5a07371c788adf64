//! Transport configuration.

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration of a [`ReqwestTransport`](crate::ReqwestTransport).
///
/// ```yaml
/// base_url: https://api.example.com/
/// timeout: 10s
/// headers:
///   Accept: application/json
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransportConfig {
    /// Base URL keys are resolved against. Without it every key must be an
    /// absolute URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Total request timeout of the underlying client (e.g., "10s", "500ms").
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    /// Headers sent with every request.
    #[serde(default)]
    pub headers: IndexMap<String, String>,
}

/// Error building a transport from a [`TransportConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `base_url` is not an absolute URL.
    #[error("invalid base url `{0}`")]
    InvalidBaseUrl(String),

    /// A header name is not valid.
    #[error(transparent)]
    InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),

    /// A header value is not valid.
    #[error(transparent)]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Client(#[from] reqwest::Error),
}
