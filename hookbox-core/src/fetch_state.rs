//! Fetch state and its reducer.
//!
//! A fetcher never assigns its state directly. Every transition goes through
//! [`FetchState::reduce`] with one of the [`FetchAction`]s, which keeps the
//! state machine small and easy to test on its own:
//!
//! ```text
//!            Fetching             Fetched(data)
//!   Idle ─────────────▶ Fetching ──────────────▶ Fetched
//!                          │  ▲                     │
//!              Error(msg)  │  └──── Fetching ───────┤
//!                          ▼                        │
//!                        Error ◀────────────────────┘
//! ```
//!
//! There is no action leading back to `Idle`.

use std::fmt::{self, Display};

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Lifecycle stage of a fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    /// No non-blank key has been requested yet.
    #[default]
    Idle,
    /// A request (or cache lookup) is in progress.
    Fetching,
    /// Data is available.
    Fetched,
    /// The last request failed.
    Error,
}

impl FetchStatus {
    /// Stable lowercase name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Fetched => "fetched",
            Self::Error => "error",
        }
    }
}

impl Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable state of a fetcher.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<P> {
    /// Initial state.
    Idle,
    /// A request is in progress.
    Fetching,
    /// Decoded payload of the current key.
    Fetched(P),
    /// Message of the failure for the current key.
    Error(String),
}

/// Transition requested by a fetcher.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchAction<P> {
    /// A new key is being resolved.
    Fetching,
    /// The payload for the current key is available.
    Fetched(P),
    /// Resolving the current key failed.
    Error(String),
}

impl<P> FetchState<P> {
    /// Applies `action` and returns the resulting state.
    pub fn reduce(self, action: FetchAction<P>) -> Self {
        match action {
            FetchAction::Fetching => Self::Fetching,
            FetchAction::Fetched(payload) => Self::Fetched(payload),
            FetchAction::Error(message) => Self::Error(message),
        }
    }

    /// In-place variant of [`reduce`](Self::reduce).
    pub fn apply(&mut self, action: FetchAction<P>) {
        let current = std::mem::take(self);
        *self = current.reduce(action);
    }

    /// Current lifecycle stage.
    pub fn status(&self) -> FetchStatus {
        match self {
            Self::Idle => FetchStatus::Idle,
            Self::Fetching => FetchStatus::Fetching,
            Self::Fetched(_) => FetchStatus::Fetched,
            Self::Error(_) => FetchStatus::Error,
        }
    }

    /// Payload, present only when the state is `Fetched`.
    pub fn data(&self) -> Option<&P> {
        match self {
            Self::Fetched(payload) => Some(payload),
            _ => None,
        }
    }

    /// Failure message, present only when the state is `Error`.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Returns `true` for `Fetched` and `Error`.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Fetched(_) | Self::Error(_))
    }
}

impl<P> Default for FetchState<P> {
    fn default() -> Self {
        Self::Idle
    }
}

/// Serializes as `{ "status": ..., "data": ..., "errorMessage": ... }`.
impl<P: Serialize> Serialize for FetchState<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FetchState", 3)?;
        state.serialize_field("status", &self.status())?;
        state.serialize_field("data", &self.data())?;
        state.serialize_field("errorMessage", &self.error_message())?;
        state.end()
    }
}
