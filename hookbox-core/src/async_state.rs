//! Execution state of a wrapped async operation.
//!
//! [`AsyncState`] is what an executor publishes to its observers:
//!
//! - [`AsyncState::Idle`] - nothing has run yet
//! - [`AsyncState::Pending`] - an attempt is in flight
//! - [`AsyncState::Success`] - the last settled attempt produced a value
//! - [`AsyncState::Error`] - the last settled attempt failed
//!
//! Value and error are variant payloads, so at most one of them can ever be
//! present and both are gone as soon as the state goes back to `Pending`.

use std::fmt::{self, Display};
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Lifecycle stage of an async execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AsyncStatus {
    /// No execution has started.
    #[default]
    Idle,
    /// An execution is in flight.
    Pending,
    /// The last settled execution succeeded.
    Success,
    /// The last settled execution failed.
    Error,
}

impl AsyncStatus {
    /// Stable lowercase name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl Display for AsyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable state of an async execution.
///
/// The error is held behind an [`Arc`] so that snapshots can be cloned without
/// requiring the operation's error type to be `Clone`.
#[derive(Debug, PartialEq)]
pub enum AsyncState<T, E> {
    /// Initial state.
    Idle,
    /// An attempt is in flight; value and error are cleared.
    Pending,
    /// Result of the last settled attempt.
    Success(T),
    /// Failure of the last settled attempt.
    Error(Arc<E>),
}

impl<T, E> AsyncState<T, E> {
    /// Current lifecycle stage.
    pub fn status(&self) -> AsyncStatus {
        match self {
            Self::Idle => AsyncStatus::Idle,
            Self::Pending => AsyncStatus::Pending,
            Self::Success(_) => AsyncStatus::Success,
            Self::Error(_) => AsyncStatus::Error,
        }
    }

    /// Value of the last successful attempt, if the state is `Success`.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Failure of the last attempt, if the state is `Error`.
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Error(error) => Some(error.as_ref()),
            _ => None,
        }
    }

    /// Returns `true` for `Success` and `Error`.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Error(_))
    }

    /// Returns `true` while an attempt is in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl<T, E: Display> AsyncState<T, E> {
    /// Human-readable message of the failure, if the state is `Error`.
    pub fn error_message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }
}

impl<T, E> Default for AsyncState<T, E> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T: Clone, E> Clone for AsyncState<T, E> {
    fn clone(&self) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Pending => Self::Pending,
            Self::Success(value) => Self::Success(value.clone()),
            Self::Error(error) => Self::Error(Arc::clone(error)),
        }
    }
}

/// Serializes as `{ "status": ..., "value": ..., "error": ... }` with the
/// error rendered as its message.
impl<T, E> Serialize for AsyncState<T, E>
where
    T: Serialize,
    E: Display,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AsyncState", 3)?;
        state.serialize_field("status", &self.status())?;
        state.serialize_field("value", &self.value())?;
        state.serialize_field("error", &self.error_message())?;
        state.end()
    }
}
