#![warn(missing_docs)]
//! # hookbox-core
//!
//! Core state types and collaborator traits for the hookbox async state engines.
//!
//! This crate holds everything the engines in `hookbox` publish or depend on,
//! without any runtime logic of its own:
//!
//! - **Published state** - [`AsyncState`] for executors, [`FetchState`] for
//!   fetchers, together with their status enums
//! - **Transitions** - [`FetchAction`] and the [`FetchState::reduce`] reducer
//! - **Failures** - [`FetchError`], the error taxonomy of a single fetch attempt
//! - **Collaborators** - [`Transport`] (the network capability) and
//!   [`ResponseCache`] (storage for decoded payloads)
//!
//! Host code that only renders state can depend on this crate alone.

pub mod async_state;
pub mod cache;
pub mod error;
pub mod fetch_state;
pub mod key;
pub mod transport;

pub use async_state::{AsyncState, AsyncStatus};
pub use cache::ResponseCache;
pub use error::{BoxError, FAILED_TO_FETCH, FetchError};
pub use fetch_state::{FetchAction, FetchState, FetchStatus};
pub use key::ResourceKey;
pub use transport::Transport;

/// Token handed to [`Transport::fetch`], cancelled when the request is superseded.
pub use tokio_util::sync::CancellationToken;
