#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod config;
mod transport;

pub use config::{ConfigError, TransportConfig};
pub use transport::ReqwestTransport;

// Re-export common types
pub use hookbox_core::{CancellationToken, FetchError, ResourceKey, Transport};
