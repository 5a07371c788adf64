//! Resource key type.
//!
//! A [`ResourceKey`] identifies the resource a fetcher requests (usually a URL).
//! It is used both as the cache key and as the identity that decides whether a
//! key change supersedes the in-flight request. Comparison is by exact string:
//! `"/users/1"` and `"/users/1 "` are different keys.
//!
//! ```
//! use hookbox_core::ResourceKey;
//!
//! let key = ResourceKey::from("/users/1");
//! assert_eq!(key.as_str(), "/users/1");
//! assert!(!key.is_blank());
//!
//! assert!(ResourceKey::from("   ").is_blank());
//! ```

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Identity of a fetchable resource.
///
/// Backed by [`SmolStr`], so short keys are stored inline and clones of long
/// keys only bump a reference count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(SmolStr);

impl ResourceKey {
    /// Creates a key from any string-like value.
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(SmolStr::new(key))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns `true` when the key is empty or contains only whitespace.
    ///
    /// Blank keys never trigger a request.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for ResourceKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for ResourceKey {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for ResourceKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ResourceKey {
    fn from(value: String) -> Self {
        Self(SmolStr::from(value))
    }
}

impl From<&String> for ResourceKey {
    fn from(value: &String) -> Self {
        Self::new(value)
    }
}

impl From<SmolStr> for ResourceKey {
    fn from(value: SmolStr) -> Self {
        Self(value)
    }
}
