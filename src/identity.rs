//! Object identities.
//!
//! An [`Identity`] names one remote object for its entire lifetime and is the
//! only key the evictor indexes by. Comparison and hashing are byte-exact over
//! the underlying string: no case folding, trimming or Unicode normalization.
//!
//! The string is held in an `Arc<str>` so the index, the recency list and every
//! in-flight dispatch can share one allocation.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Stable, opaque name of a remote object.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(Arc<str>);

impl Identity {
    /// Creates an identity from any string-like value.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the identity as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the length of the identity in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty identity.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Identity").field(&&*self.0).finish()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<&String> for Identity {
    fn from(value: &String) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// `Hash` for `Arc<str>` delegates to `str`, so map lookups by `&str` agree
// with lookups by `Identity`.
impl Borrow<str> for Identity {
    fn borrow(&self) -> &str {
        &self.0
    }
}
