//! The identity of a logical request.

use std::sync::Arc;

/// Canonical string identity of a logical request.
///
/// Derived from a request's url and body (or given explicitly by the
/// caller), a query key is the sole identity used for deduplication,
/// record lookup and cancellation. See `rquery_core::query_key` for
/// the derivation.
#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct QueryKey(Arc<str>);

impl std::fmt::Debug for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("QueryKey").field(&&*self.0).finish()
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::ops::Deref for QueryKey {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for QueryKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for QueryKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for QueryKey {
    fn from(s: String) -> Self {
        Self(s.into_boxed_str().into())
    }
}

impl From<&str> for QueryKey {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}
