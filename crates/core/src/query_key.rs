//! Query key derivation.
//!
//! A query key is an explicit key if the caller supplied one, otherwise
//! the canonical serialization of `{"url": .., "body": ..}`. Object keys
//! inside the body are sorted recursively, so structurally equal bodies
//! always derive the same key no matter how their maps were built. The
//! method is not part of the key.

use rquery_api::{request::RequestConfig, QueryKey};
use serde_json::Value;

/// Derive the query key of a request descriptor.
pub fn query_key(request: &RequestConfig) -> QueryKey {
    derive_key(&request.url, request.body.as_ref(), request.query_key.as_ref())
}

/// Derive a query key from its parts.
pub fn derive_key(
    url: &str,
    body: Option<&Value>,
    explicit_key: Option<&QueryKey>,
) -> QueryKey {
    if let Some(key) = explicit_key {
        return key.clone();
    }

    let mut key = String::from("{\"url\":");
    key.push_str(&to_json(&Value::from(url)));
    if let Some(body) = body {
        key.push_str(",\"body\":");
        key.push_str(&to_json(&sorted(body)));
    }
    key.push('}');
    key.into()
}

/// Rebuild `value` with every object's keys inserted in sorted order.
///
/// `serde_json` keeps insertion order once its `preserve_order` feature is
/// enabled anywhere in the dependency graph.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries = map.iter().collect::<Vec<_>>();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

fn to_json(value: &Value) -> String {
    // serializing a Value cannot fail
    serde_json::to_string(value).unwrap_or_default()
}
