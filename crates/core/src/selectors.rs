//! Read-side helpers over the query slice, looked up by request descriptor.
//!
//! Each selector derives the query key of the descriptor, so a view only
//! needs the same [RequestConfig] it dispatched. `None` means there is no
//! record for the key yet.

use crate::query_key::query_key;
use rquery_api::{
    network::Headers,
    request::RequestConfig,
    store::{ErrorRecord, Queries, QueryRecord, Store},
    Timestamp,
};

fn record<'a>(
    queries: &'a Queries,
    request: &RequestConfig,
) -> Option<&'a QueryRecord> {
    queries.get(&query_key(request))
}

/// Whether at least one terminal response was recorded.
pub fn is_finished(queries: &Queries, request: &RequestConfig) -> Option<bool> {
    record(queries, request).map(|r| r.is_finished)
}

/// Whether a request is in flight.
pub fn is_pending(queries: &Queries, request: &RequestConfig) -> Option<bool> {
    record(queries, request).map(|r| r.is_pending)
}

/// The last terminal status.
pub fn status(queries: &Queries, request: &RequestConfig) -> Option<u16> {
    record(queries, request).and_then(|r| r.status)
}

/// The last terminal response headers.
pub fn headers(queries: &Queries, request: &RequestConfig) -> Option<Headers> {
    record(queries, request).and_then(|r| r.headers.clone())
}

/// When the last terminal response was recorded.
pub fn last_updated(
    queries: &Queries,
    request: &RequestConfig,
) -> Option<Timestamp> {
    record(queries, request).and_then(|r| r.last_updated)
}

/// How many terminal responses were recorded.
pub fn query_count(queries: &Queries, request: &RequestConfig) -> Option<u64> {
    record(queries, request).map(|r| r.query_count)
}

/// The last error recorded for the descriptor's key.
pub fn error(store: &dyn Store, request: &RequestConfig) -> Option<ErrorRecord> {
    store.error(&query_key(request))
}

#[cfg(test)]
mod test {
    use super::*;
    use rquery_api::QueryKey;
    use serde_json::json;

    fn rename_config() -> RequestConfig {
        RequestConfig::new("/api/dashboard/1/rename")
            .with_body(json!({ "name": "My KPIs" }))
    }

    fn queries_with(key: QueryKey, record: QueryRecord) -> Queries {
        let mut queries = Queries::new();
        queries.insert(key, record);
        queries
    }

    #[test]
    fn is_finished_with_a_config() {
        let config = rename_config();
        let queries = queries_with(
            query_key(&config),
            QueryRecord {
                is_finished: true,
                ..Default::default()
            },
        );
        assert_eq!(Some(true), is_finished(&queries, &config));
    }

    #[test]
    fn is_finished_with_an_explicit_key() {
        let config = rename_config().with_query_key("myQueryKey");
        let queries = queries_with(
            "myQueryKey".into(),
            QueryRecord {
                is_finished: true,
                ..Default::default()
            },
        );
        assert_eq!(Some(true), is_finished(&queries, &config));
    }

    #[test]
    fn is_pending_with_a_config() {
        let config = rename_config();
        let queries = queries_with(
            query_key(&config),
            QueryRecord {
                is_pending: true,
                ..Default::default()
            },
        );
        assert_eq!(Some(true), is_pending(&queries, &config));
    }

    #[test]
    fn status_headers_count_and_timestamp() {
        let config = rename_config().with_query_key("myQueryKey");
        let mut h = Headers::new();
        h.insert("hello".into(), "world".into());
        let queries = queries_with(
            "myQueryKey".into(),
            QueryRecord {
                status: Some(504),
                headers: Some(h.clone()),
                last_updated: Some(Timestamp::from_micros(7)),
                query_count: 3,
                ..Default::default()
            },
        );
        assert_eq!(Some(504), status(&queries, &config));
        assert_eq!(Some(h), headers(&queries, &config));
        assert_eq!(Some(Timestamp::from_micros(7)), last_updated(&queries, &config));
        assert_eq!(Some(3), query_count(&queries, &config));
    }

    #[test]
    fn unknown_key_selects_nothing() {
        let queries = Queries::new();
        let config = rename_config();
        assert_eq!(None, is_finished(&queries, &config));
        assert_eq!(None, is_pending(&queries, &config));
        assert_eq!(None, status(&queries, &config));
        assert_eq!(None, query_count(&queries, &config));
    }
}
