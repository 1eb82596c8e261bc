//! The caller-facing request descriptor and completion types.

use crate::{
    network::{Credentials, Headers, HttpMethod, NetworkOptions},
    store::Fragment,
    QueryKey,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Folds a transformed response value into a prior store value:
/// `(prior, transformed) -> new`. Also used for rollback as
/// `(prior, post_attempt) -> restored`.
pub type Reducer = Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>;

/// Computes a speculative value from a prior store value.
pub type OptimisticReducer = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Per-field reducers applied on success.
pub type UpdateMap = HashMap<String, Reducer>;

/// Per-field optimistic reducers. A `None` reducer passes the prior value
/// through, the field still counts as optimistically touched.
pub type OptimisticMap = HashMap<String, Option<OptimisticReducer>>;

/// Per-field rollback reducers applied when a mutation fails.
pub type RollbackMap = HashMap<String, Reducer>;

/// Per-field reducers for local entity updates, without a request.
pub type LocalUpdateMap = HashMap<String, OptimisticReducer>;

/// Turns a raw response `(body, text)` into the value fed to the reducers.
pub type Transform =
    Arc<dyn Fn(Option<&Value>, Option<&str>) -> Value + Send + Sync>;

/// Called with the raw response body.
pub type ResponseCallback = Arc<dyn Fn(Option<&Value>) + Send + Sync>;

/// The default transform: the parsed body, `Null` if there is none.
pub fn identity_transform() -> Transform {
    Arc::new(|body: Option<&Value>, _text: Option<&str>| {
        body.cloned().unwrap_or(Value::Null)
    })
}

/// Transport options of a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Request method, GET for queries and POST for mutations if `None`.
    pub method: Option<HttpMethod>,

    /// Extra request headers.
    pub headers: Headers,

    /// Credentials policy.
    pub credentials: Option<Credentials>,

    /// Send the body as multipart form data (POST only).
    pub multipart: bool,
}

/// Declarative description of a query or a mutation.
///
/// `url` is always required, `update` is required for queries.
#[derive(Clone, Default)]
pub struct RequestConfig {
    /// The request url.
    pub url: String,

    /// The request body.
    pub body: Option<Value>,

    /// Issue even if a record for this key exists.
    pub force: bool,

    /// Issue again if the last attempt did not succeed.
    pub retry: bool,

    /// Response to entity-update input, identity if `None`.
    pub transform: Option<Transform>,

    /// Response to result-update input, identity if `None`.
    pub transform_result: Option<Transform>,

    /// Entity reducers applied on success.
    pub update: Option<UpdateMap>,

    /// Result reducers applied on success.
    pub update_result: Option<UpdateMap>,

    /// Speculative entity reducers (mutations only).
    pub optimistic_update: Option<OptimisticMap>,

    /// Rollback reducers (mutations only).
    pub rollback: Option<RollbackMap>,

    /// Transport options.
    pub options: RequestOptions,

    /// Opaque passthrough data, copied into the lifecycle events.
    pub meta: Option<Value>,

    /// Explicit query key, overrides the derived one.
    pub query_key: Option<QueryKey>,

    /// Called with the response body before the success event is applied.
    pub on_success: Option<ResponseCallback>,

    /// Called with the response body before the failure event is applied.
    pub on_error: Option<ResponseCallback>,
}

impl std::fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn fields<V>(m: &Option<HashMap<String, V>>) -> Option<Vec<&str>> {
            m.as_ref().map(|m| {
                let mut k = m.keys().map(String::as_str).collect::<Vec<_>>();
                k.sort_unstable();
                k
            })
        }

        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("body", &self.body)
            .field("force", &self.force)
            .field("retry", &self.retry)
            .field("update", &fields(&self.update))
            .field("update_result", &fields(&self.update_result))
            .field("optimistic_update", &fields(&self.optimistic_update))
            .field("rollback", &fields(&self.rollback))
            .field("options", &self.options)
            .field("meta", &self.meta)
            .field("query_key", &self.query_key)
            .finish()
    }
}

impl RequestConfig {
    /// A descriptor for `url` with nothing else set.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the request body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add an entity reducer for `field`.
    pub fn with_update<F>(mut self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
    {
        self.update
            .get_or_insert_with(Default::default)
            .insert(field.into(), Arc::new(f));
        self
    }

    /// Add a result reducer for `field`.
    pub fn with_update_result<F>(
        mut self,
        field: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
    {
        self.update_result
            .get_or_insert_with(Default::default)
            .insert(field.into(), Arc::new(f));
        self
    }

    /// Add an optimistic reducer for `field`.
    pub fn with_optimistic_update<F>(
        mut self,
        field: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.optimistic_update
            .get_or_insert_with(Default::default)
            .insert(field.into(), Some(Arc::new(f)));
        self
    }

    /// Mark `field` as optimistically touched without changing it.
    pub fn with_optimistic_passthrough(
        mut self,
        field: impl Into<String>,
    ) -> Self {
        self.optimistic_update
            .get_or_insert_with(Default::default)
            .insert(field.into(), None);
        self
    }

    /// Add a rollback reducer for `field`.
    pub fn with_rollback<F>(mut self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
    {
        self.rollback
            .get_or_insert_with(Default::default)
            .insert(field.into(), Arc::new(f));
        self
    }

    /// Set the entity transform.
    pub fn with_transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Value>, Option<&str>) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }

    /// Set the result transform.
    pub fn with_transform_result<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Value>, Option<&str>) -> Value + Send + Sync + 'static,
    {
        self.transform_result = Some(Arc::new(f));
        self
    }

    /// Set the request method.
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.options.method = Some(method);
        self
    }

    /// Add a request header.
    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.options.headers.insert(name.into(), value.into());
        self
    }

    /// Set the credentials policy.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.options.credentials = Some(credentials);
        self
    }

    /// Send the body as multipart form data.
    pub fn with_multipart(mut self) -> Self {
        self.options.multipart = true;
        self
    }

    /// Set passthrough data.
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Use an explicit query key.
    pub fn with_query_key(mut self, query_key: impl Into<QueryKey>) -> Self {
        self.query_key = Some(query_key.into());
        self
    }

    /// Issue even if a record for this key exists.
    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Issue again if the last attempt did not succeed.
    pub fn retry(mut self) -> Self {
        self.retry = true;
        self
    }

    /// Call `f` with the response body on success.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Value>) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(f));
        self
    }

    /// Call `f` with the response body on failure.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Value>) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// The options handed to the network when opening a handle.
    pub fn network_options(&self) -> NetworkOptions {
        NetworkOptions {
            body: self.body.clone(),
            headers: self.options.headers.clone(),
            credentials: self.options.credentials,
            multipart: self.options.multipart,
        }
    }
}

/// What an orchestrated call resolves with.
///
/// The last four fields are only present on success.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    /// The terminal status, 0 if no response was received.
    pub status: u16,
    /// The parsed response body.
    pub body: Option<Value>,
    /// The raw response text.
    pub text: Option<String>,
    /// The response headers.
    pub headers: Headers,
    /// Time from issue to terminal response, retries included.
    pub duration: Duration,
    /// Output of the entity transform.
    pub transformed: Option<Value>,
    /// The merged entity fragment.
    pub entities: Option<Fragment>,
    /// Output of the result transform.
    pub transformed_result: Option<Value>,
    /// The merged result fragment.
    pub results: Option<Fragment>,
}

impl QueryResponse {
    /// True if the terminal status was 2xx.
    pub fn is_ok(&self) -> bool {
        self.status / 100 == 2
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_setters() {
        let request = RequestConfig::new("/items")
            .with_body(json!({ "page": 1 }))
            .with_update("items", |_prior, next| next.clone())
            .with_optimistic_passthrough("user")
            .with_method(HttpMethod::Put)
            .with_header("x-token", "abc")
            .with_multipart()
            .force();

        assert_eq!("/items", request.url);
        assert!(request.force);
        assert!(!request.retry);
        assert!(request.update.as_ref().unwrap().contains_key("items"));
        assert!(request.optimistic_update.as_ref().unwrap()["user"].is_none());

        let options = request.network_options();
        assert_eq!(Some(json!({ "page": 1 })), options.body);
        assert_eq!("abc", options.headers["x-token"]);
        assert!(options.multipart);
    }

    #[test]
    fn debug_lists_reducer_fields() {
        let request = RequestConfig::new("/items")
            .with_update("b", |_, n| n.clone())
            .with_update("a", |_, n| n.clone());
        let dbg = format!("{request:?}");
        assert!(dbg.contains(r#"update: Some(["a", "b"])"#), "{dbg}");
    }

    #[test]
    fn identity_transform_passes_body() {
        let t = identity_transform();
        assert_eq!(json!({ "a": 1 }), t(Some(&json!({ "a": 1 })), None));
        assert_eq!(Value::Null, t(None, Some("plain text")));
    }
}
