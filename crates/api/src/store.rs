//! rquery store substrate types.
//!
//! The store holds four slices: query records, entities, results and
//! errors. Orchestrators never write them directly. They read snapshots
//! and hand [LifecycleEvent]s to [Store::apply], which folds each event
//! into the slices atomically.

use crate::{event::LifecycleEvent, network::Headers, *};
#[cfg(any(test, feature = "mockall"))]
use mockall::automock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A fragment of the entity store: entity kind name to entity data.
pub type Fragment = serde_json::Map<String, serde_json::Value>;

/// The normalized entity store.
pub type Entities = Fragment;

/// The result store, one fragment per query key.
pub type Results = BTreeMap<QueryKey, Fragment>;

/// The most recent failure recorded for a query key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorRecord {
    /// The parsed response body.
    pub response_body: Option<serde_json::Value>,

    /// The raw response text.
    pub response_text: Option<String>,

    /// The response headers.
    pub response_headers: Headers,
}

/// The error slice.
pub type Errors = BTreeMap<QueryKey, ErrorRecord>;

/// Something that can cancel an in-flight request.
pub trait AbortHandle: 'static + Send + Sync + std::fmt::Debug {
    /// Request cancellation of whatever is currently in flight.
    fn abort(&self);
}

/// Trait-object [AbortHandle].
pub type DynAbortHandle = Arc<dyn AbortHandle>;

/// State tracked per query key.
///
/// `is_pending` and the presence of `network_handle` always go together.
#[derive(Debug, Clone, Default)]
pub struct QueryRecord {
    /// A request for this key is in flight, retries included.
    pub is_pending: bool,

    /// At least one terminal response has been recorded.
    pub is_finished: bool,

    /// Status of the last terminal response.
    pub status: Option<u16>,

    /// Headers of the last terminal response.
    pub headers: Option<Headers>,

    /// When the last terminal response was recorded.
    pub last_updated: Option<Timestamp>,

    /// Number of terminal responses recorded for this key.
    pub query_count: u64,

    /// Aborts the request in flight. Only present while pending.
    pub network_handle: Option<DynAbortHandle>,
}

impl QueryRecord {
    /// True if the last terminal status was 2xx.
    pub fn has_succeeded(&self) -> bool {
        matches!(self.status, Some(s) if s / 100 == 2)
    }
}

/// The query slice.
pub type Queries = BTreeMap<QueryKey, QueryRecord>;

/// The store substrate.
///
/// Reads return snapshots, [Store::apply] must fold an event into all
/// slices as one atomic step and then notify observers.
#[cfg_attr(any(test, feature = "mockall"), automock)]
pub trait Store: 'static + Send + Sync + std::fmt::Debug {
    /// The record for a query key, if one exists.
    fn query(&self, query_key: &QueryKey) -> Option<QueryRecord>;

    /// All query records.
    fn queries(&self) -> Queries;

    /// The entity store.
    fn entities(&self) -> Entities;

    /// The result fragment stored for a query key.
    fn result(&self, query_key: &QueryKey) -> Option<Fragment>;

    /// The whole result store.
    fn results(&self) -> Results;

    /// The last error recorded for a query key.
    fn error(&self, query_key: &QueryKey) -> Option<ErrorRecord>;

    /// Fold a lifecycle event into the slices.
    fn apply(&self, event: LifecycleEvent);
}

/// Trait-object [Store].
pub type DynStore = Arc<dyn Store>;

/// A factory for creating [Store] instances.
pub trait StoreFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut config::Config) -> RqResult<()>;

    /// Construct a store instance.
    fn create(
        &self,
        builder: Arc<builder::Builder>,
    ) -> BoxFut<'static, RqResult<DynStore>>;
}

/// Trait-object [StoreFactory].
pub type DynStoreFactory = Arc<dyn StoreFactory>;
