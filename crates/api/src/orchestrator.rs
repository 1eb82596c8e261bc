//! The caller-facing orchestrator trait.

use crate::{
    network::DynNetwork,
    request::{LocalUpdateMap, QueryResponse, RequestConfig},
    store::{DynStore, Fragment},
    *,
};
use std::sync::Arc;

/// Resolves once, with the terminal outcome of a query or mutation.
///
/// Transport failures resolve `Ok` with the failure status. An `Err` only
/// means the task driving the request was torn down before it finished.
pub type Completion = BoxFut<'static, RqResult<QueryResponse>>;

/// Drives queries and mutations against a [Store](crate::store::Store)
/// through a [Network](crate::network::Network).
pub trait Orchestrator: 'static + Send + Sync + std::fmt::Debug {
    /// Issue a query, unless one for the same key is pending or has
    /// already succeeded, in which case `Ok(None)` is returned and
    /// nothing is dispatched. `force` and `retry` relax that guard.
    ///
    /// Missing `url` or `update` is an `Err`.
    fn query(&self, request: RequestConfig) -> RqResult<Option<Completion>>;

    /// Issue a mutation. Mutations are never deduplicated and never
    /// retried.
    ///
    /// Missing `url` is an `Err`.
    fn mutate(&self, request: RequestConfig) -> RqResult<Completion>;

    /// Abort the pending request for `query_key`. Cancelling a key that is
    /// not in flight only logs a warning.
    ///
    /// An empty `query_key` is an `Err`.
    fn cancel(&self, query_key: &str) -> RqResult<()>;

    /// Abort every pending request and clear the store.
    fn reset(&self);

    /// Abort every pending request, clear the store and seed the entity
    /// store with `entities`.
    fn reset_to(&self, entities: Fragment);

    /// Apply local per-field reducers to the entity store.
    fn update_entities(&self, update: LocalUpdateMap);

    /// Remove a nested path from the entity store.
    fn remove_entity(&self, path: Vec<String>);

    /// Remove several nested paths from the entity store.
    fn remove_entities(&self, paths: Vec<Vec<String>>);
}

/// Trait-object [Orchestrator].
pub type DynOrchestrator = Arc<dyn Orchestrator>;

/// A factory for creating [Orchestrator] instances.
pub trait OrchestratorFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut config::Config) -> RqResult<()>;

    /// Construct an orchestrator instance.
    fn create(
        &self,
        builder: Arc<builder::Builder>,
        store: DynStore,
        network: DynNetwork,
    ) -> BoxFut<'static, RqResult<DynOrchestrator>>;
}

/// Trait-object [OrchestratorFactory].
pub type DynOrchestratorFactory = Arc<dyn OrchestratorFactory>;
