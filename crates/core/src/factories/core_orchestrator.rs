//! The core request / mutation orchestrator.
//!
//! ### Queries
//!
//! - Derive the query key and look up its record in the store.
//! - Issue only if `force` is set, no record exists yet, or `retry` is set
//!   and the record is neither pending nor succeeded. Otherwise the call is
//!   a no-op and no completion is returned.
//! - Open a network handle and apply a single `request-start` event. Its
//!   abort handle covers the whole attempt chain. A handle that fails to
//!   open counts as an attempt that failed with status 0.
//! - Execute attempts on a spawned task. A retryable status re-opens the
//!   request after the backoff delay while attempts remain, the record
//!   stays pending in between.
//! - On the terminal outcome run the transforms and the merge engine,
//!   apply exactly one `request-success` or `request-failure` event and
//!   resolve the completion.
//!
//! ### Mutations
//!
//! - Never deduplicated, never retried.
//! - The optimistic fragment is merged by the `mutation-start` event,
//!   before anything is sent.
//! - On failure the optimistically touched fields, and only those, are
//!   rolled back through the rollback reducers.
//!
//! ### Cancellation
//!
//! Aborting is cooperative. An aborted chain still ends with one failure
//! event, carrying the status the transport reported. After a reset the
//! store drops that event.

use crate::query_key::query_key;
use rquery_api::{
    builder,
    event::LifecycleEvent,
    network::{DynNetwork, DynNetworkHandle, HttpMethod, NetworkOptions},
    orchestrator::*,
    request::{LocalUpdateMap, RequestConfig},
    store::{DynStore, Fragment},
    BoxFut, RqError, RqResult,
};
use std::sync::Arc;

mod back_off;
mod cancel;
mod in_flight;
mod merge;
mod mutation;
mod query;
mod terminal;

use back_off::BackOffPolicy;

/// CoreOrchestrator configuration types.
pub mod config {
    /// Configuration parameters for
    /// [CoreOrchestratorFactory](super::CoreOrchestratorFactory).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct CoreOrchestratorConfig {
        /// Attempts per query, counting the first one. Default: 5.
        pub max_attempts: u32,
        /// Delay before the first retry. Default: 300 ms.
        pub min_duration_ms: u32,
        /// Upper bound of any retry delay. Default: 5000 ms.
        pub max_duration_ms: u32,
        /// Growth of the delay per attempt. Default: 2.0.
        pub backoff_factor: f64,
        /// Random deviation as a fraction of the delay, in `[0, 1]`.
        /// Default: 0.0.
        pub backoff_jitter: f64,
        /// Statuses that are worth another attempt.
        /// Default: `[0, 408, 429, 503, 504]`.
        pub retryable_status_codes: Vec<u16>,
    }

    impl Default for CoreOrchestratorConfig {
        fn default() -> Self {
            Self {
                max_attempts: 5,
                min_duration_ms: 300,
                max_duration_ms: 5000,
                backoff_factor: 2.0,
                backoff_jitter: 0.0,
                // 0 normally means a failed connection
                retryable_status_codes: vec![0, 408, 429, 503, 504],
            }
        }
    }

    /// Module-level configuration for CoreOrchestrator.
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct CoreOrchestratorModConfig {
        /// CoreOrchestrator configuration.
        pub core_orchestrator: CoreOrchestratorConfig,
    }
}

use config::*;

/// The production-ready orchestrator.
#[derive(Debug)]
pub struct CoreOrchestratorFactory {}

impl CoreOrchestratorFactory {
    /// Construct a new CoreOrchestratorFactory.
    pub fn create() -> DynOrchestratorFactory {
        Arc::new(Self {})
    }
}

impl OrchestratorFactory for CoreOrchestratorFactory {
    fn default_config(
        &self,
        config: &mut rquery_api::config::Config,
    ) -> RqResult<()> {
        config.set_module_config(&CoreOrchestratorModConfig::default())?;
        Ok(())
    }

    fn create(
        &self,
        builder: Arc<builder::Builder>,
        store: DynStore,
        network: DynNetwork,
    ) -> BoxFut<'static, RqResult<DynOrchestrator>> {
        Box::pin(async move {
            let config: CoreOrchestratorModConfig =
                builder.config.get_module_config()?;
            let out: DynOrchestrator = Arc::new(CoreOrchestrator::new(
                config.core_orchestrator,
                store,
                network,
            ));
            Ok(out)
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CoreOrchestrator {
    store: DynStore,
    network: DynNetwork,
    back_off: Arc<BackOffPolicy>,
}

impl CoreOrchestrator {
    pub(crate) fn new(
        config: CoreOrchestratorConfig,
        store: DynStore,
        network: DynNetwork,
    ) -> Self {
        Self {
            store,
            network,
            back_off: Arc::new(BackOffPolicy::new(&config)),
        }
    }

    /// Open the handle of one attempt.
    ///
    /// Only precondition violations are returned as `Err`. Any other open
    /// failure becomes an attempt that resolves with that failure, so it
    /// reaches the caller through the terminal event like every transport
    /// error.
    fn open_attempt(
        &self,
        url: &str,
        method: HttpMethod,
        options: NetworkOptions,
    ) -> RqResult<DynNetworkHandle> {
        match self.network.open(url, method, options) {
            Ok(handle) => Ok(handle),
            Err(err) if err.is_precondition() => Err(err),
            Err(err) => {
                tracing::warn!(url, %method, %err, "failed to open request");
                Ok(Arc::new(in_flight::FailedOpen::new(err)))
            }
        }
    }
}

fn require_url(request: &RequestConfig) -> RqResult<()> {
    if request.url.is_empty() {
        return Err(RqError::precondition(
            "Missing required `url` field in request",
        ));
    }
    Ok(())
}

impl Orchestrator for CoreOrchestrator {
    fn query(&self, request: RequestConfig) -> RqResult<Option<Completion>> {
        self.issue_query(request)
    }

    fn mutate(&self, request: RequestConfig) -> RqResult<Completion> {
        self.issue_mutation(request)
    }

    fn cancel(&self, query_key: &str) -> RqResult<()> {
        self.cancel_query(query_key)
    }

    fn reset(&self) {
        self.reset_all(None);
    }

    fn reset_to(&self, entities: Fragment) {
        self.reset_all(Some(entities));
    }

    fn update_entities(&self, update: LocalUpdateMap) {
        let entities = merge::update_local(&update, &self.store.entities());
        self.store.apply(LifecycleEvent::UpdateEntities { entities });
    }

    fn remove_entity(&self, path: Vec<String>) {
        self.store.apply(LifecycleEvent::RemoveEntity { path });
    }

    fn remove_entities(&self, paths: Vec<Vec<String>>) {
        self.store.apply(LifecycleEvent::RemoveEntities { paths });
    }
}
