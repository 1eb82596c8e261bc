#![deny(missing_docs)]
//! rquery request / mutation orchestration engine.
//!
//! Given a declarative [RequestConfig](rquery_api::request::RequestConfig),
//! the engine guarantees at most one in-flight request per query key,
//! retries transient failures with exponential backoff, merges successful
//! responses into a normalized entity store through caller-supplied
//! reducers, and supports optimistic mutations with rollback on failure.

use rquery_api::{builder::Builder, config::Config, network::DynNetworkFactory};

/// Construct a default builder around a network implementation.
///
/// - `store` - The default store is [factories::MemStoreFactory].
/// - `orchestrator` - The default orchestrator is
///   [factories::CoreOrchestratorFactory].
pub fn default_builder(network: DynNetworkFactory) -> Builder {
    Builder {
        config: Config::default(),
        store: factories::MemStoreFactory::create(),
        network,
        orchestrator: factories::CoreOrchestratorFactory::create(),
    }
}

/// Construct a builder for testing.
///
/// Like [default_builder], but the network is a fresh
/// [factories::MemNetwork].
pub fn default_test_builder() -> Builder {
    default_builder(factories::MemNetworkFactory::create())
}

mod abort;

pub mod factories;
pub mod query_key;
pub mod selectors;
