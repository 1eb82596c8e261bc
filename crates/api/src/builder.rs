//! Builder-related types.

use crate::{
    network::DynNetworkFactory,
    orchestrator::{DynOrchestrator, DynOrchestratorFactory},
    store::{DynStore, DynStoreFactory},
    *,
};
use std::sync::Arc;

/// The general rquery builder.
/// This contains both configuration and factory instances,
/// allowing construction of runtime module instances.
#[derive(Debug)]
pub struct Builder {
    /// The module configuration to be used when building modules.
    /// This can be loaded from disk or modified before building.
    pub config: config::Config,

    /// The [store::StoreFactory] to be used for creating the
    /// [store::Store] substrate.
    pub store: DynStoreFactory,

    /// The [network::NetworkFactory] to be used for creating
    /// [network::Network] instances.
    pub network: DynNetworkFactory,

    /// The [orchestrator::OrchestratorFactory] to be used for creating
    /// [orchestrator::Orchestrator] instances.
    pub orchestrator: DynOrchestratorFactory,
}

/// A running store plus the orchestrator driving it.
#[derive(Debug, Clone)]
pub struct Engine {
    /// The store substrate.
    pub store: DynStore,

    /// The orchestrator.
    pub orchestrator: DynOrchestrator,
}

impl Builder {
    /// Construct a default config given the configured module factories.
    pub fn with_default_config(mut self) -> RqResult<Self> {
        {
            let Self {
                config,
                store,
                network,
                orchestrator,
            } = &mut self;

            store.default_config(config)?;
            network.default_config(config)?;
            orchestrator.default_config(config)?;
        }

        Ok(self)
    }

    /// Create the store, the network and the orchestrator, in that order.
    pub async fn build(self) -> RqResult<Engine> {
        let builder = Arc::new(self);
        let store = builder.store.create(builder.clone()).await?;
        let network = builder.network.create(builder.clone()).await?;
        let orchestrator = builder
            .orchestrator
            .create(builder.clone(), store.clone(), network)
            .await?;
        Ok(Engine {
            store,
            orchestrator,
        })
    }
}
