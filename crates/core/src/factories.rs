//! Factories for generating instances of rquery modules.

pub mod core_orchestrator;
pub use core_orchestrator::CoreOrchestratorFactory;

pub mod mem_store;
pub use mem_store::{MemStore, MemStoreFactory};

pub mod mem_network;
pub use mem_network::{MemNetwork, MemNetworkFactory};
