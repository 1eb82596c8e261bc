#![deny(missing_docs)]
//! rquery API contains the module traits and the plain data types required
//! to define the api of those traits.
//!
//! The orchestration engine itself (query key derivation, retry with
//! backoff, the merge engine, optimistic updates and rollback) lives in
//! the rquery_core crate. This crate only describes the seams:
//!
//! - [network::Network] / [network::NetworkHandle] - the transport that
//!   actually issues a request.
//! - [store::Store] - the substrate holding the queries, entities, results
//!   and errors slices, folding [event::LifecycleEvent]s into them.
//! - [orchestrator::Orchestrator] - the caller-facing engine.

/// Boxed future type.
pub type BoxFut<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

pub mod builder;
pub mod config;
pub mod doc;
pub mod event;
pub mod network;
pub mod orchestrator;
pub mod request;
pub mod store;

mod error;
pub use error::*;

mod query_key;
pub use query_key::*;

mod timestamp;
pub use timestamp::*;
