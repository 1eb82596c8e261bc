//! Lifecycle events emitted by the orchestrators and folded into the
//! store by [Store::apply](crate::store::Store::apply).

use crate::{
    network::Headers,
    store::{DynAbortHandle, Fragment},
    QueryKey,
};
use std::time::Duration;

/// Payload of a terminal success event.
#[derive(Debug, Clone)]
pub struct SuccessEvent {
    /// The derived query key.
    pub query_key: QueryKey,
    /// The request url.
    pub url: String,
    /// The request body.
    pub body: Option<serde_json::Value>,
    /// Caller supplied passthrough data.
    pub meta: Option<serde_json::Value>,
    /// The response status.
    pub status: u16,
    /// Time from issue to terminal response, retries included.
    pub duration: Duration,
    /// The parsed response body.
    pub response_body: Option<serde_json::Value>,
    /// The raw response text.
    pub response_text: Option<String>,
    /// The response headers.
    pub response_headers: Headers,
    /// Entity fields to merge into the entity store.
    pub entities: Fragment,
    /// Result fields to merge into the result store under `query_key`.
    pub results: Fragment,
    /// The handle of the request this event ends. See [FailureEvent::chain].
    pub chain: Option<DynAbortHandle>,
}

/// Payload of a terminal failure event.
#[derive(Debug, Clone)]
pub struct FailureEvent {
    /// The derived query key.
    pub query_key: QueryKey,
    /// The request url.
    pub url: String,
    /// The request body.
    pub body: Option<serde_json::Value>,
    /// Caller supplied passthrough data.
    pub meta: Option<serde_json::Value>,
    /// The last status received, 0 if none.
    pub status: u16,
    /// Time from issue to terminal response, retries included.
    pub duration: Duration,
    /// The parsed response body.
    pub response_body: Option<serde_json::Value>,
    /// The raw response text.
    pub response_text: Option<String>,
    /// The response headers.
    pub response_headers: Headers,
    /// Restored values for optimistically touched entity fields.
    /// Always `None` for queries.
    pub rolled_back_entities: Option<Fragment>,
    /// The handle of the request this event ends, as announced by its
    /// start event.
    ///
    /// A store drops the event if its request started before the last
    /// reset. `None` applies unconditionally.
    pub chain: Option<DynAbortHandle>,
}

/// Everything the core hands to the store substrate.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// A query attempt chain started.
    RequestStart {
        /// The derived query key.
        query_key: QueryKey,
        /// The request url.
        url: String,
        /// The request body.
        body: Option<serde_json::Value>,
        /// Caller supplied passthrough data.
        meta: Option<serde_json::Value>,
        /// Aborts whichever attempt of the chain is in flight.
        network_handle: DynAbortHandle,
    },

    /// A query finished successfully.
    RequestSuccess(SuccessEvent),

    /// A query failed for good.
    RequestFailure(FailureEvent),

    /// A mutation started.
    MutationStart {
        /// The derived query key.
        query_key: QueryKey,
        /// The request url.
        url: String,
        /// The request body.
        body: Option<serde_json::Value>,
        /// Caller supplied passthrough data.
        meta: Option<serde_json::Value>,
        /// Aborts the mutation request.
        network_handle: DynAbortHandle,
        /// Speculative entity fields to merge right away.
        optimistic_entities: Option<Fragment>,
    },

    /// A mutation finished successfully.
    MutationSuccess(SuccessEvent),

    /// A mutation failed.
    MutationFailure(FailureEvent),

    /// A pending query was cancelled.
    Cancel {
        /// The cancelled key.
        query_key: QueryKey,
    },

    /// Clear every slice. Entities are seeded with `entities` if given.
    Reset {
        /// Seed for the entity store.
        entities: Option<Fragment>,
    },

    /// Merge a locally computed fragment into the entity store.
    UpdateEntities {
        /// The fields to merge.
        entities: Fragment,
    },

    /// Delete one nested path from the entity store.
    RemoveEntity {
        /// Path of object keys, the last one is removed.
        path: Vec<String>,
    },

    /// Delete several nested paths from the entity store.
    RemoveEntities {
        /// Paths of object keys, the last key of each is removed.
        paths: Vec<Vec<String>>,
    },
}

impl LifecycleEvent {
    /// A short name for the kind of event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RequestStart { .. } => "request-start",
            Self::RequestSuccess(_) => "request-success",
            Self::RequestFailure(_) => "request-failure",
            Self::MutationStart { .. } => "mutation-start",
            Self::MutationSuccess(_) => "mutation-success",
            Self::MutationFailure(_) => "mutation-failure",
            Self::Cancel { .. } => "cancel",
            Self::Reset { .. } => "reset",
            Self::UpdateEntities { .. } => "update-entities",
            Self::RemoveEntity { .. } => "remove-entity",
            Self::RemoveEntities { .. } => "remove-entities",
        }
    }

    /// The query key this event is about, if any.
    pub fn query_key(&self) -> Option<&QueryKey> {
        match self {
            Self::RequestStart { query_key, .. }
            | Self::MutationStart { query_key, .. }
            | Self::Cancel { query_key } => Some(query_key),
            Self::RequestSuccess(e) | Self::MutationSuccess(e) => {
                Some(&e.query_key)
            }
            Self::RequestFailure(e) | Self::MutationFailure(e) => {
                Some(&e.query_key)
            }
            Self::Reset { .. }
            | Self::UpdateEntities { .. }
            | Self::RemoveEntity { .. }
            | Self::RemoveEntities { .. } => None,
        }
    }

    /// True for the events that end a request's in-flight status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::RequestSuccess(_)
                | Self::RequestFailure(_)
                | Self::MutationSuccess(_)
                | Self::MutationFailure(_)
        )
    }
}
