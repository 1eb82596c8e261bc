//! A glossary of terms used in rquery.
//!
//! ## Query key
//! The identity of a request. Either the explicit key of a
//! [RequestConfig](crate::request::RequestConfig), or the canonical json of
//! its url and body with object keys sorted recursively. The method is not
//! part of it. Deduplication, record lookup and cancellation all go
//! through the query key.
//!
//! ## Query record
//! What the store knows about one query key: whether a request is pending,
//! whether a terminal response was recorded, its status and headers, when
//! it was recorded and how many were recorded so far.
//!
//! ## Entities
//! The normalized entity store. A json object from entity kind to entity
//! data, shared by every request and only changed through fragments.
//!
//! ## Fragment
//! A json object holding just the top-level entity fields a reducer map
//! touched. Fragments are shallow-merged into the store.
//!
//! ## Results
//! Per query key, the fragment of the last successful response's result
//! shape, usually ordering or paging data rather than entities.
//!
//! ## Attempt chain
//! The attempts a single query makes, from the first one to the terminal
//! response. It is announced by one `request-start` event and ends with
//! exactly one terminal event. Retries in between are invisible, apart from
//! the record staying pending.
//!
//! ## Terminal event
//! A success or failure event. It takes a query record out of pending.
//!
//! ## Optimistic update
//! A speculative change to the entity store, applied when a mutation
//! starts, before any response arrived.
//!
//! ## Rollback
//! Restoring the fields an optimistic update touched after its mutation
//! failed, through per-field reducers `(initial, current) -> restored`.
//! Fields the mutation did not touch are never part of a rollback.
//!
//! ## Network handle
//! One transport attempt. It is executed at most once, resolves exactly
//! once, and can be aborted, in which case it still resolves.
