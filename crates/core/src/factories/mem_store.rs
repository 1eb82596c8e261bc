//! The core in-memory store substrate provided by rquery.
//!
//! All four slices live behind a single mutex, so every
//! [LifecycleEvent] is folded in as one atomic step. After each step the
//! store version is bumped on a [tokio::sync::watch] channel, which is how
//! observers learn that something changed.

use rquery_api::{
    builder, config,
    event::{FailureEvent, LifecycleEvent, SuccessEvent},
    store::*,
    BoxFut, QueryKey, RqResult, Timestamp,
};
use std::sync::{Arc, Mutex};

/// The in-memory store factory.
#[derive(Debug)]
pub struct MemStoreFactory {}

impl MemStoreFactory {
    /// Construct a new MemStoreFactory.
    pub fn create() -> DynStoreFactory {
        let out: DynStoreFactory = Arc::new(MemStoreFactory {});
        out
    }
}

impl StoreFactory for MemStoreFactory {
    fn default_config(&self, _config: &mut config::Config) -> RqResult<()> {
        Ok(())
    }

    fn create(
        &self,
        _builder: Arc<builder::Builder>,
    ) -> BoxFut<'static, RqResult<DynStore>> {
        Box::pin(async move {
            let out: DynStore = MemStore::new();
            Ok(out)
        })
    }
}

#[derive(Debug, Default)]
struct Inner {
    queries: Queries,
    entities: Entities,
    results: Results,
    errors: Errors,
    // handles of the requests started since the last reset
    live: Vec<DynAbortHandle>,
}

impl Inner {
    /// Returns false for a terminal event whose request started before the
    /// last reset.
    fn track(&mut self, event: &LifecycleEvent) -> bool {
        let chain = match event {
            LifecycleEvent::RequestStart { network_handle, .. }
            | LifecycleEvent::MutationStart { network_handle, .. } => {
                self.live.push(network_handle.clone());
                return true;
            }
            LifecycleEvent::Reset { .. } => {
                self.live.clear();
                return true;
            }
            LifecycleEvent::RequestSuccess(e)
            | LifecycleEvent::MutationSuccess(e) => &e.chain,
            LifecycleEvent::RequestFailure(e)
            | LifecycleEvent::MutationFailure(e) => &e.chain,
            _ => return true,
        };
        let Some(chain) = chain else {
            return true;
        };
        match self.live.iter().position(|h| Arc::ptr_eq(h, chain)) {
            Some(idx) => {
                self.live.swap_remove(idx);
                true
            }
            None => false,
        }
    }
}

/// An in-memory [Store].
#[derive(Debug)]
pub struct MemStore {
    inner: Mutex<Inner>,
    version: tokio::sync::watch::Sender<u64>,
}

impl MemStore {
    /// Construct an empty store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
            version: tokio::sync::watch::Sender::new(0),
        })
    }

    /// Construct a store whose entity slice starts out as `entities`.
    pub fn with_entities(entities: Entities) -> Arc<Self> {
        let out = Self::new();
        out.inner.lock().unwrap().entities = entities;
        out
    }

    /// The number of events applied so far.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Observe the store. The receiver sees the version change after
    /// every applied event.
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// The whole error slice.
    pub fn errors(&self) -> Errors {
        self.inner.lock().unwrap().errors.clone()
    }
}

impl Store for MemStore {
    fn query(&self, query_key: &QueryKey) -> Option<QueryRecord> {
        self.inner.lock().unwrap().queries.get(query_key).cloned()
    }

    fn queries(&self) -> Queries {
        self.inner.lock().unwrap().queries.clone()
    }

    fn entities(&self) -> Entities {
        self.inner.lock().unwrap().entities.clone()
    }

    fn result(&self, query_key: &QueryKey) -> Option<Fragment> {
        self.inner.lock().unwrap().results.get(query_key).cloned()
    }

    fn results(&self) -> Results {
        self.inner.lock().unwrap().results.clone()
    }

    fn error(&self, query_key: &QueryKey) -> Option<ErrorRecord> {
        self.inner.lock().unwrap().errors.get(query_key).cloned()
    }

    fn apply(&self, event: LifecycleEvent) {
        tracing::trace!(kind = event.kind(), query_key = ?event.query_key(), "apply");
        {
            let mut lock = self.inner.lock().unwrap();
            if !lock.track(&event) {
                tracing::debug!(
                    kind = event.kind(),
                    query_key = ?event.query_key(),
                    "dropping terminal event of a request started before reset"
                );
                return;
            }
            reduce_queries(&mut lock.queries, &event);
            reduce_entities(&mut lock.entities, &event);
            reduce_results(&mut lock.results, &event);
            reduce_errors(&mut lock.errors, &event);
        }
        self.version.send_modify(|v| *v += 1);
    }
}

fn reduce_queries(queries: &mut Queries, event: &LifecycleEvent) {
    match event {
        LifecycleEvent::RequestStart {
            query_key,
            network_handle,
            ..
        }
        | LifecycleEvent::MutationStart {
            query_key,
            network_handle,
            ..
        } => {
            let record = queries.entry(query_key.clone()).or_default();
            record.is_pending = true;
            record.network_handle = Some(network_handle.clone());
        }
        LifecycleEvent::RequestSuccess(SuccessEvent {
            query_key,
            status,
            response_headers,
            ..
        })
        | LifecycleEvent::MutationSuccess(SuccessEvent {
            query_key,
            status,
            response_headers,
            ..
        })
        | LifecycleEvent::RequestFailure(FailureEvent {
            query_key,
            status,
            response_headers,
            ..
        })
        | LifecycleEvent::MutationFailure(FailureEvent {
            query_key,
            status,
            response_headers,
            ..
        }) => {
            let record = queries.entry(query_key.clone()).or_default();
            record.is_pending = false;
            record.network_handle = None;
            record.is_finished = true;
            record.status = Some(*status);
            record.headers = Some(response_headers.clone());
            record.last_updated = Some(Timestamp::now());
            record.query_count += 1;
        }
        LifecycleEvent::Cancel { query_key } => {
            if let Some(record) = queries.get_mut(query_key) {
                record.is_pending = false;
                record.network_handle = None;
            }
        }
        LifecycleEvent::Reset { .. } => queries.clear(),
        LifecycleEvent::UpdateEntities { .. }
        | LifecycleEvent::RemoveEntity { .. }
        | LifecycleEvent::RemoveEntities { .. } => (),
    }
}

fn merge(entities: &mut Entities, fragment: &Fragment) {
    for (k, v) in fragment {
        entities.insert(k.clone(), v.clone());
    }
}

fn reduce_entities(entities: &mut Entities, event: &LifecycleEvent) {
    match event {
        LifecycleEvent::Reset { entities: seed } => {
            *entities = seed.clone().unwrap_or_default();
        }
        LifecycleEvent::MutationStart {
            optimistic_entities: Some(fragment),
            ..
        } => merge(entities, fragment),
        LifecycleEvent::MutationFailure(FailureEvent {
            rolled_back_entities: Some(fragment),
            ..
        }) => merge(entities, fragment),
        LifecycleEvent::RequestSuccess(e) | LifecycleEvent::MutationSuccess(e) => {
            merge(entities, &e.entities)
        }
        LifecycleEvent::UpdateEntities { entities: fragment } => {
            merge(entities, fragment)
        }
        LifecycleEvent::RemoveEntity { path } => remove_path(entities, path),
        LifecycleEvent::RemoveEntities { paths } => {
            for path in paths {
                remove_path(entities, path);
            }
        }
        _ => (),
    }
}

/// Remove the last key of `path`. Missing or non-object intermediates
/// leave the store untouched, emptied parents are kept.
fn remove_path(entities: &mut Entities, path: &[String]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut cur = entities;
    for key in parents {
        match cur.get_mut(key) {
            Some(serde_json::Value::Object(next)) => cur = next,
            _ => return,
        }
    }
    cur.remove(last);
}

fn reduce_results(results: &mut Results, event: &LifecycleEvent) {
    match event {
        LifecycleEvent::Reset { .. } => results.clear(),
        LifecycleEvent::RequestSuccess(e) | LifecycleEvent::MutationSuccess(e) => {
            if !e.results.is_empty() {
                merge(results.entry(e.query_key.clone()).or_default(), &e.results);
            }
        }
        _ => (),
    }
}

fn reduce_errors(errors: &mut Errors, event: &LifecycleEvent) {
    match event {
        LifecycleEvent::RequestStart { query_key, .. }
        | LifecycleEvent::MutationStart { query_key, .. } => {
            errors.remove(query_key);
        }
        LifecycleEvent::RequestFailure(e) | LifecycleEvent::MutationFailure(e) => {
            errors.insert(
                e.query_key.clone(),
                ErrorRecord {
                    response_body: e.response_body.clone(),
                    response_text: e.response_text.clone(),
                    response_headers: e.response_headers.clone(),
                },
            );
        }
        LifecycleEvent::Reset { .. } => errors.clear(),
        _ => (),
    }
}
