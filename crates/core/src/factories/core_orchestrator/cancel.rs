use super::CoreOrchestrator;
use rquery_api::{
    event::LifecycleEvent,
    store::{Fragment, QueryRecord},
    QueryKey, RqError, RqResult,
};

impl CoreOrchestrator {
    pub(super) fn cancel_query(&self, query_key: &str) -> RqResult<()> {
        if query_key.is_empty() {
            return Err(RqError::precondition(
                "Missing required `queryKey` field in cancel",
            ));
        }
        let query_key = QueryKey::from(query_key);

        match self.store.query(&query_key) {
            Some(QueryRecord {
                is_pending: true,
                network_handle: Some(handle),
                ..
            }) => {
                tracing::info!(%query_key, "cancelling query");
                handle.abort();
                self.store.apply(LifecycleEvent::Cancel { query_key });
            }
            _ => {
                tracing::warn!(
                    %query_key,
                    "Trying to cancel a request that is not in flight"
                );
            }
        }
        Ok(())
    }

    pub(super) fn reset_all(&self, entities: Option<Fragment>) {
        let mut aborted = 0;
        for record in self.store.queries().into_values() {
            if let QueryRecord {
                is_pending: true,
                network_handle: Some(handle),
                ..
            } = record
            {
                handle.abort();
                aborted += 1;
            }
        }
        tracing::info!(aborted, seeded = entities.is_some(), "reset");
        self.store.apply(LifecycleEvent::Reset { entities });
    }
}
