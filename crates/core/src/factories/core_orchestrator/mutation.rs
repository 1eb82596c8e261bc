use super::{
    in_flight::InFlight, merge, query_key, require_url, terminal::Kind,
    CoreOrchestrator,
};
use futures::FutureExt;
use rquery_api::{
    event::LifecycleEvent,
    network::{HttpMethod, NetworkResponse},
    orchestrator::Completion,
    request::{QueryResponse, RequestConfig},
    store::Fragment,
    QueryKey, RqError, RqResult,
};
use std::sync::Arc;

impl CoreOrchestrator {
    /// Must be called from within a tokio runtime.
    pub(super) fn issue_mutation(
        &self,
        request: RequestConfig,
    ) -> RqResult<Completion> {
        require_url(&request)?;
        let method = request.options.method.unwrap_or(HttpMethod::Post);
        let options = request.network_options();
        options.check(method)?;

        let query_key = query_key(&request);
        let initial = self.store.entities();
        let optimistic = request
            .optimistic_update
            .as_ref()
            .map(|optimistic| merge::apply_optimistic(optimistic, &initial));

        let handle = self.open_attempt(&request.url, method, options)?;
        let in_flight = Arc::new(InFlight::new(handle));

        tracing::debug!(
            %query_key,
            %method,
            url = %request.url,
            optimistic = optimistic.is_some(),
            "issuing mutation"
        );

        self.store.apply(LifecycleEvent::MutationStart {
            query_key: query_key.clone(),
            url: request.url.clone(),
            body: request.body.clone(),
            meta: request.meta.clone(),
            network_handle: in_flight.clone(),
            optimistic_entities: optimistic.clone(),
        });

        let (tx, rx) = tokio::sync::oneshot::channel();
        let this = self.clone();
        tokio::spawn(async move {
            let res = this
                .drive_mutation(query_key, request, initial, optimistic, in_flight)
                .await;
            let _ = tx.send(res);
        });

        Ok(rx
            .map(|r| {
                r.map_err(|_| RqError::other("mutation task ended unresolved"))
            })
            .boxed())
    }

    async fn drive_mutation(
        &self,
        query_key: QueryKey,
        request: RequestConfig,
        initial: Fragment,
        optimistic: Option<Fragment>,
        in_flight: Arc<InFlight>,
    ) -> QueryResponse {
        let start = tokio::time::Instant::now();
        let handle = in_flight.current();
        let response: NetworkResponse = handle.execute().await;

        let rolled_back_entities = match (&optimistic, &request.optimistic_update)
        {
            (Some(_), Some(touched)) if !response.is_ok() => {
                Some(merge::rollback(
                    request.rollback.as_ref(),
                    touched.keys(),
                    &initial,
                    &self.store.entities(),
                ))
            }
            _ => None,
        };

        self.settle(
            Kind::Mutation,
            query_key,
            &request,
            response,
            start.elapsed(),
            in_flight,
            rolled_back_entities,
        )
    }
}
