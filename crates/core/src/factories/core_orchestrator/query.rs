use super::{
    in_flight::InFlight, query_key, require_url, terminal::Kind,
    CoreOrchestrator,
};
use futures::FutureExt;
use rquery_api::{
    event::LifecycleEvent,
    network::{HttpMethod, NetworkOptions, NetworkResponse},
    orchestrator::Completion,
    request::RequestConfig,
    store::QueryRecord,
    QueryKey, RqError, RqResult,
};
use std::sync::Arc;

/// Whether a query intent turns into a request.
pub(super) fn should_issue(
    record: Option<&QueryRecord>,
    force: bool,
    retry: bool,
) -> bool {
    match record {
        _ if force => true,
        None => true,
        Some(record) => {
            retry && !record.is_pending && !record.has_succeeded()
        }
    }
}

impl CoreOrchestrator {
    /// Must be called from within a tokio runtime.
    pub(super) fn issue_query(
        &self,
        request: RequestConfig,
    ) -> RqResult<Option<Completion>> {
        require_url(&request)?;
        if request.update.is_none() {
            return Err(RqError::precondition(
                "Missing required `update` field in request",
            ));
        }
        let method = request.options.method.unwrap_or(HttpMethod::Get);
        let options = request.network_options();
        options.check(method)?;

        let query_key = query_key(&request);
        let record = self.store.query(&query_key);
        if !should_issue(record.as_ref(), request.force, request.retry) {
            tracing::debug!(%query_key, "skipping query");
            return Ok(None);
        }

        let handle = self.open_attempt(&request.url, method, options.clone())?;
        let in_flight = Arc::new(InFlight::new(handle));

        tracing::debug!(%query_key, %method, url = %request.url, "issuing query");

        self.store.apply(LifecycleEvent::RequestStart {
            query_key: query_key.clone(),
            url: request.url.clone(),
            body: request.body.clone(),
            meta: request.meta.clone(),
            network_handle: in_flight.clone(),
        });

        let (tx, rx) = tokio::sync::oneshot::channel();
        let this = self.clone();
        tokio::spawn(async move {
            let res = this
                .drive_query(query_key, request, method, options, in_flight)
                .await;
            let _ = tx.send(res);
        });

        Ok(Some(
            rx.map(|r| {
                r.map_err(|_| RqError::other("query task ended unresolved"))
            })
            .boxed(),
        ))
    }

    async fn drive_query(
        &self,
        query_key: QueryKey,
        request: RequestConfig,
        method: HttpMethod,
        options: NetworkOptions,
        in_flight: Arc<InFlight>,
    ) -> rquery_api::request::QueryResponse {
        let start = tokio::time::Instant::now();
        let mut attempts = 0;

        let response = loop {
            attempts += 1;
            let handle = in_flight.current();
            let response = handle.execute().await;

            if response.is_ok()
                || in_flight.is_aborted()
                || !self.back_off.should_retry(response.status, attempts)
            {
                break response;
            }

            let delay = self.back_off.next_delay(attempts);
            tracing::debug!(
                %query_key,
                attempts,
                status = response.status,
                ?delay,
                "scheduling retry"
            );

            tokio::select! {
                biased;
                _ = in_flight.aborted() => break NetworkResponse::cancelled(),
                _ = tokio::time::sleep(delay) => (),
            }

            match self.open_attempt(&request.url, method, options.clone()) {
                Ok(handle) => in_flight.replace(handle),
                Err(err) => break NetworkResponse::failed(err),
            }
        };

        self.settle(
            Kind::Request,
            query_key,
            &request,
            response,
            start.elapsed(),
            in_flight,
            None,
        )
    }
}
