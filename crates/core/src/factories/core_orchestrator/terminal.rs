use super::{in_flight::InFlight, merge, CoreOrchestrator};
use rquery_api::{
    event::{FailureEvent, LifecycleEvent, SuccessEvent},
    network::NetworkResponse,
    request::{identity_transform, QueryResponse, RequestConfig},
    store::{DynAbortHandle, Fragment},
    QueryKey,
};
use std::{sync::Arc, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Kind {
    Request,
    Mutation,
}

impl CoreOrchestrator {
    /// Fold the terminal response of a query or mutation into exactly one
    /// success or failure event, and build what its completion resolves
    /// with.
    ///
    /// The event names `in_flight` as its chain, so a store can drop it
    /// after a reset.
    ///
    /// `rolled_back_entities` is only used on failure.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn settle(
        &self,
        kind: Kind,
        query_key: QueryKey,
        request: &RequestConfig,
        response: NetworkResponse,
        duration: Duration,
        in_flight: Arc<InFlight>,
        rolled_back_entities: Option<Fragment>,
    ) -> QueryResponse {
        let chain: DynAbortHandle = in_flight;
        let ok = response.is_ok();
        let NetworkResponse {
            error,
            status,
            body,
            text,
            headers,
        } = response;

        if ok {
            let transform =
                request.transform.clone().unwrap_or_else(identity_transform);
            let transform_result = request
                .transform_result
                .clone()
                .unwrap_or_else(identity_transform);
            let transformed = transform(body.as_ref(), text.as_deref());
            let transformed_result =
                transform_result(body.as_ref(), text.as_deref());

            let entities = merge::merge_success(
                request.update.as_ref(),
                &self.store.entities(),
                &transformed,
            );
            let results = merge::merge_success(
                request.update_result.as_ref(),
                &self.store.result(&query_key).unwrap_or_default(),
                &transformed_result,
            );

            if let Some(on_success) = &request.on_success {
                on_success(body.as_ref());
            }

            tracing::debug!(%query_key, status, ?duration, ?kind, "success");

            let event = SuccessEvent {
                query_key,
                url: request.url.clone(),
                body: request.body.clone(),
                meta: request.meta.clone(),
                status,
                duration,
                response_body: body.clone(),
                response_text: text.clone(),
                response_headers: headers.clone(),
                entities: entities.clone(),
                results: results.clone(),
                chain: Some(chain),
            };
            self.store.apply(match kind {
                Kind::Request => LifecycleEvent::RequestSuccess(event),
                Kind::Mutation => LifecycleEvent::MutationSuccess(event),
            });

            QueryResponse {
                status,
                body,
                text,
                headers,
                duration,
                transformed: Some(transformed),
                entities: Some(entities),
                transformed_result: Some(transformed_result),
                results: Some(results),
            }
        } else {
            match &error {
                Some(err) if err.is_cancelled() => {
                    tracing::debug!(%query_key, ?kind, "aborted");
                }
                Some(err) => {
                    tracing::warn!(%query_key, ?kind, %err, "transport failed");
                }
                None => tracing::debug!(%query_key, status, ?kind, "failure"),
            }

            if let Some(on_error) = &request.on_error {
                on_error(body.as_ref());
            }

            let event = FailureEvent {
                query_key,
                url: request.url.clone(),
                body: request.body.clone(),
                meta: request.meta.clone(),
                status,
                duration,
                response_body: body.clone(),
                response_text: text.clone(),
                response_headers: headers.clone(),
                rolled_back_entities,
                chain: Some(chain),
            };
            self.store.apply(match kind {
                Kind::Request => LifecycleEvent::RequestFailure(event),
                Kind::Mutation => LifecycleEvent::MutationFailure(event),
            });

            QueryResponse {
                status,
                body,
                text,
                headers,
                duration,
                ..Default::default()
            }
        }
    }
}
