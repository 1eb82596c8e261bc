use super::utils::*;
use crate::{query_key::query_key, selectors};
use rquery_api::{
    network::*, orchestrator::Orchestrator, request::RequestConfig,
    store::Store, RqError,
};
use rquery_test_utils::{enable_tracing, fragment};
use serde_json::{json, Value};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

#[tokio::test]
async fn items_query_merges_into_empty_store() {
    enable_tracing();
    let t = setup();
    t.network.respond(
        HttpMethod::Get,
        "/items",
        NetworkResponse::new(200, json!({ "items": [1, 2, 3] })),
    );

    let request = items_query();
    let res = t
        .orchestrator
        .query(request.clone())
        .unwrap()
        .expect("query should be issued")
        .await
        .unwrap();

    assert_eq!(200, res.status);
    assert_eq!(Some(json!({ "items": [1, 2, 3] })), res.transformed);
    assert_eq!(Some(fragment(json!({ "items": [1, 2, 3] }))), res.entities);
    assert_eq!(
        fragment(json!({ "items": [1, 2, 3] })),
        t.store.entities()
    );

    let queries = t.store.queries();
    assert_eq!(Some(true), selectors::is_finished(&queries, &request));
    assert_eq!(Some(false), selectors::is_pending(&queries, &request));
    assert_eq!(Some(200), selectors::status(&queries, &request));
    assert_eq!(Some(1), selectors::query_count(&queries, &request));
    assert_eq!(vec!["request-start", "request-success"], t.store.events());
    assert_eq!(HttpMethod::Get, t.network.requests()[0].method);
}

#[tokio::test]
async fn pending_query_is_not_issued_twice() {
    let mut network = MockNetwork::new();
    network.expect_open().times(1).returning(|_, _, _| {
        let mut handle = MockNetworkHandle::new();
        handle.expect_execute().returning(|| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                NetworkResponse::new(200, json!({ "items": [] }))
            })
        });
        handle.expect_abort().never();
        let out: DynNetworkHandle = Arc::new(handle);
        Ok(out)
    });
    let (orchestrator, store) = setup_with_network(Arc::new(network));

    let first = orchestrator.query(items_query()).unwrap();
    assert!(first.is_some());
    assert!(orchestrator.query(items_query()).unwrap().is_none());
    assert!(store.query(&query_key(&items_query())).unwrap().is_pending);

    first.unwrap().await.unwrap();
    assert_eq!(1, store.count("request-start"));
}

#[tokio::test]
async fn succeeded_query_is_only_reissued_when_forced() {
    let t = setup();
    t.network.respond(
        HttpMethod::Get,
        "/items",
        NetworkResponse::new(200, json!({ "items": [1] })),
    );

    t.orchestrator
        .query(items_query())
        .unwrap()
        .unwrap()
        .await
        .unwrap();

    assert!(t.orchestrator.query(items_query()).unwrap().is_none());
    assert!(t.orchestrator.query(items_query().retry()).unwrap().is_none());

    t.orchestrator
        .query(items_query().force())
        .unwrap()
        .expect("forced query should be issued")
        .await
        .unwrap();
    assert_eq!(2, t.network.opened_count());
    assert_eq!(
        Some(2),
        selectors::query_count(&t.store.queries(), &items_query())
    );
}

#[tokio::test]
async fn failed_query_is_reissued_with_retry() {
    let t = setup();
    t.network
        .respond(HttpMethod::Get, "/items", NetworkResponse::status(500));

    let res = t
        .orchestrator
        .query(items_query())
        .unwrap()
        .unwrap()
        .await
        .unwrap();
    assert_eq!(500, res.status);

    assert!(t.orchestrator.query(items_query()).unwrap().is_none());
    assert!(t.orchestrator.query(items_query().retry()).unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn retryable_statuses_are_retried_until_success() {
    let t = setup();
    t.network
        .respond(HttpMethod::Get, "/items", NetworkResponse::status(503));
    t.network
        .respond(HttpMethod::Get, "/items", NetworkResponse::status(504));
    t.network.respond(
        HttpMethod::Get,
        "/items",
        NetworkResponse::new(200, json!({ "items": [1, 2, 3] })),
    );

    let request = items_query();
    let completion = t.orchestrator.query(request.clone()).unwrap().unwrap();
    let completion = tokio::spawn(completion);

    // first retry after 300 ms, second after another 600 ms
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(1, t.network.executed_count());
    assert_eq!(
        Some(true),
        selectors::is_pending(&t.store.queries(), &request)
    );
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(2, t.network.executed_count());
    assert_eq!(
        Some(true),
        selectors::is_pending(&t.store.queries(), &request)
    );
    assert_eq!(Some(false), selectors::is_finished(&t.store.queries(), &request));

    let res = completion.await.unwrap().unwrap();
    assert_eq!(200, res.status);
    assert!(res.duration >= Duration::from_millis(900));

    assert_eq!(3, t.network.executed_count());
    assert_eq!(vec!["request-start", "request-success"], t.store.events());
    assert_eq!(
        Some(false),
        selectors::is_pending(&t.store.queries(), &request)
    );
    assert_eq!(Some(1), selectors::query_count(&t.store.queries(), &request));
}

#[tokio::test(start_paused = true)]
async fn exhausted_attempts_fail_with_last_response() {
    let t = setup();
    t.network.respond(
        HttpMethod::Get,
        "/items",
        NetworkResponse::new(429, json!({ "error": "slow down" }))
            .with_header("retry-after", "1"),
    );

    let request = items_query();
    let res = t
        .orchestrator
        .query(request.clone())
        .unwrap()
        .unwrap()
        .await
        .unwrap();

    assert_eq!(429, res.status);
    assert_eq!(Some(json!({ "error": "slow down" })), res.body);
    assert!(res.entities.is_none());
    assert!(res.transformed.is_none());
    // 300 + 600 + 1200 + 2400
    assert!(res.duration >= Duration::from_millis(4500));

    assert_eq!(5, t.network.executed_count());
    assert_eq!(vec!["request-start", "request-failure"], t.store.events());

    let record = t.store.query(&query_key(&request)).unwrap();
    assert!(!record.is_pending);
    assert!(record.is_finished);
    assert_eq!(Some(429), record.status);

    let error = selectors::error(t.store.as_ref(), &request).unwrap();
    assert_eq!(Some(json!({ "error": "slow down" })), error.response_body);
    assert_eq!("1", error.response_headers["retry-after"]);
}

#[tokio::test]
async fn non_retryable_status_fails_at_once() {
    let t = setup();
    t.network.respond(
        HttpMethod::Get,
        "/items",
        NetworkResponse::new(404, json!({ "error": "not found" })),
    );

    let res = t
        .orchestrator
        .query(items_query())
        .unwrap()
        .unwrap()
        .await
        .unwrap();

    assert_eq!(404, res.status);
    assert_eq!(1, t.network.executed_count());
    assert!(t.store.entities().is_empty());
}

#[tokio::test(start_paused = true)]
async fn connection_failures_are_retried() {
    let t = setup();
    t.network.respond(
        HttpMethod::Get,
        "/items",
        NetworkResponse::failed(RqError::other("connection refused")),
    );
    t.network.respond(
        HttpMethod::Get,
        "/items",
        NetworkResponse::new(200, json!({ "items": [] })),
    );

    let res = t
        .orchestrator
        .query(items_query())
        .unwrap()
        .unwrap()
        .await
        .unwrap();
    assert_eq!(200, res.status);
    assert_eq!(2, t.network.opened_count());
}

#[tokio::test]
async fn transforms_and_result_reducers() {
    let t = setup_with_entities(fragment(json!({ "users": { "1": "a" } })));
    t.network.respond(
        HttpMethod::Get,
        "/users",
        NetworkResponse::new(
            200,
            json!({ "data": [{ "id": "2", "name": "b" }], "page": 2 }),
        ),
    );

    let request = RequestConfig::new("/users")
        .with_transform(|body: Option<&Value>, _text: Option<&str>| {
            let mut users = serde_json::Map::new();
            for user in body.unwrap()["data"].as_array().unwrap() {
                users.insert(
                    user["id"].as_str().unwrap().to_string(),
                    user["name"].clone(),
                );
            }
            json!({ "users": users })
        })
        .with_transform_result(|body: Option<&Value>, _text: Option<&str>| {
            json!({ "page": body.unwrap()["page"] })
        })
        .with_update("users", |prior: &Value, next: &Value| {
            let mut out = prior.clone();
            for (k, v) in next.as_object().unwrap() {
                out[k] = v.clone();
            }
            out
        })
        .with_update_result("page", |_prior: &Value, next: &Value| next.clone());

    let res = t
        .orchestrator
        .query(request.clone())
        .unwrap()
        .unwrap()
        .await
        .unwrap();

    assert_eq!(Some(json!({ "page": 2 })), res.transformed_result);
    assert_eq!(Some(fragment(json!({ "page": 2 }))), res.results);
    assert_eq!(
        fragment(json!({ "users": { "1": "a", "2": "b" } })),
        t.store.entities()
    );
    assert_eq!(
        Some(fragment(json!({ "page": 2 }))),
        t.store.result(&query_key(&request))
    );
}

#[tokio::test]
async fn callbacks_get_the_raw_body() {
    let t = setup();
    t.network.respond(
        HttpMethod::Get,
        "/items",
        NetworkResponse::new(200, json!({ "items": [1] })),
    );
    t.network.respond(
        HttpMethod::Get,
        "/broken",
        NetworkResponse::new(500, json!({ "error": "boom" })),
    );

    let seen = Arc::new(Mutex::new(Vec::new()));

    let s = seen.clone();
    t.orchestrator
        .query(items_query().on_success(move |body| {
            s.lock().unwrap().push(("success", body.cloned()));
        }))
        .unwrap()
        .unwrap()
        .await
        .unwrap();

    let s = seen.clone();
    t.orchestrator
        .query(
            RequestConfig::new("/broken")
                .with_update("items", |_: &Value, next: &Value| next.clone())
                .on_error(move |body| {
                    s.lock().unwrap().push(("error", body.cloned()));
                }),
        )
        .unwrap()
        .unwrap()
        .await
        .unwrap();

    assert_eq!(
        vec![
            ("success", Some(json!({ "items": [1] }))),
            ("error", Some(json!({ "error": "boom" }))),
        ],
        *seen.lock().unwrap()
    );
}

#[tokio::test]
async fn preconditions_are_checked_before_dispatch() {
    let t = setup();

    let err = t
        .orchestrator
        .query(RequestConfig::new("/items"))
        .err()
        .expect("missing update must be rejected");
    assert!(err.is_precondition());
    assert!(err.to_string().contains("update"));

    let err = t
        .orchestrator
        .query(RequestConfig::new(""))
        .err()
        .expect("missing url must be rejected");
    assert!(err.is_precondition());
    assert!(err.to_string().contains("url"));

    let err = t
        .orchestrator
        .query(items_query().with_multipart())
        .err()
        .expect("multipart GET must be rejected");
    assert!(err.is_precondition());

    assert!(t.store.events().is_empty());
    assert_eq!(0, t.network.opened_count());
}

#[tokio::test(start_paused = true)]
async fn open_failure_ends_in_a_failure_event() {
    let mut network = MockNetwork::new();
    network
        .expect_open()
        .times(5)
        .returning(|_, _, _| Err(RqError::other("no route")));
    let (orchestrator, store) = setup_with_network(Arc::new(network));

    let res = orchestrator
        .query(items_query())
        .unwrap()
        .expect("query should be issued")
        .await
        .unwrap();

    assert_eq!(0, res.status);
    assert!(res.entities.is_none());
    assert_eq!(vec!["request-start", "request-failure"], store.events());
    let record = store.query(&query_key(&items_query())).unwrap();
    assert!(record.is_finished);
    assert_eq!(Some(0), record.status);
    assert!(store.error(&query_key(&items_query())).is_some());
}

#[tokio::test]
async fn precondition_from_open_is_returned_synchronously() {
    let mut network = MockNetwork::new();
    network
        .expect_open()
        .times(1)
        .returning(|_, _, _| Err(RqError::precondition("bad url")));
    let (orchestrator, store) = setup_with_network(Arc::new(network));

    assert!(orchestrator
        .query(items_query())
        .err()
        .is_some_and(|err| err.is_precondition()));
    assert!(store.events().is_empty());
}

#[tokio::test]
async fn method_and_options_are_passed_to_the_network() {
    let t = setup();
    t.network
        .respond(HttpMethod::Put, "/items", NetworkResponse::status(204));

    let request = items_query()
        .with_method(HttpMethod::Put)
        .with_body(json!({ "a": 1 }))
        .with_header("x-token", "t")
        .with_credentials(Credentials::Include);
    let res = t
        .orchestrator
        .query(request)
        .unwrap()
        .unwrap()
        .await
        .unwrap();
    assert_eq!(204, res.status);

    let sent = &t.network.requests()[0];
    assert_eq!(HttpMethod::Put, sent.method);
    assert_eq!(Some(json!({ "a": 1 })), sent.options.body);
    assert_eq!("t", sent.options.headers["x-token"]);
    assert_eq!(Some(Credentials::Include), sent.options.credentials);
}

#[test]
fn issue_guard() {
    use super::super::query::should_issue;
    use rquery_api::store::QueryRecord;

    let pending = QueryRecord {
        is_pending: true,
        ..Default::default()
    };
    let succeeded = QueryRecord {
        is_finished: true,
        status: Some(200),
        ..Default::default()
    };
    let failed = QueryRecord {
        is_finished: true,
        status: Some(500),
        ..Default::default()
    };

    assert!(should_issue(None, false, false));
    assert!(!should_issue(Some(&pending), false, false));
    assert!(!should_issue(Some(&pending), false, true));
    assert!(should_issue(Some(&pending), true, false));
    assert!(!should_issue(Some(&succeeded), false, true));
    assert!(should_issue(Some(&succeeded), true, false));
    assert!(!should_issue(Some(&failed), false, false));
    assert!(should_issue(Some(&failed), false, true));
}
