//! End-to-end tests of `VkClient` over wiremock.

mod support;

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use vkrpc_core::{CancellationRegistry, ChunkedLookupPlan, MultiEntityPlan, PaginatedPlan, SubCall};
use vkrpc_domain::{ApiError, CallSpec, ErrorCategory, PageResult};
use vkrpc_infra::{CallMetrics, StatsObserver, VkClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use support::{api_error, client, client_builder, form, ok, script, script_var};

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u64,
    first_name: String,
}

#[tokio::test]
async fn call_as_decodes_payload() -> anyhow::Result<()> {
    support::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/method/users.get"))
        .respond_with(ok(json!([{ "id": 1, "first_name": "Pavel" }])))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client(&server);
    let users: Vec<User> = client.call_as(&CallSpec::new("users.get").param("user_ids", 1)).await?;

    assert_eq!(users, vec![User { id: 1, first_name: "Pavel".into() }]);

    let requests = server.received_requests().await.unwrap_or_default();
    let sent = form(&requests[0]);
    assert_eq!(sent.get("access_token").map(String::as_str), Some(support::TOKEN));
    assert_eq!(sent.get("v").map(String::as_str), Some("5.92"));
    Ok(())
}

#[tokio::test]
async fn missing_token_never_reaches_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ok(json!(1))).expect(0).mount(&server).await;

    let client = VkClient::builder()
        .api_url(format!("{}/method/", server.uri()))
        .registry(Arc::new(CancellationRegistry::new()))
        .build()
        .unwrap();

    let err = client.call(&CallSpec::new("users.get")).await.unwrap_err();
    assert_eq!(err, ApiError::MissingCredential);
}

#[tokio::test]
async fn flood_and_server_error_are_retried_over_http() {
    let server = MockServer::start().await;
    Mock::given(path("/method/users.get"))
        .respond_with(api_error(6, "Too many requests per second"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(path("/method/users.get"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(path("/method/users.get")).respond_with(ok(json!([]))).mount(&server).await;

    let (client, _) = client(&server);
    let outcome = client.call(&CallSpec::new("users.get")).await.unwrap();

    assert_eq!(outcome.payload, json!([]));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    let state = client.retry_state();
    assert_eq!(state.flood_retry_count, 1);
    assert_eq!(state.http_retry_count, 1);
}

#[tokio::test]
async fn execute_keeps_report_of_partial_errors() {
    let server = MockServer::start().await;
    Mock::given(path("/method/execute"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": [{ "id": 1 }, false],
            "execute_errors": [
                { "method": "users.get", "error_code": 18, "error_msg": "User was deleted or banned" }
            ]
        })))
        .mount(&server)
        .await;

    let (client, _) = client(&server);
    assert!(client.last_execute_report().is_none());

    let code = "return [API.users.get({user_ids: 1})[0], API.users.get({user_ids: 2})[0]];";
    let outcome = client.execute(code).await.unwrap();

    assert!(outcome.has_partial_errors());
    let report = client.last_execute_report().expect("report");
    assert_eq!(report.code, code);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].error_code, 18);
}

#[tokio::test]
async fn script_runtime_error_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(path("/method/execute"))
        .respond_with(api_error(13, "Runtime error occurred during code invocation: Comparing values of different types"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client(&server);
    let err = client.execute("return 1 < \"a\";").await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Protocol);
    assert_eq!(err.remote_code(), Some(13));
}

/// Simulates the paginated script server-side for a collection of `total`
/// sequential ids.
fn paginated_responder(total: u64) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync {
    move |request: &Request| {
        let code = script(request);
        let start: u64 = script_var(&code, "offset").and_then(|v| v.parse().ok()).unwrap_or(0);
        let limit: u64 = script_var(&code, "limit").and_then(|v| v.parse().ok()).unwrap_or(1000);
        let budget: u64 = script_var(&code, "cnt").and_then(|v| v.parse().ok()).unwrap_or(25);

        let mut offset = start;
        let mut pages = 0;
        while pages < budget && offset < total {
            offset += limit;
            pages += 1;
        }
        let items: Vec<u64> = (start..offset.min(total)).collect();
        ok(json!({ "count": total, "offset": offset, "items": items }))
    }
}

#[tokio::test]
async fn fetch_all_pages_resumes_until_exhausted() {
    let server = MockServer::start().await;
    Mock::given(path("/method/execute")).respond_with(paginated_responder(300)).mount(&server).await;

    let (client, _) = client(&server);
    let plan = PaginatedPlan::new(SubCall::new("groups.getMembers").param("group_id", 1)).page_size(10);
    let result: PageResult<u64> = client.fetch_all_pages(&plan).await.unwrap();

    assert_eq!(result.count, 300);
    assert!(result.is_complete());
    assert_eq!(result.items, (0..300).collect::<Vec<u64>>());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(script_var(&script(&requests[1]), "offset").as_deref(), Some("250"));
}

#[tokio::test]
async fn paginate_direct_issues_one_call_per_page() {
    let server = MockServer::start().await;
    Mock::given(path("/method/groups.getMembers"))
        .respond_with(|request: &Request| {
            let params = form(request);
            let offset: u64 = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
            let count: u64 = params.get("count").and_then(|v| v.parse().ok()).unwrap_or(0);
            let items: Vec<u64> = (offset..(offset + count).min(2500)).collect();
            ok(json!({ "count": 2500, "items": items }))
        })
        .mount(&server)
        .await;

    let (client, _) = client(&server);
    let plan = PaginatedPlan::new(SubCall::new("groups.getMembers").param("group_id", 1));
    let result: PageResult<u64> = client.paginate_direct(&plan).await.unwrap();

    assert_eq!((result.count, result.offset), (2500, 3000));
    assert_eq!(result.items.len(), 2500);

    let offsets: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter_map(|request| form(request).remove("offset"))
        .collect();
    assert_eq!(offsets, vec!["0", "1000", "2000"]);
}

#[tokio::test]
async fn paginate_direct_stops_on_reported_position() {
    let server = MockServer::start().await;
    // 500 comments, paging from the one at position 450
    Mock::given(path("/method/wall.getComments"))
        .respond_with(|request: &Request| {
            let params = form(request);
            let offset: u64 = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
            let real_offset = 450 + offset;
            let items: Vec<u64> = (real_offset..(real_offset + 100).min(500)).collect();
            ok(json!({ "count": 500, "real_offset": real_offset, "items": items }))
        })
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client(&server);
    let plan = PaginatedPlan::new(SubCall::new("wall.getComments").param("start_comment_id", 451))
        .page_size(100)
        .progress_field("real_offset");
    let result: PageResult<u64> = client.paginate_direct(&plan).await.unwrap();

    assert_eq!(result.items, (450..500).collect::<Vec<_>>());
    assert_eq!((result.count, result.offset, result.next_offset), (500, 550, Some(100)));
    assert!(result.is_complete());
}

#[tokio::test]
async fn multi_entity_splits_and_keeps_order() {
    let server = MockServer::start().await;
    Mock::given(path("/method/execute"))
        .respond_with(|request: &Request| {
            let code = script(request);
            let entities: Vec<Value> =
                script_var(&code, "arr").and_then(|raw| serde_json::from_str(&raw).ok()).unwrap_or_default();
            let items: Vec<Value> = entities
                .iter()
                .map(|entity| json!({ "count": 1, "offset": 1000, "items": [entity["user_id"]] }))
                .collect();
            ok(json!({ "items": items, "rq_data": entities }))
        })
        .mount(&server)
        .await;

    let (client, _) = client(&server);
    let entities = (1..=30).map(|id| {
        let mut entity = Map::new();
        entity.insert("user_id".into(), json!(id));
        entity
    });
    let plan = MultiEntityPlan::new(SubCall::new("users.getFollowers")).bind("user_id", "user_id").entities(entities);

    let result = client.run_multi_entity::<u64>(&plan).await.unwrap();

    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    assert_eq!(result.items.len(), 30);
    for (index, (request, page)) in result.pairs().enumerate() {
        let id = index as u64 + 1;
        assert_eq!(request["user_id"], json!(id));
        assert_eq!(page.items, vec![id]);
    }
}

#[tokio::test]
async fn lookup_concatenates_chunks() {
    let server = MockServer::start().await;
    Mock::given(path("/method/execute"))
        .respond_with(ok(json!([{ "id": 1 }, { "id": 2 }, { "id": 3 }])))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client(&server);
    let plan = ChunkedLookupPlan::new(SubCall::new("wall.getById"), "posts", 2).ids(["1_1", "1_2", "1_3"]);
    let posts: Vec<Value> = client.lookup(&plan).await.unwrap();

    assert_eq!(posts.len(), 3);
    let requests = server.received_requests().await.unwrap();
    assert!(script(&requests[0]).contains("1_1,1_2"));
}

#[tokio::test]
async fn observers_see_physical_calls() {
    let server = MockServer::start().await;
    Mock::given(path("/method/users.get"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(path("/method/users.get")).respond_with(ok(json!([]))).mount(&server).await;

    let metrics = Arc::new(CallMetrics::new());
    let (stats, mut receiver) = StatsObserver::channel(100);
    let client = client_builder(&server, Arc::new(CancellationRegistry::new()))
        .observer(metrics.clone())
        .observer(Arc::new(stats))
        .build()
        .unwrap();

    client.call(&CallSpec::new("users.get")).await.unwrap();

    assert_eq!(metrics.calls_for("users.get"), 2);
    assert!((metrics.failure_rate() - 0.5).abs() < f64::EPSILON);

    let first = receiver.recv().await.unwrap();
    assert_eq!(first.error.as_deref(), Some("500 Internal Server Error"));
    let second = receiver.recv().await.unwrap();
    assert!(!second.is_failure());
}

#[test]
fn builder_defaults_to_shared_registry() {
    let shared = VkClient::builder().access_token("token").build().unwrap();
    let own = VkClient::builder().access_token("token").registry(Arc::new(CancellationRegistry::new())).build().unwrap();

    assert!(Arc::ptr_eq(shared.registry(), &CancellationRegistry::shared()));
    assert!(!Arc::ptr_eq(own.registry(), &CancellationRegistry::shared()));
}
