use mt5admin_cli::api::{ApiClient, Endpoint};
use mt5admin_cli::error::Failure;
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::net::TcpListener;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// The client is blocking; run it off the async test's worker threads.
async fn blocking<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.expect("blocking task panicked")
}

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(Endpoint::new(base_url, Duration::from_secs(2))).unwrap()
}

async fn request(uri: String, verb: Method, route: &'static str, body: Option<Value>) -> Result<Value, Failure> {
    blocking(move || client(&uri).request(verb, route, body.as_ref())).await
}

/// Address nothing listens on.
fn closed_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn health_server(body: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn ok_body_is_returned_unchanged() {
    let server = MockServer::start().await;
    let body = json!({
        "success": true,
        "collections": ["news", "signals"],
        "nested": {"ratio": 0.25, "flags": [true, false, null]}
    });
    Mock::given(method("GET"))
        .and(path("/api/firebase/collections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let value = request(server.uri(), Method::GET, "/api/firebase/collections", None)
        .await
        .unwrap();
    assert_eq!(value, body);
}

#[tokio::test]
async fn error_status_carries_code_and_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/firebase/collection/ghost/stats"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "error": "collection not found",
            "message": "ignored"
        })))
        .mount(&server)
        .await;

    let failure = request(server.uri(), Method::GET, "/api/firebase/collection/ghost/stats", None)
        .await
        .unwrap_err();
    assert_eq!(
        failure,
        Failure::Http {
            status: 404,
            message: Some("collection not found".into())
        }
    );
}

#[tokio::test]
async fn error_status_falls_back_to_message_then_nothing() {
    let server = MockServer::start().await;
    Mock::given(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "forbidden"})))
        .mount(&server)
        .await;
    Mock::given(path("/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let forbidden = request(server.uri(), Method::GET, "/forbidden", None).await.unwrap_err();
    assert_eq!(
        forbidden,
        Failure::Http {
            status: 403,
            message: Some("forbidden".into())
        }
    );

    let broken = request(server.uri(), Method::GET, "/broken", None).await.unwrap_err();
    assert_eq!(
        broken,
        Failure::Http {
            status: 500,
            message: None
        }
    );
}

#[tokio::test]
async fn only_200_counts_as_success() {
    let server = MockServer::start().await;
    Mock::given(path("/created"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let failure = request(server.uri(), Method::POST, "/created", None).await.unwrap_err();
    assert_eq!(failure.status(), Some(201));
}

#[tokio::test]
async fn failed_request_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/firebase/collection/news/clear"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let failure = request(server.uri(), Method::DELETE, "/api/firebase/collection/news/clear", None)
        .await
        .unwrap_err();
    assert_eq!(failure.status(), Some(503));
    server.verify().await;
}

#[tokio::test]
async fn non_json_ok_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(path("/api/mt5-account-info"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>tunnel offline</html>"))
        .mount(&server)
        .await;

    let failure = request(server.uri(), Method::GET, "/api/mt5-account-info", None)
        .await
        .unwrap_err();
    assert!(matches!(failure, Failure::MalformedResponse(_)));
}

#[tokio::test]
async fn refused_connection_is_a_connection_failure() {
    let failure = request(closed_address(), Method::GET, "/api/health", None)
        .await
        .unwrap_err();
    assert!(matches!(failure, Failure::Connection(_)));
}

#[tokio::test]
async fn slow_server_hits_the_timeout() {
    let server = MockServer::start().await;
    Mock::given(path("/api/mt5-account-info"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let uri = server.uri();
    let failure = blocking(move || {
        ApiClient::new(Endpoint::new(uri, Duration::from_millis(300)))
            .unwrap()
            .request(Method::GET, "/api/mt5-account-info", None)
    })
    .await
    .unwrap_err();
    assert!(matches!(failure, Failure::Connection(_)));
}

#[tokio::test]
async fn healthy_sentinel_means_healthy() {
    let server = health_server(json!({"status": "healthy"})).await;
    // Trailing slash on the base URL must not break the path.
    let uri = format!("{}/", server.uri());
    assert!(blocking(move || client(&uri).check_health()).await);
}

#[tokio::test]
async fn other_statuses_are_not_healthy() {
    for body in [
        json!({"status": "degraded"}),
        json!({"status": "Healthy"}),
        json!({"state": "healthy"}),
        json!(["healthy"]),
    ] {
        let server = health_server(body).await;
        let uri = server.uri();
        assert!(!blocking(move || client(&uri).check_health()).await);
    }
}

#[tokio::test]
async fn error_responses_are_not_healthy() {
    let server = MockServer::start().await;
    Mock::given(path("/api/health"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"status": "healthy"})))
        .mount(&server)
        .await;
    let uri = server.uri();
    assert!(!blocking(move || client(&uri).check_health()).await);

    let unreachable = closed_address();
    assert!(!blocking(move || client(&unreachable).check_health()).await);
}

#[tokio::test]
async fn reconfigure_switches_server() {
    let degraded = health_server(json!({"status": "degraded"})).await;
    let healthy = health_server(json!({"status": "healthy"})).await;
    let (first, second) = (degraded.uri(), healthy.uri());

    let (before, after, timeout) = blocking(move || {
        let mut api = ApiClient::new(Endpoint::new(first, Duration::from_secs(4))).unwrap();
        let before = api.check_health();
        api.reconfigure(second);
        (before, api.check_health(), api.endpoint().timeout())
    })
    .await;

    assert!(!before);
    assert!(after);
    assert_eq!(timeout, Duration::from_secs(4));
}

#[tokio::test]
async fn account_info_decodes_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/mt5-account-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "account": {"login": 5123, "balance": 10250.5, "currency": "USD"},
            "positions": [{"ticket": 77, "symbol": "EURUSD", "type": 0, "volume": 0.5, "profit": 12.5}],
            "summary": {"total_positions": 1, "total_profit": 12.5, "profitable_positions": 1},
            "timestamp": "2025-07-30 20:45:00"
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let snapshot = blocking(move || client(&uri).account_info()).await.unwrap();
    let account = snapshot.account.unwrap();
    assert_eq!(account.balance, 10250.5);
    assert_eq!(account.currency.as_deref(), Some("USD"));
    assert_eq!(snapshot.positions.unwrap()[0].side_label(), "BUY");
    assert_eq!(snapshot.summary.unwrap().profitable_positions, 1);
    assert!(snapshot.today_summary.is_none());
}

#[tokio::test]
async fn mistyped_snapshot_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(path("/api/mt5-account-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"positions": "none"})))
        .mount(&server)
        .await;

    let uri = server.uri();
    let failure = blocking(move || client(&uri).account_info()).await.unwrap_err();
    assert!(matches!(failure, Failure::MalformedResponse(_)));
}

#[tokio::test]
async fn discord_test_posts_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/discord/test"))
        .and(body_json(json!({"message": "ping"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Sent to #alerts"})))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let notice = blocking(move || client(&uri).send_discord_test("ping")).await.unwrap();
    assert_eq!(notice.message.as_deref(), Some("Sent to #alerts"));
}

#[tokio::test]
async fn settings_groups_and_update() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "config": {
                "risk": {"max_lot": 0.5, "max_positions": 3},
                "trading": {"symbols": ["EURUSD"]}
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/config/risk"))
        .and(body_json(json!({"max_lot": 1.0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": "saved"})))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let (groups, saved) = blocking(move || {
        let api = client(&uri);
        let groups = api.settings_groups().unwrap().into_result().unwrap();
        let mut patch = Map::new();
        patch.insert("max_lot".into(), json!(1.0));
        let saved = api.update_settings("risk", &patch).unwrap().into_result().unwrap();
        (groups, saved)
    })
    .await;

    assert_eq!(groups.config.len(), 2);
    assert_eq!(groups.config["risk"]["max_positions"], json!(3));
    assert_eq!(saved.message.as_deref(), Some("saved"));
}

#[tokio::test]
async fn store_operations_hit_their_routes() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/firebase/collection/news/clear-old"))
        .and(query_param("days", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "deleted_count": 1520,
            "cutoff_date": "2025-07-23"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/firebase/collection/news/documents"))
        .and(query_param("limit", "20"))
        .and(query_param("offset", "40"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "documents": [{"id": "a1", "title": "Fed holds rates"}],
            "count": 41
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/firebase/document/news/a1"))
        .and(body_json(json!({"status": "archived"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/firebase/document/news/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "document is locked"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let (cleared, page, updated, deleted) = blocking(move || {
        let api = client(&uri);
        (
            api.clear_old_documents("news", 7).unwrap().into_result().unwrap(),
            api.documents("news", 20, 40).unwrap().into_result().unwrap(),
            api.update_document("news", "a1", &json!({"status": "archived"}))
                .unwrap()
                .success,
            api.delete_document("news", "a1").unwrap().into_result(),
        )
    })
    .await;

    assert_eq!(cleared.deleted_count, 1520);
    assert_eq!(cleared.cutoff_date.as_deref(), Some("2025-07-23"));
    assert_eq!(page.count, 41);
    assert_eq!(page.documents[0]["id"], json!("a1"));
    assert!(updated);
    assert_eq!(deleted.unwrap_err(), "document is locked");
    server.verify().await;
}

#[tokio::test]
async fn document_ids_are_escaped_into_one_segment() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/firebase/document/news/x%2F..%2F..%2F..%2Fcollection%2Fnews%2Fclear"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/firebase/document/news/draft%232"))
        .and(body_json(json!({"status": "final"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/firebase/collection/news/clear"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "deleted_count": 9})))
        .expect(0)
        .mount(&server)
        .await;

    let uri = server.uri();
    let (deleted, updated) = blocking(move || {
        let api = client(&uri);
        (
            api.delete_document("news", "x/../../../collection/news/clear").unwrap().success,
            api.update_document("news", "draft#2", &json!({"status": "final"}))
                .unwrap()
                .success,
        )
    })
    .await;

    assert!(deleted);
    assert!(updated);
    server.verify().await;
}

#[tokio::test]
async fn dot_segments_are_refused_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(0)
        .mount(&server)
        .await;

    let uri = server.uri();
    let (document, collection) = blocking(move || {
        let api = client(&uri);
        (
            api.delete_document("news", "..").unwrap_err(),
            api.clear_collection(".").unwrap_err(),
        )
    })
    .await;

    assert!(matches!(document, Failure::InvalidRequest(_)));
    assert!(matches!(collection, Failure::InvalidRequest(_)));
    server.verify().await;
}
