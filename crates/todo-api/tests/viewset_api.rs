use axum::body::{self, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use infrastructure::InMemoryTodoRepository;
use serde_json::{json, Value};
use shared::issue_token;
use std::sync::Arc;
use todo_api::clock::ManualClock;
use todo_api::throttle::{InMemoryThrottleStore, UserRateThrottle};
use todo_api::{app, AppState};
use tower::ServiceExt;

const SECRET: &str = "integration-secret";

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

impl TestApp {
    fn new(rate: Option<&str>) -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));
        let throttle = UserRateThrottle::new(
            rate.map(|r| r.parse().unwrap()),
            Arc::new(InMemoryThrottleStore::new()),
            clock.clone(),
        );
        let state = AppState::new(
            Arc::new(InMemoryTodoRepository::new()),
            Arc::new(throttle),
            None,
            clock.clone(),
        )
        .with_jwt_secret(SECRET);

        Self {
            router: app(state),
            clock,
        }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, header::HeaderMap, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "198.51.100.20");
        if let Some(user) = user {
            let token = issue_token(SECRET, user, chrono::Duration::minutes(10)).unwrap();
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = body.map_or_else(Body::empty, |json| Body::from(json.to_string()));

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, json)
    }
}

#[tokio::test]
async fn test_create_then_retrieve_round_trip() {
    let app = TestApp::new(None);

    let (status, _, created) = app
        .request(
            Method::POST,
            "/todos/",
            Some("alice"),
            Some(json!({"title": "Write report", "description": "Q3", "completed": false})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/todos/{}/", created["id"].as_str().unwrap());
    let (status, _, fetched) = app.request(Method::GET, &uri, Some("alice"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
    assert_eq!(fetched["title"], "Write report");
    assert_eq!(fetched["description"], "Q3");
    assert_eq!(fetched["completed"], false);
}

#[tokio::test]
async fn test_delete_then_retrieve_is_not_found() {
    let app = TestApp::new(None);
    let (_, _, created) = app
        .request(Method::POST, "/todos", None, Some(json!({"title": "temp"})))
        .await;
    let uri = format!("/todos/{}", created["id"].as_str().unwrap());

    let (status, _, body) = app.request(Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _, body) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No Todo matches the given query.");

    let (status, _, _) = app.request(Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_adhoc_method_returns_fixed_payload() {
    let app = TestApp::new(None);
    let (_, _, created) = app
        .request(Method::POST, "/todos/", Some("bob"), Some(json!({"title": "x"})))
        .await;
    let uri = format!(
        "/todos/{}/example_adhoc_method/",
        created["id"].as_str().unwrap()
    );

    let (status, _, body) = app
        .request(Method::POST, &uri, Some("bob"), Some(json!({"ignored": true})))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "request was permitted"}));

    // 対象は変更されない
    let detail = format!("/todos/{}/", created["id"].as_str().unwrap());
    let (_, _, fetched) = app.request(Method::GET, &detail, Some("bob"), None).await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_throttle_shares_one_counter_across_actions() {
    // Arrange: 1分あたり3回
    let app = TestApp::new(Some("3/min"));

    // Act: 一覧・作成・カスタムアクションで枠を使い切る
    let (status, _, _) = app
        .request(Method::GET, "/todos/", Some("carol"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, created) = app
        .request(Method::POST, "/todos/", Some("carol"), Some(json!({"title": "t"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let adhoc = format!(
        "/todos/{}/example_adhoc_method/",
        created["id"].as_str().unwrap()
    );
    let (status, _, _) = app.request(Method::POST, &adhoc, Some("carol"), None).await;
    assert_eq!(status, StatusCode::OK);

    // Assert: 4回目はどのアクションでも 429
    let (status, headers, body) = app.request(Method::POST, &adhoc, Some("carol"), None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers[header::RETRY_AFTER], "60");
    assert_eq!(body["code"], "THROTTLED");
    assert_eq!(
        body["error"],
        "Request was throttled. Expected available in 60 seconds."
    );

    let (status, _, _) = app
        .request(Method::GET, "/todos/", Some("carol"), None)
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // 別ユーザーは独立したカウンター
    let (status, _, _) = app
        .request(Method::GET, "/todos/", Some("dave"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    // 窓がスライドすれば再び許可
    app.clock.advance(chrono::Duration::seconds(60));
    let (status, _, _) = app
        .request(Method::GET, "/todos/", Some("carol"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_anonymous_requests_are_throttled_by_client_ip() {
    let app = TestApp::new(Some("1/hour"));

    let (status, _, _) = app.request(Method::GET, "/todos/", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = app.request(Method::GET, "/todos/", None, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_failed_requests_still_count_against_quota() {
    let app = TestApp::new(Some("3/min"));

    let (status, _, _) = app
        .request(Method::POST, "/todos/", Some("erin"), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, _) = app
        .request(Method::GET, "/todos/not-an-id/", Some("erin"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = app
        .request(Method::DELETE, "/todos/", Some("erin"), None)
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _, body) = app
        .request(Method::GET, "/todos/", Some("erin"), None)
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body["error"],
        "Request was throttled. Expected available in 60 seconds."
    );
}

#[tokio::test]
async fn test_unsupported_method_counts_against_quota() {
    let app = TestApp::new(Some("1/min"));

    let (status, _, _) = app.request(Method::DELETE, "/todos/", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _, _) = app.request(Method::GET, "/todos/", None, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_invalid_token_is_rejected_without_consuming_quota() {
    let app = TestApp::new(Some("1/min"));
    let forged = issue_token("wrong-secret", "mallory", chrono::Duration::minutes(5)).unwrap();

    for _ in 0..3 {
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/todos/")
                    .header(header::AUTHORIZATION, format!("Bearer {forged}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let (status, _, _) = app
        .request(Method::GET, "/todos/", Some("mallory"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_validation_errors() {
    let app = TestApp::new(None);

    let (status, _, body) = app
        .request(Method::POST, "/todos/", None, Some(json!({"description": "no title"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["fields"]["title"][0], "This field is required.");

    let (status, _, body) = app
        .request(Method::POST, "/todos/", None, Some(json!(["not", "an", "object"])))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["fields"]["non_field_errors"][0],
        "Invalid data. Expected a dictionary, but got list."
    );

    let (_, _, created) = app
        .request(Method::POST, "/todos/", None, Some(json!({"title": "keep"})))
        .await;
    let uri = format!("/todos/{}/", created["id"].as_str().unwrap());
    let (status, _, body) = app
        .request(Method::PATCH, &uri, None, Some(json!({"completed": true})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], true);
    assert_eq!(body["title"], "keep");
}

#[tokio::test]
async fn test_health_is_not_throttled() {
    let app = TestApp::new(Some("1/hour"));

    for _ in 0..5 {
        let (status, _, body) = app.request(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    let (status, _, _) = app.request(Method::GET, "/todos/", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
