//! HTTP-level tests for /api/v1/search against in-memory collaborators

use actix_web::{http::header, http::StatusCode, test, web, App};
use async_trait::async_trait;
use chrono::NaiveDate;
use search_service::elasticsearch::SearchError;
use search_service::handlers::{self, AppState};
use search_service::models::{Comment, HitKind, MediaItem, PostId, SearchHit};
use search_service::repository::Grouped;
use search_service::{Aggregator, CommentStore, MediaStore, SearchIndex, SearchScope};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct FakeSearch {
    hits: Vec<SearchHit>,
    delay: Option<Duration>,
    last_scope: Mutex<Option<SearchScope>>,
}

impl FakeSearch {
    fn returning(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            delay: None,
            last_scope: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SearchIndex for FakeSearch {
    async fn search(&self, _query: &str, scope: SearchScope) -> Result<Vec<SearchHit>, SearchError> {
        *self.last_scope.lock().unwrap() = Some(scope);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.hits.clone())
    }
}

#[derive(Default)]
struct FakeComments {
    rows: Grouped<Comment>,
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl CommentStore for FakeComments {
    async fn comments_by_post_ids(&self, ids: &[PostId]) -> Result<Grouped<Comment>, sqlx::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(sqlx::Error::Configuration(
                "connection to db.internal refused".into(),
            ));
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.rows.get(id).map(|rows| (id.clone(), rows.clone())))
            .collect())
    }
}

#[derive(Default)]
struct FakeMedia {
    rows: Grouped<MediaItem>,
    calls: AtomicUsize,
}

#[async_trait]
impl MediaStore for FakeMedia {
    async fn media_by_post_ids(&self, ids: &[PostId]) -> Result<Grouped<MediaItem>, sqlx::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ids
            .iter()
            .filter_map(|id| self.rows.get(id).map(|rows| (id.clone(), rows.clone())))
            .collect())
    }
}

fn hit(kind: HitKind, source: Value) -> SearchHit {
    let source: Map<String, Value> = match source {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    };
    SearchHit::new(kind, source)
}

fn red_truck_hits() -> Vec<SearchHit> {
    vec![
        hit(
            HitKind::Post,
            json!({"id": 7, "user_id": 3, "username": "alice", "content": "red truck for sale"}),
        ),
        hit(HitKind::User, json!({"id": 3, "username": "alice"})),
    ]
}

fn comment_on_seven() -> Grouped<Comment> {
    HashMap::from([(
        PostId::Int(7),
        vec![Comment {
            id: 100,
            post_id: PostId::Int(7),
            user_id: 4,
            username: "bob".to_string(),
            content: "still available?".to_string(),
            created_at: NaiveDate::from_ymd_opt(2024, 5, 18)
                .unwrap()
                .and_hms_opt(12, 34, 56)
                .unwrap(),
        }],
    )])
}

fn state(
    search: Arc<FakeSearch>,
    comments: Arc<FakeComments>,
    media: Arc<FakeMedia>,
    timeout: Duration,
) -> web::Data<AppState> {
    let aggregator = Arc::new(Aggregator::new(search, comments, media));
    web::Data::new(AppState::new(aggregator, timeout))
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state)
                .wrap(handlers::cors())
                .configure(handlers::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn test_red_truck_search() {
    let comments = Arc::new(FakeComments {
        rows: comment_on_seven(),
        ..FakeComments::default()
    });
    let media = Arc::new(FakeMedia::default());
    let app = app!(state(
        Arc::new(FakeSearch::returning(red_truck_hits())),
        comments.clone(),
        media.clone(),
        Duration::from_secs(5),
    ));

    let req = test::TestRequest::get()
        .uri("/api/v1/search?q=red%20truck")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({
            "result": {
                "users": [{"id": 3, "username": "alice"}],
                "posts": [{
                    "id": 7,
                    "user_id": 3,
                    "username": "alice",
                    "content": "red truck for sale",
                    "comments": [{
                        "id": 100,
                        "post_id": 7,
                        "user_id": 4,
                        "username": "bob",
                        "content": "still available?",
                        "created_at": "2024-05-18 12:34:56"
                    }],
                    "media_metadata": []
                }]
            }
        })
    );
    assert_eq!(comments.calls.load(Ordering::SeqCst), 1);
    assert_eq!(media.calls.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn test_zero_hits_returns_empty_result_without_fetches() {
    let comments = Arc::new(FakeComments::default());
    let media = Arc::new(FakeMedia::default());
    let app = app!(state(
        Arc::new(FakeSearch::returning(Vec::new())),
        comments.clone(),
        media.clone(),
        Duration::from_secs(5),
    ));

    let req = test::TestRequest::get().uri("/api/v1/search?q=zzz").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"result": {"users": [], "posts": []}}));
    assert_eq!(comments.calls.load(Ordering::SeqCst), 0);
    assert_eq!(media.calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_username_param_scopes_search() {
    let search = Arc::new(FakeSearch::returning(Vec::new()));
    let app = app!(state(
        search.clone(),
        Arc::new(FakeComments::default()),
        Arc::new(FakeMedia::default()),
        Duration::from_secs(5),
    ));

    let req = test::TestRequest::get()
        .uri("/api/v1/search?username=alice")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(*search.last_scope.lock().unwrap(), Some(SearchScope::Username));
}

#[actix_web::test]
async fn test_missing_query_is_bad_request() {
    let search = Arc::new(FakeSearch::returning(red_truck_hits()));
    let app = app!(state(
        search.clone(),
        Arc::new(FakeComments::default()),
        Arc::new(FakeMedia::default()),
        Duration::from_secs(5),
    ));

    for uri in ["/api/v1/search", "/api/v1/search?q=", "/api/v1/search?q=%20%20"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "uri: {uri}");

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"error": "Missing required query parameters"}));
    }
    assert_eq!(*search.last_scope.lock().unwrap(), None);
}

#[actix_web::test]
async fn test_other_methods_not_allowed() {
    let app = app!(state(
        Arc::new(FakeSearch::returning(Vec::new())),
        Arc::new(FakeComments::default()),
        Arc::new(FakeMedia::default()),
        Duration::from_secs(5),
    ));

    for req in [
        test::TestRequest::post().uri("/api/v1/search?q=truck").to_request(),
        test::TestRequest::delete().uri("/api/v1/search?q=truck").to_request(),
    ] {
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"error": "Method Not Allowed"}));
    }
}

#[actix_web::test]
async fn test_store_failure_is_server_error_without_details() {
    let media = Arc::new(FakeMedia::default());
    let app = app!(state(
        Arc::new(FakeSearch::returning(red_truck_hits())),
        Arc::new(FakeComments {
            fail: true,
            ..FakeComments::default()
        }),
        media,
        Duration::from_secs(5),
    ));

    let req = test::TestRequest::get().uri("/api/v1/search?q=truck").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"error": "Comment store unavailable"}));
}

#[actix_web::test]
async fn test_slow_aggregation_times_out() {
    let search = Arc::new(FakeSearch {
        delay: Some(Duration::from_secs(5)),
        ..FakeSearch::returning(red_truck_hits())
    });
    let comments = Arc::new(FakeComments::default());
    let app = app!(state(
        search,
        comments.clone(),
        Arc::new(FakeMedia::default()),
        Duration::from_millis(50),
    ));

    let req = test::TestRequest::get().uri("/api/v1/search?q=truck").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"error": "Search request timed out"}));
    assert_eq!(comments.calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_cors_headers_on_search_response() {
    let app = app!(state(
        Arc::new(FakeSearch::returning(Vec::new())),
        Arc::new(FakeComments::default()),
        Arc::new(FakeMedia::default()),
        Duration::from_secs(5),
    ));

    let req = test::TestRequest::get()
        .uri("/api/v1/search?q=truck")
        .insert_header((header::ORIGIN, "https://app.example.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let headers = resp.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://app.example.com"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
}

#[actix_web::test]
async fn test_cors_preflight() {
    let app = app!(state(
        Arc::new(FakeSearch::returning(Vec::new())),
        Arc::new(FakeComments::default()),
        Arc::new(FakeMedia::default()),
        Duration::from_secs(5),
    ));

    let req = test::TestRequest::default()
        .method(actix_web::http::Method::OPTIONS)
        .uri("/api/v1/search")
        .insert_header((header::ORIGIN, "https://app.example.com"))
        .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "GET"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let allowed = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    for method in ["GET", "POST", "OPTIONS"] {
        assert!(allowed.contains(method), "missing {method} in {allowed}");
    }
}

#[actix_web::test]
async fn test_health() {
    let app = app!(state(
        Arc::new(FakeSearch::returning(Vec::new())),
        Arc::new(FakeComments::default()),
        Arc::new(FakeMedia::default()),
        Duration::from_secs(5),
    ));

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"status": "ok"}));
}
