mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use blog_assistant::types::WordPressSettings;
use blog_assistant::{create_router, AiClient, AppState, PostStore};
use common::{connected_settings, MockBackend, MockPublisher};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower::ServiceExt;

/// Router over mock backends and a lazy pool (no database is contacted by
/// the requests exercised here).
fn router_with(
    backend: MockBackend,
    publisher: MockPublisher,
    wordpress: Option<WordPressSettings>,
) -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgresql://localhost:5432/blog_assistant_test")
        .expect("lazy pool");

    let state = Arc::new(AppState {
        ai: AiClient::new(Box::new(backend)),
        store: PostStore::new(pool),
        publisher: Box::new(publisher),
        wordpress,
    });
    create_router(state)
}

fn test_router(backend: MockBackend) -> Router {
    router_with(backend, MockPublisher::new(), Some(connected_settings()))
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn research_requires_topic() {
    let app = test_router(MockBackend::default());

    let response = app
        .oneshot(json_request("/api/research", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Topic is required and must be a string");
}

#[tokio::test]
async fn research_rejects_non_string_topic() {
    let app = test_router(MockBackend::default());

    let response = app
        .oneshot(json_request("/api/research", json!({ "topic": 42 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn research_returns_summary_sources_and_analysis() {
    let app = test_router(MockBackend::default());

    let response = app
        .oneshot(json_request(
            "/api/research",
            json!({ "topic": "AI agents in 2025" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["summary"], "Research notes with dates.");
    assert_eq!(body["sources"][0]["title"], "TechCrunch");
    assert_eq!(body["trendAnalysis"]["sentiment"], "positive");
    assert_eq!(body["trendAnalysis"]["key_events"][0], "event A");
}

#[tokio::test]
async fn research_backend_failure_is_a_generic_500() {
    let app = test_router(MockBackend {
        grounded: Err("secret quota detail".to_string()),
        ..MockBackend::default()
    });

    let response = app
        .oneshot(json_request("/api/research", json!({ "topic": "x" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Failed to research topic");
}

#[tokio::test]
async fn research_analysis_failure_still_succeeds_with_default() {
    let app = test_router(MockBackend {
        analysis: Err("analysis backend down".to_string()),
        ..MockBackend::default()
    });

    let response = app
        .oneshot(json_request("/api/research", json!({ "topic": "x" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["trendAnalysis"]["sentiment"], "neutral");
    assert_eq!(body["trendAnalysis"]["key_events"], json!([]));
}

#[tokio::test]
async fn generate_post_requires_both_fields() {
    let app = test_router(MockBackend::default());
    let response = app
        .clone()
        .oneshot(json_request("/api/generate-post", json!({ "topic": "x" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "Research summary is required and must be a string"
    );

    let response = app
        .oneshot(json_request(
            "/api/generate-post",
            json!({ "researchSummary": "notes" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generate_post_returns_title_and_content() {
    let app = test_router(MockBackend::default());

    let response = app
        .oneshot(json_request(
            "/api/generate-post",
            json!({ "topic": "AI agents in 2025", "researchSummary": "notes" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["title"], "Why AI Agents Are Eating 2025");
    assert!(body["content"].as_str().unwrap().contains("<h2>"));
}

#[tokio::test]
async fn generate_post_backend_failure_is_a_generic_500() {
    let app = test_router(MockBackend {
        post: Err("boom".to_string()),
        ..MockBackend::default()
    });

    let response = app
        .oneshot(json_request(
            "/api/generate-post",
            json!({ "topic": "x", "researchSummary": "y" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Failed to generate blog post content");
}

#[tokio::test]
async fn generate_image_failure_returns_null_not_error() {
    let app = test_router(MockBackend {
        image: Err("image backend down".to_string()),
        ..MockBackend::default()
    });

    let response = app
        .oneshot(json_request(
            "/api/generate-image",
            json!({ "topic": "x" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["imageUrl"].is_null());
}

#[tokio::test]
async fn generate_image_success_returns_data_url() {
    let app = test_router(MockBackend::default());

    let response = app
        .oneshot(json_request(
            "/api/generate-image",
            json!({ "topic": "x" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["imageUrl"]
        .as_str()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));
}

#[tokio::test]
async fn generate_image_requires_topic() {
    let app = test_router(MockBackend::default());

    let response = app
        .oneshot(json_request("/api/generate-image", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn posts_require_caller_identity() {
    let app = test_router(MockBackend::default());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/posts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(json_request("/api/posts", json!({ "title": "t" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_post_requires_title() {
    let app = test_router(MockBackend::default());

    let mut request = json_request("/api/posts", json!({ "content": "<p>x</p>" }));
    request
        .headers_mut()
        .insert("x-user-id", "user-1".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Title is required and must be a string");
}

fn draft_request(body: Value) -> Request<Body> {
    let mut request = json_request("/api/draft", body);
    request
        .headers_mut()
        .insert("x-user-id", "user-1".parse().unwrap());
    request
}

#[tokio::test]
async fn draft_requires_caller_identity() {
    let app = test_router(MockBackend::default());

    let response = app
        .oneshot(json_request(
            "/api/draft",
            json!({ "title": "t", "content": "<p>c</p>" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn draft_requires_title_and_content() {
    let app = test_router(MockBackend::default());

    let response = app
        .clone()
        .oneshot(draft_request(json!({ "content": "<p>c</p>" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Title is required and must be a string");

    let response = app
        .oneshot(draft_request(json!({ "title": "t" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Content is required and must be a string");
}

#[tokio::test]
async fn draft_sends_edited_content_and_returns_link() {
    let publisher = MockPublisher::new();
    let calls = publisher.calls.clone();
    let app = router_with(
        MockBackend::default(),
        publisher,
        Some(connected_settings()),
    );

    let response = app
        .oneshot(draft_request(
            json!({ "title": "My Edited Title", "content": "<p>edited</p>" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], 42);
    assert_eq!(body["link"], "https://blog.example.com/?p=42");

    let recorded = calls.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, "My Edited Title");
    assert_eq!(recorded[0].1, "<p>edited</p>");
}

#[tokio::test]
async fn draft_without_connected_settings_is_a_conflict() {
    for wordpress in [None, Some(common::unconnected_settings())] {
        let app = router_with(MockBackend::default(), MockPublisher::new(), wordpress);

        let response = app
            .oneshot(draft_request(json!({ "title": "t", "content": "<p>c</p>" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"], "WordPress is not connected");
    }
}

#[tokio::test]
async fn draft_publish_failure_is_a_generic_500() {
    let app = router_with(
        MockBackend::default(),
        MockPublisher::failing("503 Service Unavailable"),
        Some(connected_settings()),
    );

    let response = app
        .oneshot(draft_request(json!({ "title": "t", "content": "<p>c</p>" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Failed to draft to WordPress");
}

#[tokio::test]
async fn health_endpoint_is_open() {
    let app = test_router(MockBackend::default());

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
