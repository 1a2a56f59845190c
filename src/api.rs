use crate::gemini::AiClient;
use crate::store::PostStore;
use crate::types::{AssistantError, NewPost, ResearchResult, Result, WordPressSettings};
use crate::wordpress::Publisher;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

/// Shared state for the HTTP surface.
///
/// `wordpress` holds the startup-validated settings; `None` (or settings
/// with `is_connected` false) means drafting is unavailable.
pub struct AppState {
    pub ai: AiClient,
    pub store: PostStore,
    pub publisher: Box<dyn Publisher>,
    pub wordpress: Option<WordPressSettings>,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/research", post(research))
        .route("/api/generate-post", post(generate_post))
        .route("/api/generate-image", post(generate_image))
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/draft", post(draft_to_wordpress))
        .with_state(state)
}

/// Error wrapper that maps the crate error taxonomy onto HTTP statuses.
/// Backend failures surface as generic 500 messages; the detail is logged.
pub struct ApiError(AssistantError);

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AssistantError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AssistantError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            AssistantError::NotFound(what) => {
                (StatusCode::NOT_FOUND, format!("Not found: {}", what))
            }
            AssistantError::NotConnected => (
                StatusCode::CONFLICT,
                "WordPress is not connected".to_string(),
            ),
            AssistantError::Research(detail) => {
                error!("Research failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to research topic".to_string(),
                )
            }
            AssistantError::Write(detail) => {
                error!("Post generation failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate blog post content".to_string(),
                )
            }
            AssistantError::Publish(detail) => {
                error!("WordPress draft failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to draft to WordPress".to_string(),
                )
            }
            other => {
                error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Extract a required string field from a JSON body, mirroring the
/// field-level 400 messages of the external interface contract.
fn required_string(body: &Value, field: &str, label: &str) -> Result<String> {
    match body.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(AssistantError::Validation(format!(
            "{} is required and must be a string",
            label
        ))),
    }
}

/// Caller identity from request headers: external id (required), plus
/// optional email and display name used when lazily creating the local row.
fn identity(headers: &HeaderMap) -> Result<(String, String, Option<String>)> {
    let external_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|s| !s.is_empty())
        .ok_or(AssistantError::Unauthorized)?;

    let email = headers
        .get("x-user-email")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let name = headers
        .get("x-user-name")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    Ok((external_id, email, name))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn research(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<Json<ResearchResult>> {
    let topic = required_string(&body, "topic", "Topic")?;

    let (summary, sources) = state.ai.research(&topic).await?;
    let trend_analysis = state.ai.analyze_trends(&topic, &summary).await;

    Ok(Json(ResearchResult {
        summary,
        sources,
        trend_analysis,
    }))
}

#[derive(Debug, Serialize)]
struct GeneratePostResponse {
    title: String,
    content: String,
}

async fn generate_post(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<Json<GeneratePostResponse>> {
    let topic = required_string(&body, "topic", "Topic")?;
    let research_summary = required_string(&body, "researchSummary", "Research summary")?;

    let (title, content) = state.ai.write_post(&topic, &research_summary).await?;

    Ok(Json(GeneratePostResponse { title, content }))
}

async fn generate_image(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let topic = required_string(&body, "topic", "Topic")?;

    // Best-effort by contract: a backend failure yields a null image, not
    // an error status, so the caller's flow can continue.
    let image_url = state.ai.generate_image(&topic).await;

    Ok(Json(json!({ "imageUrl": image_url })))
}

async fn list_posts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let (external_id, email, name) = identity(&headers)?;
    let user = state
        .store
        .get_or_create_user(&external_id, &email, name.as_deref())
        .await?;

    let posts = state.store.list_posts(user.id).await?;
    Ok(Json(posts).into_response())
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let (external_id, email, name) = identity(&headers)?;

    // Title validation happens before user resolution or any insert so a
    // bad request never touches the database.
    required_string(&body, "title", "Title")?;
    let new_post: NewPost = serde_json::from_value(body)
        .map_err(|e| AssistantError::Validation(format!("Invalid post payload: {}", e)))?;

    let user = state
        .store
        .get_or_create_user(&external_id, &email, name.as_deref())
        .await?;

    let post = state.store.create_post(user.id, new_post).await?;
    Ok(Json(post).into_response())
}

/// Push edited title/content to WordPress as a draft using the server's
/// validated settings. When `postId` is supplied, the remote id and link
/// are recorded on that post record.
async fn draft_to_wordpress(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let (external_id, email, name) = identity(&headers)?;
    let title = required_string(&body, "title", "Title")?;
    let content = required_string(&body, "content", "Content")?;

    let settings = state
        .wordpress
        .as_ref()
        .filter(|s| s.is_connected)
        .ok_or(AssistantError::NotConnected)?;

    let result = state
        .publisher
        .create_draft(settings, &title, &content)
        .await?;

    if let Some(post_id) = body.get("postId").and_then(Value::as_i64) {
        let user = state
            .store
            .get_or_create_user(&external_id, &email, name.as_deref())
            .await?;
        state
            .store
            .update_wordpress_link(post_id as i32, user.id, result.id, &result.link)
            .await?;
    }

    Ok(Json(json!({ "id": result.id, "link": result.link })))
}
