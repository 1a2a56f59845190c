use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A web citation extracted from grounding metadata.
///
/// The model can omit either field; missing values fall back to
/// "Web Source" / "#" so the UI always has something to render.
/// Multiple sources may share a URI; no dedup is performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

impl Source {
    pub fn new(title: Option<String>, uri: Option<String>) -> Self {
        Self {
            title: title.unwrap_or_else(|| "Web Source".to_string()),
            uri: uri.unwrap_or_else(|| "#".to_string()),
        }
    }
}

/// Sentiment of the researched topic.
///
/// Deserialization coerces anything outside the three-way enum to
/// `Neutral` rather than rejecting the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

impl<'de> Deserialize<'de> for Sentiment {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Sentiment::parse(&raw))
    }
}

/// A follow-up topic the model suggests writing about next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedTopic {
    pub title: String,
    pub rationale: String,
}

/// Structured trend intelligence derived from a research summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub sentiment: Sentiment,
    pub key_events: Vec<String>,
    pub sources_news: Vec<String>,
    pub sources_social: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_topics: Option<Vec<SuggestedTopic>>,
}

/// Output of the research stage: grounded summary, citations, and trend data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResult {
    pub summary: String,
    pub sources: Vec<Source>,
    pub trend_analysis: TrendAnalysis,
}

/// A fully drafted post assembled from the write stage plus research context.
///
/// `content` is model-produced HTML. It is never validated as well-formed
/// markup; callers may edit it and republish it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPost {
    pub title: String,
    pub content: String,
    pub research_summary: String,
    pub sources: Vec<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wordpress_link: Option<String>,
}

/// Remote id and link of a draft created on the publishing platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResult {
    pub id: i64,
    pub link: String,
}

/// Stage of the single active generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Idle,
    Researching,
    Writing,
    Drafting,
    Completed,
    Failed,
}

/// Connection settings for the WordPress publishing target.
///
/// `app_password` is a secret and must never be logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPressSettings {
    pub site_url: String,
    pub username: String,
    pub app_password: String,
    pub is_connected: bool,
}

/// Local user row resolved from an external identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub external_id: String,
    pub email: String,
    pub name: Option<String>,
}

/// A persisted source row owned by a post (cascade-deleted with it).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub id: i32,
    pub post_id: i32,
    pub title: String,
    pub uri: String,
}

/// A persisted blog post with its owned sources.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub content: String,
    pub status: String,
    pub research_summary: Option<String>,
    pub trend_analysis: Option<TrendAnalysis>,
    pub featured_image_url: Option<String>,
    pub wordpress_id: Option<i64>,
    pub wordpress_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sources: Vec<SourceRecord>,
}

/// Fields accepted when creating a post record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub research_summary: Option<String>,
    #[serde(default)]
    pub trend_analysis: Option<TrendAnalysis>,
    #[serde(default)]
    pub featured_image_url: Option<String>,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{0}")]
    Validation(String),

    #[error("Failed to research topic: {0}")]
    Research(String),

    #[error("Failed to generate blog post content: {0}")]
    Write(String),

    #[error("WordPress API error: {0}")]
    Publish(String),

    #[error("WordPress is not connected")]
    NotConnected,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, AssistantError>;
