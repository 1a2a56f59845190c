use crate::types::{AssistantError, PublishResult, Result, WordPressSettings};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Publishing target abstraction. Implemented by [`WordPressClient`] in
/// production and by mock publishers in tests.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Read-only authenticated probe. Any transport error or non-success
    /// status yields `false`, never an error.
    async fn validate_connection(&self, settings: &WordPressSettings) -> bool;

    /// Create a draft post on the remote platform. Single attempt, no retry.
    async fn create_draft(
        &self,
        settings: &WordPressSettings,
        title: &str,
        content: &str,
    ) -> Result<PublishResult>;
}

#[derive(Debug, Serialize)]
struct DraftRequest<'a> {
    title: &'a str,
    content: &'a str,
    status: &'a str,
}

#[derive(Debug, Deserialize)]
struct WpPost {
    id: i64,
    link: String,
}

/// Error for a non-success draft response. The numeric code is always
/// included so non-standard statuses still identify themselves.
fn publish_error(status: reqwest::StatusCode) -> AssistantError {
    AssistantError::Publish(format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown error")
    ))
}

/// Client for the WordPress REST API (application-password basic auth).
pub struct WordPressClient {
    client: reqwest::Client,
}

impl WordPressClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    fn endpoint(settings: &WordPressSettings, path: &str) -> String {
        format!(
            "{}/wp-json/wp/v2/{}",
            settings.site_url.trim_end_matches('/'),
            path
        )
    }
}

impl Default for WordPressClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for WordPressClient {
    async fn validate_connection(&self, settings: &WordPressSettings) -> bool {
        let url = Self::endpoint(settings, "users/me");

        match self
            .client
            .get(&url)
            .basic_auth(&settings.username, Some(&settings.app_password))
            .send()
            .await
        {
            Ok(response) => {
                let ok = response.status().is_success();
                debug!("WordPress validation for {}: {}", settings.site_url, ok);
                ok
            }
            Err(e) => {
                warn!("WordPress validation error: {}", e);
                false
            }
        }
    }

    async fn create_draft(
        &self,
        settings: &WordPressSettings,
        title: &str,
        content: &str,
    ) -> Result<PublishResult> {
        if !settings.is_connected {
            return Err(AssistantError::NotConnected);
        }

        let url = Self::endpoint(settings, "posts");
        let body = DraftRequest {
            title,
            content,
            status: "draft",
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&settings.username, Some(&settings.app_password))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(publish_error(status));
        }

        let post: WpPost = response.json().await?;
        debug!("Created WordPress draft {} at {}", post.id, post.link);

        Ok(PublishResult {
            id: post.id,
            link: post.link,
        })
    }
}
