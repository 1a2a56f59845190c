#![allow(dead_code)]

use async_trait::async_trait;
use blog_assistant::types::{AssistantError, PublishResult, Result, Source, WordPressSettings};
use blog_assistant::{GenerativeBackend, Publisher};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Canned-response backend. `generate_json` dispatches on the prompt so the
/// trend-analysis and write stages can be configured independently.
pub struct MockBackend {
    pub grounded: std::result::Result<(String, Vec<Source>), String>,
    pub analysis: std::result::Result<serde_json::Value, String>,
    pub post: std::result::Result<serde_json::Value, String>,
    pub image: std::result::Result<Vec<u8>, String>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            grounded: Ok((
                "Research notes with dates.".to_string(),
                vec![Source {
                    title: "TechCrunch".to_string(),
                    uri: "https://techcrunch.com/article".to_string(),
                }],
            )),
            analysis: Ok(json!({
                "sentiment": "positive",
                "key_events": ["event A"],
                "sources_news": ["TechCrunch"],
                "sources_social": []
            })),
            post: Ok(json!({
                "title": "Why AI Agents Are Eating 2025",
                "content": "<h2>Agents everywhere</h2><p>Body</p>"
            })),
            image: Ok(vec![0xFF, 0xD8, 0xFF]),
        }
    }
}

fn to_error(message: &str) -> AssistantError {
    AssistantError::General(message.to_string())
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    async fn generate_grounded(&self, _prompt: &str) -> Result<(String, Vec<Source>)> {
        self.grounded.clone().map_err(|e| to_error(&e))
    }

    async fn generate_json(
        &self,
        prompt: &str,
        _schema: serde_json::Value,
    ) -> Result<serde_json::Value> {
        if prompt.contains("trend intelligence") {
            self.analysis.clone().map_err(|e| to_error(&e))
        } else {
            self.post.clone().map_err(|e| to_error(&e))
        }
    }

    async fn generate_image(&self, _prompt: &str) -> Result<Vec<u8>> {
        self.image.clone().map_err(|e| to_error(&e))
    }
}

/// Publisher that records every draft request it receives.
pub struct MockPublisher {
    pub fail_with: Option<String>,
    pub calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self {
            fail_with: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn validate_connection(&self, settings: &WordPressSettings) -> bool {
        settings.is_connected
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

        self.calls
            .lock()
            .unwrap()
            .push((title.to_string(), content.to_string()));

        match &self.fail_with {
            Some(message) => Err(AssistantError::Publish(message.clone())),
            None => Ok(PublishResult {
                id: 42,
                link: "https://blog.example.com/?p=42".to_string(),
            }),
        }
    }
}

pub fn connected_settings() -> WordPressSettings {
    WordPressSettings {
        site_url: "https://blog.example.com".to_string(),
        username: "admin".to_string(),
        app_password: "abcd efgh".to_string(),
        is_connected: true,
    }
}

pub fn unconnected_settings() -> WordPressSettings {
    WordPressSettings {
        is_connected: false,
        ..connected_settings()
    }
}
