use crate::types::{AssistantError, Result, Source, TrendAnalysis};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const TEXT_MODEL: &str = "gemini-2.5-flash";
const IMAGE_MODEL: &str = "imagen-4.0-generate-001";

/// Low-level generative backend: grounded text, schema-constrained JSON,
/// and image generation. Implemented by [`GeminiBackend`] in production and
/// by mock backends in tests.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Web-search-grounded text generation. Returns the generated text and
    /// whatever citations the backend attached (empty when none).
    async fn generate_grounded(&self, prompt: &str) -> Result<(String, Vec<Source>)>;

    /// Schema-constrained JSON generation.
    async fn generate_json(
        &self,
        prompt: &str,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value>;

    /// Generate a single image for the prompt, returned as raw JPEG bytes.
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>>;
}

//
// Wire types for the Gemini REST API
//

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(rename = "groundingMetadata", default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct GroundingMetadata {
    #[serde(rename = "groundingChunks", default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(rename = "bytesBase64Encoded", default)]
    bytes_base64_encoded: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    /// Web citations from the first candidate's grounding metadata.
    fn sources(&self) -> Vec<Source> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|meta| {
                meta.grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref())
                    .map(|web| Source::new(web.title.clone(), web.uri.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Gemini REST API backend.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, api_key }
    }

    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", API_BASE, TEXT_MODEL);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::General(format!(
                "Gemini API returned {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate_grounded(&self, prompt: &str) -> Result<(String, Vec<Source>)> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            tools: Some(vec![Tool {
                google_search: json!({}),
            }]),
            generation_config: None,
        };

        let response = self.generate_content(&request).await?;
        let sources = response.sources();
        debug!("Grounded generation returned {} sources", sources.len());

        Ok((response.text(), sources))
    }

    async fn generate_json(
        &self,
        prompt: &str,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            tools: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema,
            }),
        };

        let response = self.generate_content(&request).await?;
        let text = response.text();
        if text.is_empty() {
            return Err(AssistantError::General(
                "Empty response from AI".to_string(),
            ));
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>> {
        let url = format!("{}/models/{}:predict", API_BASE, IMAGE_MODEL);

        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": {
                "sampleCount": 1,
                "aspectRatio": "16:9",
            },
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssistantError::General(format!(
                "Imagen API returned {}",
                status
            )));
        }

        let predict: PredictResponse = response.json().await?;
        let encoded = predict
            .predictions
            .first()
            .and_then(|p| p.bytes_base64_encoded.as_deref())
            .ok_or_else(|| AssistantError::General("No image in response".to_string()))?;

        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| AssistantError::General(format!("Invalid image encoding: {}", e)))
    }
}

/// High-level AI capability client.
///
/// Owns the prompts and the failure policy: research and writing are
/// load-bearing (errors propagate), trend analysis and imagery are
/// best-effort (errors degrade to a safe default).
pub struct AiClient {
    backend: Box<dyn GenerativeBackend>,
}

impl AiClient {
    pub fn new(backend: Box<dyn GenerativeBackend>) -> Self {
        Self { backend }
    }

    /// Research a topic with web-search grounding.
    ///
    /// Load-bearing: backend failures abort the caller's run.
    pub async fn research(&self, topic: &str) -> Result<(String, Vec<Source>)> {
        if topic.trim().is_empty() {
            return Err(AssistantError::Validation(
                "Topic must not be empty".to_string(),
            ));
        }

        let prompt = format!(
            r#"Research the following topic in depth: "{topic}".

Directives:
1. **LATEST NEWS**: Focus strictly on the most recent articles, news, and updates from the web (e.g., last 30 days if applicable).
2. **DATES**: For every key finding or fact you list, you MUST explicitly mention the publication date of the source article (e.g., "As reported on Oct 15, 2024...").
3. Summarize the key findings in bullet points suitable for a blog post outline."#
        );

        let (text, sources) = self
            .backend
            .generate_grounded(&prompt)
            .await
            .map_err(|e| AssistantError::Research(e.to_string()))?;

        let summary = if text.is_empty() {
            "No research generated.".to_string()
        } else {
            text
        };

        Ok((summary, sources))
    }

    /// Extract structured trend intelligence from a research summary.
    ///
    /// Best-effort: any backend error or schema violation degrades to the
    /// neutral, empty-arrays default so partially completed research can
    /// still be surfaced.
    pub async fn analyze_trends(&self, topic: &str, research_summary: &str) -> TrendAnalysis {
        let prompt = format!(
            r#"Analyze the following research summary about "{topic}" and extract trend intelligence.

Research Summary:
{research_summary}

Return a JSON object with the following properties:
- sentiment: "positive", "neutral", or "negative"
- key_events: Array of key event strings
- sources_news: Array of news source names mentioned
- sources_social: Array of social media sources mentioned
- suggested_topics: Optional array of follow-up topics, each with a title and a rationale"#
        );

        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "sentiment": { "type": "STRING" },
                "key_events": { "type": "ARRAY", "items": { "type": "STRING" } },
                "sources_news": { "type": "ARRAY", "items": { "type": "STRING" } },
                "sources_social": { "type": "ARRAY", "items": { "type": "STRING" } },
                "suggested_topics": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "title": { "type": "STRING" },
                            "rationale": { "type": "STRING" }
                        },
                        "required": ["title", "rationale"]
                    }
                }
            },
            "required": ["sentiment", "key_events", "sources_news", "sources_social"]
        });

        match self.backend.generate_json(&prompt, schema).await {
            Ok(value) => match serde_json::from_value::<TrendAnalysis>(value) {
                Ok(analysis) => analysis,
                Err(e) => {
                    warn!("Trend analysis response failed schema validation: {}", e);
                    TrendAnalysis::default()
                }
            },
            Err(e) => {
                warn!("Trend analysis failed, falling back to neutral default: {}", e);
                TrendAnalysis::default()
            }
        }
    }

    /// Write the blog post body for a topic, grounded in research notes.
    ///
    /// Load-bearing: backend failures and unparseable bodies propagate.
    pub async fn write_post(&self, topic: &str, research_summary: &str) -> Result<(String, String)> {
        let prompt = format!(
            r#"You are a professional, empathetic, and witty blog writer. Write a **highly humanized** blog post about: "{topic}".

Use the following background research notes (which include dates) to ground the article in fact:
{research_summary}

Requirements:
1. Return the result as a JSON object.
2. "title": A catchy, click-worthy title.
3. "content": The full blog post body in HTML format (use <h2>, <h3>, <p>, <ul>, etc.).
4. **Tone**: Conversational, personal, and authoritative. Use sentence variety (mix short and long). Avoid stiff "AI-like" transitions (e.g., avoid "In conclusion", "Delving into", "In the rapidly evolving landscape").
5. **Timeliness**: Incorporate the dates found in the research to show the reader this content is fresh and up-to-date."#
        );

        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "content": { "type": "STRING" }
            },
            "required": ["title", "content"]
        });

        let value = self
            .backend
            .generate_json(&prompt, schema)
            .await
            .map_err(|e| AssistantError::Write(e.to_string()))?;

        #[derive(Deserialize)]
        struct WrittenPost {
            title: String,
            content: String,
        }

        let post: WrittenPost = serde_json::from_value(value)
            .map_err(|e| AssistantError::Write(format!("unparseable response: {}", e)))?;

        Ok((post.title, post.content))
    }

    /// Generate a featured image for a topic, as a `data:` URL.
    ///
    /// Best-effort: image generation is decorative, so every failure is
    /// logged and absorbed into `None`.
    pub async fn generate_image(&self, topic: &str) -> Option<String> {
        let prompt = format!(
            r#"Create a high-quality, professional blog featured image for the topic: "{topic}".
Style guidelines: Modern, minimalist, editorial illustration, abstract tech or business concept, soft gradient lighting (purple, blue, orange).
No text in the image."#
        );

        match self.backend.generate_image(&prompt).await {
            Ok(bytes) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
                Some(format!("data:image/jpeg;base64,{}", encoded))
            }
            Err(e) => {
                warn!("Image generation failed, continuing without image: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_text_concatenates_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "world" }] }
            }]
        }))
        .unwrap();
        assert_eq!(response.text(), "Hello world");
    }

    #[test]
    fn response_text_empty_without_candidates() {
        let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(response.text(), "");
        assert!(response.sources().is_empty());
    }

    #[test]
    fn grounding_chunks_map_to_sources_with_defaults() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "summary" }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "title": "TechCrunch", "uri": "https://techcrunch.com/a" } },
                        { "web": {} },
                        {}
                    ]
                }
            }]
        }))
        .unwrap();

        let sources = response.sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title, "TechCrunch");
        assert_eq!(sources[1].title, "Web Source");
        assert_eq!(sources[1].uri, "#");
    }
}
