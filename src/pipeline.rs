use crate::gemini::AiClient;
use crate::store::PostStore;
use crate::types::{
    AssistantError, GeneratedPost, NewPost, PipelineState, PostRecord, PublishResult,
    ResearchResult, Result, WordPressSettings,
};
use crate::wordpress::Publisher;
use tracing::{info, warn};

/// Orchestrates a single generation run:
/// topic -> research -> trend analysis -> draft -> optional WordPress draft.
///
/// The pipeline owns all run state. One run is active at a time; a new run
/// resets the previous one's outputs. Stages execute sequentially and each
/// network call is awaited to completion before the next stage begins.
pub struct GenerationPipeline {
    ai: AiClient,
    publisher: Box<dyn Publisher>,
    state: PipelineState,
    research: Option<ResearchResult>,
    post: Option<GeneratedPost>,
    publish_result: Option<PublishResult>,
    error: Option<String>,
}

impl GenerationPipeline {
    pub fn new(ai: AiClient, publisher: Box<dyn Publisher>) -> Self {
        Self {
            ai,
            publisher,
            state: PipelineState::Idle,
            research: None,
            post: None,
            publish_result: None,
            error: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn research(&self) -> Option<&ResearchResult> {
        self.research.as_ref()
    }

    pub fn post(&self) -> Option<&GeneratedPost> {
        self.post.as_ref()
    }

    pub fn publish_result(&self) -> Option<&PublishResult> {
        self.publish_result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Return to `Idle`, clearing all outputs of the previous run.
    pub fn reset(&mut self) {
        self.state = PipelineState::Idle;
        self.clear_outputs();
    }

    fn clear_outputs(&mut self) {
        self.research = None;
        self.post = None;
        self.publish_result = None;
        self.error = None;
    }

    fn fail(&mut self, message: String) {
        warn!("Pipeline run failed: {}", message);
        self.error = Some(message);
        self.state = PipelineState::Failed;
    }

    /// Execute a full run for `topic`.
    ///
    /// When `settings` is present and connected, a WordPress draft is
    /// created automatically after the write stage; otherwise the run
    /// completes with publishing unattempted.
    ///
    /// A whitespace-only topic never starts the run: no state transition
    /// occurs and prior outputs are left untouched.
    pub async fn run(
        &mut self,
        topic: &str,
        settings: Option<&WordPressSettings>,
    ) -> Result<()> {
        if topic.trim().is_empty() {
            return Err(AssistantError::Validation(
                "Topic must not be empty".to_string(),
            ));
        }

        self.clear_outputs();
        self.state = PipelineState::Researching;
        info!("Researching topic: {}", topic);

        let (summary, sources) = match self.ai.research(topic).await {
            Ok(result) => result,
            Err(e) => {
                let message = e.to_string();
                self.fail(message);
                return Err(e);
            }
        };

        // Trend analysis never fails; it degrades to a neutral default.
        let trend_analysis = self.ai.analyze_trends(topic, &summary).await;
        self.research = Some(ResearchResult {
            summary: summary.clone(),
            sources: sources.clone(),
            trend_analysis,
        });

        self.state = PipelineState::Writing;
        info!("Writing post for topic: {}", topic);

        let (title, content) = match self.ai.write_post(topic, &summary).await {
            Ok(result) => result,
            Err(e) => {
                let message = e.to_string();
                self.fail(message);
                return Err(e);
            }
        };

        self.post = Some(GeneratedPost {
            title,
            content,
            research_summary: summary,
            sources,
            wordpress_link: None,
        });

        match settings {
            Some(settings) if settings.is_connected => self.draft_current(settings, None).await,
            _ => {
                self.state = PipelineState::Completed;
                info!("Run completed without publishing");
                Ok(())
            }
        }
    }

    /// Manually re-trigger drafting with edited content.
    ///
    /// Re-enters `Drafting` using the caller's current edited content
    /// rather than the original generated content. This is the only path
    /// where the published content can diverge from what the model wrote.
    pub async fn redraft(
        &mut self,
        settings: &WordPressSettings,
        edited_content: &str,
    ) -> Result<()> {
        if self.post.is_none() {
            return Err(AssistantError::Validation(
                "No generated post to draft".to_string(),
            ));
        }

        self.draft_current(settings, Some(edited_content)).await
    }

    /// Enter `Drafting` and push the current post to WordPress. On failure
    /// the run fails with a stage-identifying prefix, but the generated
    /// post stays available so the caller does not lose the draft.
    async fn draft_current(
        &mut self,
        settings: &WordPressSettings,
        content_override: Option<&str>,
    ) -> Result<()> {
        let (title, content) = match self.post.as_ref() {
            Some(post) => (
                post.title.clone(),
                content_override
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| post.content.clone()),
            ),
            None => {
                return Err(AssistantError::Validation(
                    "No generated post to draft".to_string(),
                ))
            }
        };

        self.state = PipelineState::Drafting;
        info!("Drafting \"{}\" to WordPress", title);

        match self.publisher.create_draft(settings, &title, &content).await {
            Ok(result) => {
                if let Some(post) = self.post.as_mut() {
                    post.wordpress_link = Some(result.link.clone());
                }
                self.publish_result = Some(result);
                self.state = PipelineState::Completed;
                Ok(())
            }
            Err(e) => {
                self.fail(format!("Failed to draft to WordPress: {}", e));
                Err(e)
            }
        }
    }

    /// Best-effort featured image for the topic; never fails the run.
    pub async fn generate_image(&self, topic: &str) -> Option<String> {
        self.ai.generate_image(topic).await
    }

    /// Snapshot the current generated post as a record payload, carrying
    /// the run's trend analysis and citations along with it.
    pub fn draft_record(&self) -> Result<NewPost> {
        let post = self.post.as_ref().ok_or_else(|| {
            AssistantError::Validation("No generated post to save".to_string())
        })?;

        Ok(NewPost {
            title: post.title.clone(),
            content: post.content.clone(),
            status: Some("draft".to_string()),
            research_summary: Some(post.research_summary.clone()),
            trend_analysis: self
                .research
                .as_ref()
                .map(|r| r.trend_analysis.clone()),
            featured_image_url: None,
            sources: post.sources.clone(),
        })
    }

    /// Persist the current generated post as a draft record owned by
    /// `user_id`.
    pub async fn save_draft(&self, store: &PostStore, user_id: i32) -> Result<PostRecord> {
        store.create_post(user_id, self.draft_record()?).await
    }
}
