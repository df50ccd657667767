//! Turns a [`GenerationRequest`] into a persisted [`Article`].
//!
//! A run is an explicit state machine. Title, summary and content must be
//! generated in that order because each prompt embeds the previous answers;
//! tags only need the request and may be generated next to the title. The
//! store sees exactly one write, the final `create`, so a failed or
//! cancelled run never leaves a partial record behind.
//!
//! Within one orchestrator, slug allocation and the final `create` happen
//! under a single lock, so runs with colliding titles each get their own
//! slug. Runs in other processes are still arbitrated by the store's
//! uniqueness constraint.

use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use ian_core::{
    Article, ArticleStore, Error, ErrorKind, GeneratedArticle, GenerationBackend, GenerationRequest,
    NewArticle, Result, SlugAllocator,
};
use crate::gate::AvailabilityGate;
use crate::prompts;
use crate::InferenceConfig;

pub const MAX_TAGS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStep {
    Title,
    Summary,
    Content,
    Tags,
    Assembly,
    SlugAllocation,
    Persistence,
}

impl fmt::Display for GenerationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationStep::Title => "title generation",
            GenerationStep::Summary => "summary generation",
            GenerationStep::Content => "content generation",
            GenerationStep::Tags => "tag generation",
            GenerationStep::Assembly => "assembly",
            GenerationStep::SlugAllocation => "slug allocation",
            GenerationStep::Persistence => "persistence",
        };
        f.write_str(name)
    }
}

/// Where a run stands. `tags` is `Some` early only when tags were generated
/// alongside the title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    TitleGenerated {
        title: String,
        tags: Option<Vec<String>>,
    },
    SummaryGenerated {
        title: String,
        summary: String,
        tags: Option<Vec<String>>,
    },
    ContentGenerated {
        title: String,
        summary: String,
        content: String,
        tags: Option<Vec<String>>,
    },
    TagsGenerated {
        title: String,
        summary: String,
        content: String,
        tags: Vec<String>,
    },
    Assembled(GeneratedArticle),
    SlugAllocated {
        article: GeneratedArticle,
        slug: String,
    },
    Persisted(Article),
    Failed {
        step: GenerationStep,
        kind: ErrorKind,
    },
}

impl GenerationState {
    pub fn name(&self) -> &'static str {
        match self {
            GenerationState::Idle => "idle",
            GenerationState::TitleGenerated { .. } => "title generated",
            GenerationState::SummaryGenerated { .. } => "summary generated",
            GenerationState::ContentGenerated { .. } => "content generated",
            GenerationState::TagsGenerated { .. } => "tags generated",
            GenerationState::Assembled(_) => "assembled",
            GenerationState::SlugAllocated { .. } => "slug allocated",
            GenerationState::Persisted(_) => "persisted",
            GenerationState::Failed { .. } => "failed",
        }
    }

    /// The step [`ArticleOrchestrator::advance`] runs next, `None` once terminal.
    pub fn pending_step(&self) -> Option<GenerationStep> {
        match self {
            GenerationState::Idle => Some(GenerationStep::Title),
            GenerationState::TitleGenerated { .. } => Some(GenerationStep::Summary),
            GenerationState::SummaryGenerated { .. } => Some(GenerationStep::Content),
            GenerationState::ContentGenerated { .. } => Some(GenerationStep::Tags),
            GenerationState::TagsGenerated { .. } => Some(GenerationStep::Assembly),
            GenerationState::Assembled(_) => Some(GenerationStep::SlugAllocation),
            GenerationState::SlugAllocated { .. } => Some(GenerationStep::Persistence),
            GenerationState::Persisted(_) | GenerationState::Failed { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.pending_step().is_none()
    }
}

pub struct ArticleOrchestrator {
    backend: Arc<dyn GenerationBackend>,
    store: Arc<dyn ArticleStore>,
    model: String,
    allocator: SlugAllocator,
    concurrent_tags: bool,
    permits: Arc<Semaphore>,
    slug_claim: Mutex<()>,
}

impl fmt::Debug for ArticleOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticleOrchestrator")
            .field("backend", &self.backend.name())
            .field("model", &self.model)
            .field("concurrent_tags", &self.concurrent_tags)
            .finish()
    }
}

impl ArticleOrchestrator {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        store: Arc<dyn ArticleStore>,
        config: &InferenceConfig,
    ) -> Self {
        Self {
            backend,
            store,
            model: config.model.clone(),
            allocator: SlugAllocator::new(config.slug_attempts),
            concurrent_tags: config.concurrent_tags,
            permits: Arc::new(Semaphore::new(config.max_concurrent_runs.max(1))),
            slug_claim: Mutex::new(()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }

    pub fn store(&self) -> &Arc<dyn ArticleStore> {
        &self.store
    }

    pub fn gate(&self) -> AvailabilityGate {
        AvailabilityGate::new(self.backend.clone())
    }

    /// Resolves `category_id` through the store and runs a full generation.
    pub async fn run_for_category(
        &self,
        topic: &str,
        category_id: &str,
        tone: Option<&str>,
    ) -> Result<Article> {
        let category = self
            .store
            .find_category(category_id)
            .await?
            .ok_or_else(|| Error::CategoryNotFound(category_id.to_string()))?;

        let mut request = GenerationRequest::new(topic, category.name)?;
        if let Some(tone) = tone {
            request = request.with_tone(tone);
        }
        self.run(&request, &category.id).await
    }

    /// Drives a request from `Idle` to `Persisted`.
    pub async fn run(&self, request: &GenerationRequest, category_id: &str) -> Result<Article> {
        request.validate()?;
        if category_id.trim().is_empty() {
            return Err(Error::InvalidRequest("category id is required".to_string()));
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| Error::External(e.into()))?;

        tracing::info!("📰 Generating article about '{}' ({})", request.topic(), request.category_name());
        match self.drive(request, category_id, GenerationState::Idle).await {
            (_, Some(err)) => Err(err),
            (GenerationState::Persisted(article), None) => {
                tracing::info!("✅ Article '{}' stored as {}", article.title, article.slug);
                Ok(article)
            }
            (other, None) => Err(Error::External(anyhow::anyhow!(
                "generation stopped in state '{}'",
                other.name()
            ))),
        }
    }

    /// Runs the four model calls and assembles the result without touching
    /// the store.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedArticle> {
        request.validate()?;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| Error::External(e.into()))?;

        let mut state = GenerationState::Idle;
        loop {
            state = self.step(request, "", state).await.map_err(|(_, err)| err)?;
            if let GenerationState::Assembled(article) = state {
                return Ok(article);
            }
        }
    }

    /// Advances `state` until it is terminal. Returns the final state, either
    /// `Persisted` or `Failed { step, kind }`, and the error that stopped the
    /// run, if any. Does not take a run permit.
    pub async fn drive(
        &self,
        request: &GenerationRequest,
        category_id: &str,
        mut state: GenerationState,
    ) -> (GenerationState, Option<Error>) {
        while !state.is_terminal() {
            let next = if matches!(state, GenerationState::Assembled(_)) {
                let _claim = self.slug_claim.lock().await;
                match self.step(request, category_id, state).await {
                    Ok(allocated) => self.step(request, category_id, allocated).await,
                    failed => failed,
                }
            } else {
                self.step(request, category_id, state).await
            };

            match next {
                Ok(next) => state = next,
                Err((failed, err)) => return (failed, Some(err)),
            }
        }
        (state, None)
    }

    async fn step(
        &self,
        request: &GenerationRequest,
        category_id: &str,
        state: GenerationState,
    ) -> std::result::Result<GenerationState, (GenerationState, Error)> {
        let Some(step) = state.pending_step() else {
            return Ok(state);
        };

        match self.advance(request, category_id, state).await {
            Ok(next) => {
                tracing::info!("✨ {} done, run is now {}", step, next.name());
                Ok(next)
            }
            Err(err) => {
                tracing::warn!("❌ {} failed: {}", step, err);
                Err((GenerationState::Failed { step, kind: err.kind() }, err))
            }
        }
    }

    /// Performs exactly one transition. Terminal states are returned as is.
    pub async fn advance(
        &self,
        request: &GenerationRequest,
        category_id: &str,
        state: GenerationState,
    ) -> Result<GenerationState> {
        match state {
            GenerationState::Idle => {
                if self.concurrent_tags {
                    let (title, tags) = tokio::try_join!(
                        self.generate_title(request),
                        self.generate_tags(request)
                    )?;
                    Ok(GenerationState::TitleGenerated { title, tags: Some(tags) })
                } else {
                    let title = self.generate_title(request).await?;
                    Ok(GenerationState::TitleGenerated { title, tags: None })
                }
            }
            GenerationState::TitleGenerated { title, tags } => {
                let prompt = prompts::summary_prompt(request, &title);
                let summary = self.ask_text(GenerationStep::Summary, &prompt).await?;
                Ok(GenerationState::SummaryGenerated { title, summary, tags })
            }
            GenerationState::SummaryGenerated { title, summary, tags } => {
                let prompt = prompts::content_prompt(request, &title, &summary);
                let content = self.ask_text(GenerationStep::Content, &prompt).await?;
                Ok(GenerationState::ContentGenerated { title, summary, content, tags })
            }
            GenerationState::ContentGenerated { title, summary, content, tags } => {
                let tags = match tags {
                    Some(tags) => tags,
                    None => self.generate_tags(request).await?,
                };
                Ok(GenerationState::TagsGenerated { title, summary, content, tags })
            }
            GenerationState::TagsGenerated { title, summary, content, tags } => {
                Ok(GenerationState::Assembled(assemble(title, summary, content, tags)?))
            }
            GenerationState::Assembled(article) => {
                let store = self.store.clone();
                let slug = self
                    .allocator
                    .allocate(&article.title, move |slug| {
                        let store = store.clone();
                        async move {
                            store
                                .find_by_slug(&slug)
                                .await
                                .map(|found| found.is_some())
                                .map_err(into_persistence_failure)
                        }
                    })
                    .await
                    .map_err(|e| e.context(GenerationStep::SlugAllocation))?;
                Ok(GenerationState::SlugAllocated { article, slug })
            }
            GenerationState::SlugAllocated { article, slug } => {
                let new_article = NewArticle::from_generated(article, slug, category_id.to_string());
                let article = self
                    .store
                    .create(new_article)
                    .await
                    .map_err(|e| into_persistence_failure(e).context(GenerationStep::Persistence))?;
                Ok(GenerationState::Persisted(article))
            }
            terminal @ (GenerationState::Persisted(_) | GenerationState::Failed { .. }) => Ok(terminal),
        }
    }

    async fn ask(&self, step: GenerationStep, prompt: &str) -> Result<String> {
        tracing::debug!("🤖 {} prompt:\n{}", step, prompt);
        let raw = self
            .backend
            .complete(&self.model, prompt)
            .await
            .map_err(|e| e.context(step))?;
        Ok(raw.trim().to_string())
    }

    async fn ask_text(&self, step: GenerationStep, prompt: &str) -> Result<String> {
        let text = self.ask(step, prompt).await?;
        require_text(step, text)
    }

    async fn generate_title(&self, request: &GenerationRequest) -> Result<String> {
        let raw = self.ask(GenerationStep::Title, &prompts::title_prompt(request)).await?;
        require_text(GenerationStep::Title, clean_title(&raw))
    }

    async fn generate_tags(&self, request: &GenerationRequest) -> Result<Vec<String>> {
        let raw = self.ask(GenerationStep::Tags, &prompts::tag_prompt(request)).await?;
        Ok(parse_tags(&raw))
    }
}

fn require_text(step: GenerationStep, text: String) -> Result<String> {
    if text.is_empty() {
        Err(Error::BackendError(format!("{}: model returned an empty response", step)))
    } else {
        Ok(text)
    }
}

fn assemble(title: String, summary: String, content: String, tags: Vec<String>) -> Result<GeneratedArticle> {
    for (field, value) in [("title", &title), ("summary", &summary), ("content", &content)] {
        if value.trim().is_empty() {
            return Err(Error::BackendError(format!("{}: missing {}", GenerationStep::Assembly, field)));
        }
    }
    Ok(GeneratedArticle {
        title: title.trim().to_string(),
        summary: summary.trim().to_string(),
        content: content.trim().to_string(),
        tags: tags.into_iter().take(MAX_TAGS).collect(),
    })
}

fn into_persistence_failure(err: Error) -> Error {
    match err {
        Error::PersistenceFailed(msg) => Error::PersistenceFailed(msg),
        other => Error::PersistenceFailed(other.to_string()),
    }
}

/// Models ignore "no quotes" often enough; keep the first line and drop
/// wrapping quotes.
pub fn clean_title(raw: &str) -> String {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    line.trim_matches(|c: char| matches!(c, '"' | '\'' | '“' | '”' | '«' | '»' | '*'))
        .trim()
        .to_string()
}

/// Comma (or line) separated tags, trimmed, empties dropped, at most five.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(|c| c == ',' || c == '\n')
        .map(|tag| tag.trim().trim_start_matches('#').trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .take(MAX_TAGS)
        .collect()
}
