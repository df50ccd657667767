use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::Mutex;
use ian_core::{Error, GenerationBackend, ModelInfo, Result};
use crate::prompts::PromptKind;

/// What the scripted backend does when it sees a prompt.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Unavailable,
    Fail(String),
}

/// Deterministic backend keyed on [`PromptKind`]. Counts calls so tests can
/// assert what reached the "model".
pub struct ScriptedBackend {
    replies: HashMap<PromptKind, Reply>,
    fallback: Reply,
    available: AtomicBool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl fmt::Debug for ScriptedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedBackend")
            .field("replies", &self.replies.len())
            .field("calls", &self.calls.load(Ordering::SeqCst))
            .finish()
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            fallback: Reply::Fail("no scripted reply for prompt".to_string()),
            available: AtomicBool::new(true),
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Canned replies for every generation step, used for offline runs.
    pub fn newsroom() -> Self {
        Self::new()
            .reply(PromptKind::Title, "Los robots domésticos llegan a los hogares")
            .reply(
                PromptKind::Summary,
                "Cada vez más familias incorporan robots a sus tareas diarias. \
                 La tendencia plantea nuevas preguntas sobre privacidad y empleo.",
            )
            .reply(
                PromptKind::Content,
                "Los robots domésticos dejaron de ser ciencia ficción.\n\n\
                 Fabricantes de todo el mundo compiten por ofrecer asistentes capaces de limpiar, \
                 cocinar y acompañar a personas mayores.\n\n\
                 El desafío de los próximos años será integrarlos sin sacrificar la privacidad.",
            )
            .reply(PromptKind::Tags, "robótica, hogar, tecnología, automatización, inteligencia artificial")
            .fallback(Reply::Text("Respuesta de prueba".to_string()))
    }

    pub fn reply(mut self, kind: PromptKind, text: impl Into<String>) -> Self {
        self.replies.insert(kind, Reply::Text(text.into()));
        self
    }

    pub fn script(mut self, kind: PromptKind, reply: Reply) -> Self {
        self.replies.insert(kind, reply);
        self
    }

    pub fn fallback(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    /// Sleep before answering, to force interleaving between runs.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn complete_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _model: &str, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().await.push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = PromptKind::of(prompt)
            .and_then(|kind| self.replies.get(&kind))
            .unwrap_or(&self.fallback);

        match reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Unavailable => Err(Error::BackendUnavailable("scripted backend is down".to_string())),
            Reply::Fail(message) => Err(Error::BackendError(message.clone())),
        }
    }

    async fn probe(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            name: "scripted".to_string(),
            size: 0,
            modified_at: None,
        }])
    }
}
