use std::sync::Arc;
use ian_inference::ArticleOrchestrator;

pub struct AppState {
    pub orchestrator: Arc<ArticleOrchestrator>,
    /// Shown by the info endpoint so operators know which server is used
    pub backend_host: String,
}
