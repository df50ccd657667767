use std::time::Duration;
use ian_core::{Error, Result};
use url::Url;

pub mod gate;
pub mod models;
pub mod orchestrator;
pub mod prompts;

pub const DEFAULT_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama2";

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Base URL of the Ollama server
    pub host: String,
    /// Model used for every generation step
    pub model: String,
    pub connect_timeout: Duration,
    /// Local inference is slow, so this covers a whole completion.
    pub request_timeout: Duration,
    /// Upper bound on orchestration runs hitting the backend at once
    pub max_concurrent_runs: usize,
    /// Generate tags alongside the title instead of after the content
    pub concurrent_tags: bool,
    /// Disambiguation attempts before a slug collision becomes fatal
    pub slug_attempts: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_concurrent_runs: 2,
            concurrent_tags: false,
            slug_attempts: ian_core::slug::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl InferenceConfig {
    pub fn with_host(mut self, host: &str) -> Result<Self> {
        let parsed = Url::parse(host)
            .map_err(|e| Error::Config(format!("invalid backend host '{}': {}", host, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::Config(format!("unsupported scheme in backend host: {}", host)));
        }
        self.host = host.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model.trim().to_string();
        }
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_runs(mut self, runs: usize) -> Self {
        self.max_concurrent_runs = runs.max(1);
        self
    }

    pub fn with_concurrent_tags(mut self, enabled: bool) -> Self {
        self.concurrent_tags = enabled;
        self
    }
}

pub mod prelude {
    pub use super::InferenceConfig;
    pub use super::gate::AvailabilityGate;
    pub use super::models::create_backend;
    pub use super::orchestrator::{ArticleOrchestrator, GenerationState, GenerationStep};
    pub use ian_core::{Article, GeneratedArticle, GenerationRequest, Result, Error};
}

pub use gate::AvailabilityGate;
pub use models::create_backend;
pub use orchestrator::ArticleOrchestrator;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_host_validation() {
        let config = InferenceConfig::default().with_host("http://ollama:11434/").unwrap();
        assert_eq!(config.host, "http://ollama:11434");

        let err = InferenceConfig::default().with_host("not a url").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = InferenceConfig::default().with_host("ftp://ollama").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_keeps_default_model_for_blank_input() {
        let config = InferenceConfig::default().with_model("  ");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(InferenceConfig::default().with_max_concurrent_runs(0).max_concurrent_runs, 1);
    }
}
