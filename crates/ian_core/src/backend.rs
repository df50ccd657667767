use async_trait::async_trait;
use std::fmt;
use crate::types::ModelInfo;
use crate::Result;

#[async_trait]
pub trait GenerationBackend: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Run one non-streaming completion and return the raw model text.
    async fn complete(&self, model: &str, prompt: &str) -> Result<String>;

    /// Liveness check. Never fails; any error means `false`.
    async fn probe(&self) -> bool;

    /// Models installed on the backend
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}
