use std::sync::Arc;
use ian_core::{Error, GenerationBackend, Result};
use crate::InferenceConfig;

pub mod ollama;
pub mod scripted;

pub use ollama::OllamaBackend;
pub use scripted::{Reply, ScriptedBackend};

/// Builds the backend named on the command line.
///
/// `ollama` talks to a real server; `scripted` answers every prompt with
/// canned newsroom text and never touches the network.
pub fn create_backend(name: &str, config: &InferenceConfig) -> Result<Arc<dyn GenerationBackend>> {
    match name {
        "ollama" => Ok(Arc::new(OllamaBackend::new(config)?)),
        "scripted" | "dummy" => Ok(Arc::new(ScriptedBackend::newsroom())),
        other => Err(Error::Config(format!(
            "unknown generation backend '{}' (expected ollama or scripted)",
            other
        ))),
    }
}
