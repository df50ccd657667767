use std::fmt;
use std::sync::Arc;
use ian_core::{Error, GenerationBackend, Result};

/// Fail-fast liveness check before a multi-step generation.
///
/// Advisory only: the backend can still go away between this check and the
/// first completion, which the orchestrator reports as usual.
#[derive(Clone)]
pub struct AvailabilityGate {
    backend: Arc<dyn GenerationBackend>,
}

impl fmt::Debug for AvailabilityGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvailabilityGate")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl AvailabilityGate {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    pub async fn ensure_ready(&self) -> Result<()> {
        if self.backend.probe().await {
            Ok(())
        } else {
            tracing::warn!("🔌 Generation backend '{}' is not responding", self.backend.name());
            Err(Error::BackendUnavailable(format!(
                "{} is not responding; make sure it is running",
                self.backend.name()
            )))
        }
    }
}
