use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Generation backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Generation backend error: {0}")]
    BackendError(String),

    #[error("Could not allocate a unique slug for '{slug}' after {attempts} attempts")]
    SlugExhausted { slug: String, attempts: usize },

    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("Slug already taken: {0}")]
    UniquenessViolation(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

/// Discriminant of [`Error`], cheap to copy into state machines and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    BackendUnavailable,
    BackendError,
    SlugExhausted,
    PersistenceFailed,
    UniquenessViolation,
    CategoryNotFound,
    Config,
    Serialization,
    External,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            Error::BackendError(_) => ErrorKind::BackendError,
            Error::SlugExhausted { .. } => ErrorKind::SlugExhausted,
            Error::PersistenceFailed(_) => ErrorKind::PersistenceFailed,
            Error::UniquenessViolation(_) => ErrorKind::UniquenessViolation,
            Error::CategoryNotFound(_) => ErrorKind::CategoryNotFound,
            Error::Config(_) => ErrorKind::Config,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::External(_) => ErrorKind::External,
        }
    }

    /// Only transport-level backend failures are worth re-running a whole
    /// generation for.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::BackendUnavailable(_))
    }

    /// Prefixes the message with where the failure happened, keeping the kind.
    pub fn context(self, step: impl std::fmt::Display) -> Self {
        match self {
            Error::InvalidRequest(msg) => Error::InvalidRequest(format!("{}: {}", step, msg)),
            Error::BackendUnavailable(msg) => Error::BackendUnavailable(format!("{}: {}", step, msg)),
            Error::BackendError(msg) => Error::BackendError(format!("{}: {}", step, msg)),
            Error::PersistenceFailed(msg) => Error::PersistenceFailed(format!("{}: {}", step, msg)),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_kind() {
        let err = Error::BackendUnavailable("connection refused".to_string()).context("content generation");
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
        assert_eq!(
            err.to_string(),
            "Generation backend unavailable: content generation: connection refused"
        );

        let err = Error::SlugExhausted { slug: "a".to_string(), attempts: 5 }.context("slug allocation");
        assert_eq!(err.kind(), ErrorKind::SlugExhausted);
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(Error::BackendUnavailable("timeout".to_string()).is_retryable());
        assert!(!Error::BackendError("unknown model".to_string()).is_retryable());
        assert!(!Error::PersistenceFailed("duplicate".to_string()).is_retryable());
        assert!(!Error::InvalidRequest("topic".to_string()).is_retryable());
    }
}
