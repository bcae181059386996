use thiserror::Error;

/// Service-level error taxonomy. Validation and not-found are surfaced to
/// the caller with their message; provider and persistence failures are
/// logged in full and translated to a generic "try again" response at the
/// HTTP boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("completion provider failed: {0}")]
    Provider(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
