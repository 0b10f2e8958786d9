use std::time::Duration;
use thiserror::Error;
use crate::services::{CacheError, ScoringError, StoreError};

/// Errors surfaced by the match and conversation core
///
/// Duplicate-creation races never appear here: they are absorbed as
/// `CreateOutcome::Existing` inside the store.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Caller is not authenticated, or not a participant of the resource
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks required prior state, e.g. has no profile yet
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl CoreError {
    /// Whether the caller may retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Timeout(_) | CoreError::Unavailable(_))
    }

    /// Short machine-readable kind, used as the `error` field of responses
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Unauthorized(_) => "unauthorized",
            CoreError::PreconditionFailed(_) => "precondition_failed",
            CoreError::InvalidArgument(_) => "invalid_argument",
            CoreError::NotFound(_) => "not_found",
            CoreError::Timeout(_) => "timeout",
            CoreError::Unavailable(_) => "unavailable",
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => CoreError::NotFound(what),
            StoreError::InvalidProfile(why) => CoreError::InvalidArgument(why),
            other => {
                tracing::error!("Store error: {}", other);
                CoreError::Unavailable(other.to_string())
            }
        }
    }
}

impl From<CacheError> for CoreError {
    fn from(e: CacheError) -> Self {
        tracing::error!("Cache error: {}", e);
        CoreError::Unavailable(e.to_string())
    }
}

impl From<ScoringError> for CoreError {
    fn from(e: ScoringError) -> Self {
        match e {
            ScoringError::Timeout(after) => CoreError::Timeout(after),
            other => {
                tracing::error!("Scoring engine error: {}", other);
                CoreError::Unavailable(other.to_string())
            }
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
