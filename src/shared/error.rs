//! Application Error Types
//!
//! Centralized error type shared by the stores, the facade and the services.

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Stored data violates an invariant the write path should have enforced.
    #[error("Data integrity violation: {0}")]
    Integrity(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl AppError {
    /// Whether the error comes from inconsistent stored data rather than I/O.
    pub fn is_integrity(&self) -> bool {
        matches!(self, AppError::Integrity(_))
    }
}
