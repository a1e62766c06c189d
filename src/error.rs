//! Error handling
//!
//! Per-concern error enums. None of these ever reach a caller of the
//! gateway: configuration errors are fatal at startup, and everything
//! else degrades the failing path while the request continues.

use thiserror::Error;

/// Startup configuration errors. Fail fast - a gateway with a broken
/// rule set must not serve traffic.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid routing condition '{condition}': {reason}")]
    InvalidCondition { condition: String, reason: String },

    #[error("routing rule '{0}' has an empty destination")]
    EmptyDestination(String),
}

/// Authorization service errors. The configured unavailability policy
/// (fail-open or fail-closed) decides the outcome.
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("authorization service not configured")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Embedding provider errors.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider not configured")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },
}

impl EmbeddingError {
    /// Transient failures worth a bounded retry. A dimension mismatch or
    /// a 4xx will not fix itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::Network(_) => true,
            EmbeddingError::Status(code) => *code >= 500,
            _ => false,
        }
    }
}

/// Vector index errors.
#[derive(Debug, Error)]
pub enum VectorError {
    #[error("vector index not configured")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("metadata too large: {0} bytes")]
    MetadataTooLarge(usize),
}
