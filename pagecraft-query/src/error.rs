//! Error types for query resolution and retrieval.

use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while turning a data source into a wire query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A mixed source has no inputs with positive weight.
    #[error("Mixed source has no weighted inputs")]
    EmptyBlend,

    /// Retrieval failed.
    #[error(transparent)]
    Retrieve(#[from] RetrieveError),
}

/// Errors raised by a [`crate::Retriever`].
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// The configured endpoint is not a valid URL.
    #[error("invalid retrieval endpoint: {0}")]
    InvalidUrl(String),

    /// HTTP layer failed (connection, timeout, etc.).
    #[error("retrieval request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The backend payload did not parse.
    #[error("failed to parse backend payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other transport failure.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl RetrieveError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_decode() && !e.is_builder(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Transport(_) => true,
            Self::InvalidUrl(_) | Self::Json(_) => false,
        }
    }
}
