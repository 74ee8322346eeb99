//! Scrivener error types

/// Scrivener error types
#[derive(Debug, thiserror::Error)]
pub enum ScrivenerError {
    // Rejections before anything is logged
    #[error("you do not have permission to edit this content")]
    PermissionDenied,

    #[error("subject not found: {0}")]
    SubjectNotFound(u64),

    #[error("content type '{0}' is not enabled for generation")]
    SubjectTypeNotAllowed(String),

    // Request errors
    #[error("rate limit exceeded: at most {limit} requests per hour")]
    RateLimitExceeded { limit: u32 },

    #[error("subject has no content to generate from")]
    EmptySubjectContent,

    #[error("API key is not configured")]
    MissingCredential,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Provider/network errors
    #[error("HTTP error: {0}")]
    UpstreamTransport(String),

    #[error("API error ({status}): {message}")]
    UpstreamApi { status: u16, message: String },

    #[error("malformed API response: {0}")]
    MalformedUpstreamResponse(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Host persistence errors
    #[error("storage error: {0}")]
    Storage(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Scrivener operations
pub type Result<T> = std::result::Result<T, ScrivenerError>;
