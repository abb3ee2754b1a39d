//! Error types for greenbase-core

/// Result type alias for greenbase operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for greenbase operations
///
/// `Config` is a configuration failure; `Http`, `Workflow` and `RateLimitExceeded`
/// are provider failures. "No matching run" is never an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Required input missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failure talking to the provider
    #[error("HTTP error: {0}")]
    Http(String),

    /// Provider returned an error status or a malformed body
    #[error("Workflow error: {0}")]
    Workflow(String),

    /// API rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Runtime error (Tokio runtime construction)
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // without_url: query strings never carry the token, but keep the URL out of messages
        Error::Http(err.without_url().to_string())
    }
}

/// Fieldless error category for zero-cost pattern matching.
///
/// Single byte representation (`#[repr(u8)]`), `Copy`, no allocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorKind {
    /// Configuration error
    Config,
    /// HTTP transport error
    Http,
    /// Workflow API error
    Workflow,
    /// API rate limit exceeded
    RateLimitExceeded,
    /// I/O operation error
    Io,
    /// Runtime error
    Runtime,
}

impl Error {
    /// Get the error kind, zero allocation.
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Config,
            Error::Http(_) => ErrorKind::Http,
            Error::Workflow(_) => ErrorKind::Workflow,
            Error::RateLimitExceeded(_) => ErrorKind::RateLimitExceeded,
            Error::Io(_) => ErrorKind::Io,
            Error::Runtime(_) => ErrorKind::Runtime,
        }
    }

    /// Borrow the error message without allocating.
    #[inline]
    pub fn message(&self) -> &str {
        match self {
            Error::Config(msg)
            | Error::Http(msg)
            | Error::Workflow(msg)
            | Error::RateLimitExceeded(msg)
            | Error::Runtime(msg) => msg,
            Error::Io(_) => "I/O error",
        }
    }

    /// Required input was missing or malformed.
    #[inline]
    pub const fn is_config(&self) -> bool {
        matches!(self.kind(), ErrorKind::Config)
    }

    /// The run history provider call failed.
    #[inline]
    pub const fn is_provider(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Http | ErrorKind::Workflow | ErrorKind::RateLimitExceeded
        )
    }

    /// Configuration error naming the offending input field.
    pub fn missing_input(field: &str) -> Self {
        Error::Config(format!("Input required and not supplied: {}", field))
    }
}
