use thiserror::Error;

/// Boxed error raised by an external store client.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Conditional check failed: {0}")]
    ConditionalCheckFailed(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Malformed entity: {0}")]
    MalformedEntity(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure reported by the underlying store, passed through untouched.
    #[error(transparent)]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wraps an error raised by an external store client.
    pub fn store(source: impl Into<StoreError>) -> Self {
        Error::Store(source.into())
    }

    /// Returns a stable error code for this error variant.
    /// These codes are stable and can be used by clients for error classification.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidExpression(_) => "INVALID_EXPRESSION",
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::ConditionalCheckFailed(_) => "CONDITIONAL_CHECK_FAILED",
            Error::TableNotFound(_) => "TABLE_NOT_FOUND",
            Error::MalformedEntity(_) => "MALFORMED_ENTITY",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Store(_) => "STORE_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if this error is potentially retryable.
    ///
    /// Store failures are left to the store client's own retry policy, so only
    /// the caller can decide whether they are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Store(_) => true,

            Error::InvalidExpression(_) => false,
            Error::InvalidArgument(_) => false,
            Error::ConditionalCheckFailed(_) => false,
            Error::TableNotFound(_) => false,
            Error::MalformedEntity(_) => false,
            Error::Serialization(_) => false,
            Error::Internal(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
