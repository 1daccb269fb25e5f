//! Error types for the engine.

use docflow_document::DocumentError;
use thiserror::Error;

/// Result type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Result type for operator calls.
pub type OperatorResult<T> = Result<T, OperatorError>;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by a dataset collaborator.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// The service could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The service answered with an error status.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP-like status code.
        status: u16,
        /// Error body returned by the service.
        message: String,
    },

    /// The response could not be understood.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A document in the request or response was malformed.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),
}

impl DatasetError {
    /// Returns true for connectivity failures worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, DatasetError::Connection(_) | DatasetError::Timeout)
    }
}

/// Errors raised by operator transforms and hooks.
#[derive(Error, Debug)]
pub enum OperatorError {
    /// A document lacked a field the operator reads.
    #[error("document {id:?} is missing field {field}")]
    MissingField {
        /// Path of the missing field.
        field: String,
        /// Identifier of the offending document.
        id: Option<String>,
    },

    /// A field held a value of the wrong shape.
    #[error("invalid value at {field}: {message}")]
    InvalidValue {
        /// Path of the field.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// The transform changed the number of documents in the batch.
    #[error("transform returned {returned} documents for a batch of {expected}")]
    BatchSizeMismatch {
        /// Documents handed to the transform.
        expected: usize,
        /// Documents the transform returned.
        returned: usize,
    },

    /// A batch helper rejected the write.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// A hook failed talking to the dataset.
    #[error("dataset error in hook: {0}")]
    Dataset(#[from] DatasetError),

    /// Any other failure raised by user code.
    #[error("{0}")]
    Custom(String),
}

impl OperatorError {
    /// Creates a custom operator error.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// Errors that end an engine run.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine configuration does not fit the dataset.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A fetch or update kept failing after every retry.
    #[error("max retries exceeded for {operation} after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded {
        /// Operation that failed (`fetch` or `update`).
        operation: &'static str,
        /// Total attempts made, including the first.
        attempts: u32,
        /// Message of the final failure.
        last_error: String,
    },

    /// A non-transient dataset failure.
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// The operator transform failed.
    #[error("transform failed: {0}")]
    Transform(#[source] OperatorError),

    /// An operator hook failed.
    #[error("{stage} hook failed: {source}")]
    Hook {
        /// `pre` or `post`.
        stage: &'static str,
        /// Underlying failure.
        #[source]
        source: OperatorError,
    },
}

impl EngineError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns true if the error came from exhausting retries.
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, EngineError::MaxRetriesExceeded { .. })
    }
}
