//! Error types for workflows.

use docflow_engine::{EngineError, HttpError};
use thiserror::Error;

/// Result type for token decoding.
pub type TokenResult<T> = Result<T, TokenError>;

/// Result type for status reporting.
pub type StatusResult<T> = Result<T, StatusError>;

/// Result type for workflow runs.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors decoding a workflow token.
#[derive(Error, Debug)]
pub enum TokenError {
    /// The token is not valid base64.
    #[error("invalid base64 in token: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded token is not a JSON object of the expected shape.
    #[error("invalid token payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A required key is absent.
    #[error("token is missing required key {0}")]
    MissingKey(&'static str),
}

/// Errors sending a status update.
#[derive(Error, Debug)]
pub enum StatusError {
    /// The status endpoint could not be reached or refused the update.
    #[error("status request failed: {0}")]
    Http(#[from] HttpError),

    /// The status body could not be encoded.
    #[error("failed to encode status: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors ending a workflow.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// The engine failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The token could not be decoded.
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl WorkflowError {
    /// The engine error, if that is what failed.
    pub fn as_engine_error(&self) -> Option<&EngineError> {
        match self {
            WorkflowError::Engine(e) => Some(e),
            WorkflowError::Token(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_are_transparent() {
        let err = WorkflowError::from(EngineError::validation("chunksize must be positive"));
        assert_eq!(err.to_string(), "validation failed: chunksize must be positive");
        assert!(err.as_engine_error().is_some());

        let err = WorkflowError::from(TokenError::MissingKey("dataset_id"));
        assert_eq!(err.to_string(), "token is missing required key dataset_id");
        assert!(err.as_engine_error().is_none());
    }
}
