//! Error types for the document crate.

use thiserror::Error;

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors that can occur while building or converting documents.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// A document must be built from a map value.
    #[error("expected a map at the document root, found {found}")]
    NotAMap {
        /// Kind of value that was found instead.
        found: &'static str,
    },

    /// A batch write got a different number of values than it has slots.
    #[error("expected {expected} values, got {found}")]
    LengthMismatch {
        /// Documents or chunks to write.
        expected: usize,
        /// Values supplied.
        found: usize,
    },

    /// A tag list held something other than an array.
    #[error("expected an array at {path}, found {found}")]
    NotAnArray {
        /// Path of the field.
        path: String,
        /// Kind of value that was found instead.
        found: &'static str,
    },

    /// A tag path needs a list and a key, as in `tags.label`.
    #[error("tag path {path:?} must have the form <list>.<key>")]
    InvalidTagPath {
        /// The rejected path.
        path: String,
    },

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DocumentError::NotAMap { found: "array" };
        assert_eq!(
            err.to_string(),
            "expected a map at the document root, found array"
        );

        let err = DocumentError::LengthMismatch {
            expected: 3,
            found: 2,
        };
        assert_eq!(err.to_string(), "expected 3 values, got 2");
    }
}
