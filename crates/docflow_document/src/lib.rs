//! # docflow document
//!
//! Nested document values and field-level diffing for docflow.
//!
//! This crate provides:
//! - [`Value`], an explicit recursive value type with insertion-ordered maps
//! - [`Document`], a map of fields addressed by dotted paths
//! - [`Documents`], column-wise reads and writes over a batch
//! - [`diff`], which reduces a transformed document to the fields worth
//!   uploading
//!
//! ## Usage
//!
//! ```
//! use docflow_document::{diff, is_noop, DiffOptions, Document};
//!
//! let mut old = Document::with_id("doc-1");
//! old.set("text", "hello");
//!
//! let mut new = old.clone();
//! new.set("_sentiment_.text.default.label", "positive");
//!
//! let changes = diff(&old, &new, &DiffOptions::default());
//! assert!(!is_noop(&changes));
//! assert_eq!(changes.keys(), vec!["_id", "_sentiment_.text.default.label"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod diff;
mod document;
mod documents;
mod error;
mod value;

pub use diff::{
    diff, euclidean_distance, is_noop, DiffOptions, DEFAULT_VECTOR_TOLERANCE, VECTOR_MARKER,
};
pub use document::{Document, ID_FIELD, INSERT_DATE_FIELD, PATH_SEPARATOR};
pub use documents::Documents;
pub use error::{DocumentError, DocumentResult};
pub use value::Value;
