//! # docflow testkit
//!
//! Test utilities for docflow.
//!
//! This crate provides:
//! - Document fixtures and file-backed datasets
//! - Test doubles: a dataset that fails on demand and a status reporter
//!   that records what it is told
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```
//! use docflow_engine::{Dataset, FetchRequest, MemoryDataset};
//! use docflow_testkit::prelude::*;
//!
//! let dataset = FlakyDataset::new(MemoryDataset::with_documents("t", static_documents(4)))
//!     .fail_fetches(1);
//! assert!(dataset.get_documents(&FetchRequest::new(2)).is_err());
//! assert_eq!(dataset.get_documents(&FetchRequest::new(2)).unwrap().documents.len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod doubles;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::doubles::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use doubles::*;
pub use fixtures::*;
pub use generators::*;
