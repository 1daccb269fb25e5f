//! # docflow engine
//!
//! Batched iteration over a remote document dataset.
//!
//! This crate provides:
//! - The [`Dataset`] collaborator seam, with in-memory and HTTP adapters
//! - [`Filter`] predicates, including worker partitioning by `_id`
//! - The [`Operator`] trait and diff-based [`apply`]
//! - The [`Engine`], which pages through a dataset, transforms each chunk
//!   and pushes back only the changed fields
//!
//! ## Semantics
//!
//! - One engine makes exactly one pass and is then discarded
//! - A pass ends when a fetch returns no documents
//! - Fetches retry transient failures, updates retry any failure; both give
//!   up after `max_retries` retries with a fixed sleep in between
//! - Empty diffs are never uploaded, so a second pass of a deterministic
//!   operator writes nothing
//!
//! ## Usage
//!
//! ```
//! use docflow_document::Document;
//! use docflow_engine::operators::FieldSetOperator;
//! use docflow_engine::{Engine, EngineConfig, MemoryDataset, RetryConfig};
//!
//! let dataset = MemoryDataset::with_documents(
//!     "reviews",
//!     (0..5).map(|i| Document::with_id(format!("doc-{i}"))),
//! );
//! let config = EngineConfig::new()
//!     .with_chunksize(2)
//!     .with_retry(RetryConfig::no_retry());
//!
//! let mut engine = Engine::new(&dataset, FieldSetOperator::new("seen", true), config)?;
//! let report = engine.call()?;
//! assert_eq!(report.chunks, 3);
//! assert_eq!(report.documents_changed, 5);
//! # Ok::<(), docflow_engine::EngineError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dataset;
mod engine;
mod error;
mod filter;
mod http;
mod memory;
mod operator;
pub mod operators;

pub use config::{ChunkSize, EngineConfig, RetryConfig, DEFAULT_CHUNKSIZE};
pub use dataset::{Chunk, Cursor, Dataset, FetchRequest, Schema, UpdateReport};
pub use engine::{
    ApplyReport, Chunks, Engine, EngineState, EngineStats, StableStrategy, Strategy,
};
pub use error::{
    DatasetError, DatasetResult, EngineError, EngineResult, OperatorError, OperatorResult,
};
pub use filter::{matches_all, modulo_key, Filter};
pub use http::{HttpClient, HttpDataset, HttpError};
pub use memory::MemoryDataset;
pub use operator::{apply, Operator};
