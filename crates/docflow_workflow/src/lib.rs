//! # docflow workflow
//!
//! Lifecycle around a docflow engine run.
//!
//! This crate provides:
//! - [`WorkflowConfig`], decoded from a base64 workflow token
//! - [`JobContext`], the identity status updates are filed under
//! - [`StatusReporter`] implementations, including one posting to the
//!   platform over HTTP
//! - [`Workflow`], which reports `inprogress`, runs the engine once and
//!   reports `complete` or `failed`
//!
//! The engine itself never reports status. A reporter that fails is logged
//! and does not change the outcome of the run.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod error;
mod status;
mod token;
mod workflow;

pub use context::JobContext;
pub use error::{StatusError, StatusResult, TokenError, TokenResult, WorkflowError, WorkflowResult};
pub use status::{HttpStatusReporter, NoopStatusReporter, StatusReporter, WorkflowStatus};
pub use token::{decode_token, WorkflowConfig};
pub use workflow::Workflow;
