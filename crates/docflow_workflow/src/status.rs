//! Job status reporting.

use crate::context::JobContext;
use crate::error::StatusResult;
use docflow_engine::HttpClient;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    /// The engine is running.
    InProgress,
    /// The engine finished without error.
    Complete,
    /// The engine failed.
    Failed,
}

impl WorkflowStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::InProgress => "inprogress",
            WorkflowStatus::Complete => "complete",
            WorkflowStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives status transitions of a job.
pub trait StatusReporter: Send + Sync {
    /// Records a status, with optional metadata such as an error message.
    fn set_status(
        &self,
        context: &JobContext,
        status: WorkflowStatus,
        metadata: Option<&serde_json::Value>,
    ) -> StatusResult<()>;
}

impl<R: StatusReporter + ?Sized> StatusReporter for &R {
    fn set_status(
        &self,
        context: &JobContext,
        status: WorkflowStatus,
        metadata: Option<&serde_json::Value>,
    ) -> StatusResult<()> {
        (**self).set_status(context, status, metadata)
    }
}

impl<R: StatusReporter + ?Sized> StatusReporter for Box<R> {
    fn set_status(
        &self,
        context: &JobContext,
        status: WorkflowStatus,
        metadata: Option<&serde_json::Value>,
    ) -> StatusResult<()> {
        (**self).set_status(context, status, metadata)
    }
}

/// Discards every status.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStatusReporter;

impl StatusReporter for NoopStatusReporter {
    fn set_status(
        &self,
        _context: &JobContext,
        _status: WorkflowStatus,
        _metadata: Option<&serde_json::Value>,
    ) -> StatusResult<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusUpdate<'a> {
    job_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    workflow_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dataset_id: Option<&'a str>,
    worker_number: u32,
    status: WorkflowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a serde_json::Value>,
}

/// Posts status updates to the platform's `/workflows/status` endpoint.
pub struct HttpStatusReporter<C: HttpClient> {
    base_url: String,
    authorization: String,
    client: C,
}

impl<C: HttpClient> HttpStatusReporter<C> {
    /// Creates a reporter.
    pub fn new(base_url: impl Into<String>, authorization: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            authorization: authorization.into(),
            client,
        }
    }

    fn url(&self) -> String {
        format!("{}/workflows/status", self.base_url.trim_end_matches('/'))
    }
}

impl<C: HttpClient> StatusReporter for HttpStatusReporter<C> {
    fn set_status(
        &self,
        context: &JobContext,
        status: WorkflowStatus,
        metadata: Option<&serde_json::Value>,
    ) -> StatusResult<()> {
        let body = serde_json::to_vec(&StatusUpdate {
            job_id: &context.job_id,
            workflow_id: context.workflow_id.as_deref(),
            dataset_id: context.dataset_id.as_deref(),
            worker_number: context.worker_number,
            status,
            metadata,
        })?;
        self.client.post(&self.url(), &self.authorization, body)?;
        Ok(())
    }
}

impl<C: HttpClient> fmt::Debug for HttpStatusReporter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpStatusReporter")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
