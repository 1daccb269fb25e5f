//! Identity of a running job.

use serde::{Deserialize, Serialize};

/// Identifies one execution of a workflow for status reporting.
///
/// Passed explicitly to whoever needs it; nothing is read from or written
/// to the process environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobContext {
    /// Job identifier. A random UUID unless the token supplies one.
    pub job_id: String,
    /// Workflow definition this job runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    /// Dataset being processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    /// Worker number, zero when not sharded.
    #[serde(default)]
    pub worker_number: u32,
}

impl JobContext {
    /// Creates a context with a fresh job id.
    pub fn new() -> Self {
        Self::with_job_id(uuid::Uuid::new_v4().to_string())
    }

    /// Creates a context with the given job id.
    pub fn with_job_id(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            workflow_id: None,
            dataset_id: None,
            worker_number: 0,
        }
    }

    /// Sets the workflow id.
    #[must_use]
    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    /// Sets the dataset id.
    #[must_use]
    pub fn with_dataset_id(mut self, dataset_id: impl Into<String>) -> Self {
        self.dataset_id = Some(dataset_id.into());
        self
    }

    /// Sets the worker number.
    #[must_use]
    pub fn with_worker_number(mut self, worker_number: u32) -> Self {
        self.worker_number = worker_number;
        self
    }
}

impl Default for JobContext {
    fn default() -> Self {
        Self::new()
    }
}
