//! Status reporting around one engine run.

use crate::context::JobContext;
use crate::error::WorkflowResult;
use crate::status::{StatusReporter, WorkflowStatus};
use docflow_engine::{ApplyReport, Dataset, Engine, Operator, StableStrategy, Strategy};
use serde_json::json;
use tracing::{error, info, warn};

/// Wraps an engine with status reporting.
///
/// `run` consumes the workflow, so the engine is invoked exactly once.
pub struct Workflow<D: Dataset, O: Operator, R: StatusReporter> {
    engine: Engine<D, O>,
    reporter: R,
    context: JobContext,
}

impl<D: Dataset, O: Operator, R: StatusReporter> Workflow<D, O, R> {
    /// Creates a workflow.
    pub fn new(engine: Engine<D, O>, reporter: R, context: JobContext) -> Self {
        Self {
            engine,
            reporter,
            context,
        }
    }

    /// The job context.
    pub fn context(&self) -> &JobContext {
        &self.context
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &Engine<D, O> {
        &self.engine
    }

    /// Reports `inprogress`, runs the engine, then reports `complete` or
    /// `failed`. On failure the engine error is returned after reporting.
    pub fn run<S: Strategy<D, O>>(mut self, strategy: &mut S) -> WorkflowResult<ApplyReport> {
        info!(job_id = %self.context.job_id, "workflow started");
        self.report(WorkflowStatus::InProgress, None);

        match self.engine.run(strategy) {
            Ok(report) => {
                let metadata = json!({
                    "chunks": report.chunks,
                    "documents_fetched": report.documents_fetched,
                    "documents_changed": report.documents_changed,
                    "failed_documents": report.failed_documents.len(),
                    "success_ratio": report.success_ratio(),
                });
                self.report(WorkflowStatus::Complete, Some(&metadata));
                info!(job_id = %self.context.job_id, "workflow complete");
                Ok(report)
            }
            Err(e) => {
                error!(job_id = %self.context.job_id, error = %e, "workflow failed");
                self.report(WorkflowStatus::Failed, Some(&json!({"error": e.to_string()})));
                Err(e.into())
            }
        }
    }

    /// Runs with the default [`StableStrategy`].
    pub fn call(self) -> WorkflowResult<ApplyReport> {
        self.run(&mut StableStrategy)
    }

    fn report(&self, status: WorkflowStatus, metadata: Option<&serde_json::Value>) {
        if let Err(e) = self.reporter.set_status(&self.context, status, metadata) {
            warn!(job_id = %self.context.job_id, %status, error = %e, "failed to report status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::NoopStatusReporter;
    use docflow_document::Document;
    use docflow_engine::operators::FieldSetOperator;
    use docflow_engine::{EngineConfig, MemoryDataset, RetryConfig};

    #[test]
    fn runs_engine_once() {
        let dataset =
            MemoryDataset::with_documents("wf", (0..3).map(|i| Document::with_id(format!("d{i}"))));
        let engine = Engine::new(
            &dataset,
            FieldSetOperator::new("done", true),
            EngineConfig::new().with_retry(RetryConfig::no_retry()),
        )
        .unwrap();
        let workflow = Workflow::new(engine, NoopStatusReporter, JobContext::with_job_id("j"));
        assert_eq!(workflow.context().job_id, "j");
        assert_eq!(workflow.engine().size(), 3);

        let report = workflow.call().unwrap();
        assert_eq!(report.documents_changed, 3);
        assert_eq!(dataset.update_calls(), 1);
    }
}
