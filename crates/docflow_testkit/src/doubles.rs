//! Test doubles for the dataset and status reporter seams.

use docflow_document::Document;
use docflow_engine::{
    Chunk, Dataset, DatasetError, DatasetResult, FetchRequest, Filter, Schema, UpdateReport,
};
use docflow_workflow::{JobContext, StatusError, StatusReporter, StatusResult, WorkflowStatus};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Wraps a dataset and fails a set number of fetches or updates.
///
/// Failures come first: with `fail_fetches(2)` the first two fetches fail
/// and every later one reaches the inner dataset.
#[derive(Debug)]
pub struct FlakyDataset<D: Dataset> {
    inner: D,
    fetch_failures: AtomicUsize,
    update_failures: AtomicUsize,
    fetch_error: fn() -> DatasetError,
    update_error: fn() -> DatasetError,
    fetch_attempts: AtomicUsize,
    update_attempts: AtomicUsize,
    fetch_requests: Mutex<Vec<FetchRequest>>,
}

fn connection_refused() -> DatasetError {
    DatasetError::Connection("connection refused".into())
}

impl<D: Dataset> FlakyDataset<D> {
    /// Wraps a dataset that never fails.
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            fetch_failures: AtomicUsize::new(0),
            update_failures: AtomicUsize::new(0),
            fetch_error: connection_refused,
            update_error: connection_refused,
            fetch_attempts: AtomicUsize::new(0),
            update_attempts: AtomicUsize::new(0),
            fetch_requests: Mutex::new(Vec::new()),
        }
    }

    /// Fails the next `n` fetches with a connection error.
    #[must_use]
    pub fn fail_fetches(self, n: usize) -> Self {
        self.fetch_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Fails the next `n` fetches with the given error.
    #[must_use]
    pub fn fail_fetches_with(mut self, n: usize, error: fn() -> DatasetError) -> Self {
        self.fetch_error = error;
        self.fail_fetches(n)
    }

    /// Fails the next `n` updates with a connection error.
    #[must_use]
    pub fn fail_updates(self, n: usize) -> Self {
        self.update_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Fails the next `n` updates with the given error.
    #[must_use]
    pub fn fail_updates_with(mut self, n: usize, error: fn() -> DatasetError) -> Self {
        self.update_error = error;
        self.fail_updates(n)
    }

    /// The wrapped dataset.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Fetch calls received, failed ones included.
    pub fn fetch_attempts(&self) -> usize {
        self.fetch_attempts.load(Ordering::SeqCst)
    }

    /// Update calls received, failed ones included.
    pub fn update_attempts(&self) -> usize {
        self.update_attempts.load(Ordering::SeqCst)
    }

    /// Every fetch request received, in order.
    pub fn fetch_requests(&self) -> Vec<FetchRequest> {
        self.fetch_requests.lock().clone()
    }
}

fn take_failure(remaining: &AtomicUsize) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl<D: Dataset> Dataset for FlakyDataset<D> {
    fn dataset_id(&self) -> &str {
        self.inner.dataset_id()
    }

    fn schema(&self) -> DatasetResult<Schema> {
        self.inner.schema()
    }

    fn count(&self, filters: &[Filter]) -> DatasetResult<usize> {
        self.inner.count(filters)
    }

    fn get_documents(&self, request: &FetchRequest) -> DatasetResult<Chunk> {
        self.fetch_attempts.fetch_add(1, Ordering::SeqCst);
        self.fetch_requests.lock().push(request.clone());
        if take_failure(&self.fetch_failures) {
            return Err((self.fetch_error)());
        }
        self.inner.get_documents(request)
    }

    fn update_documents(&self, documents: &[Document]) -> DatasetResult<UpdateReport> {
        self.update_attempts.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.update_failures) {
            return Err((self.update_error)());
        }
        self.inner.update_documents(documents)
    }

    fn insert_documents(&self, documents: &[Document]) -> DatasetResult<UpdateReport> {
        self.inner.insert_documents(documents)
    }

    fn insert_centroids(
        &self,
        vector_field: &str,
        alias: &str,
        centroids: &[Document],
    ) -> DatasetResult<()> {
        self.inner.insert_centroids(vector_field, alias, centroids)
    }
}

/// One status update seen by a [`RecordingStatusReporter`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRecord {
    /// Job the update was filed under.
    pub job_id: String,
    /// Reported status.
    pub status: WorkflowStatus,
    /// Attached metadata.
    pub metadata: Option<serde_json::Value>,
}

/// Records every status update.
#[derive(Debug, Default)]
pub struct RecordingStatusReporter {
    records: Mutex<Vec<StatusRecord>>,
    fail: bool,
}

impl RecordingStatusReporter {
    /// Creates a reporter that accepts every update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reporter that records every update and then fails it.
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// All records, in order.
    pub fn records(&self) -> Vec<StatusRecord> {
        self.records.lock().clone()
    }

    /// Reported statuses, in order.
    pub fn statuses(&self) -> Vec<WorkflowStatus> {
        self.records.lock().iter().map(|r| r.status).collect()
    }
}

impl StatusReporter for RecordingStatusReporter {
    fn set_status(
        &self,
        context: &JobContext,
        status: WorkflowStatus,
        metadata: Option<&serde_json::Value>,
    ) -> StatusResult<()> {
        self.records.lock().push(StatusRecord {
            job_id: context.job_id.clone(),
            status,
            metadata: metadata.cloned(),
        });
        if self.fail {
            return Err(StatusError::Http(docflow_engine::HttpError::Status {
                status: 503,
                body: "status service unavailable".into(),
            }));
        }
        Ok(())
    }
}
