//! Batched iteration engine.
//!
//! One [`Engine`] drives a single pass over a dataset: it pages through the
//! filtered documents with an `_id` cursor, hands each chunk to the operator
//! and pushes the resulting field diffs back. Fetches and updates are
//! retried a bounded number of times with a fixed sleep in between.

use crate::config::{ChunkSize, EngineConfig, RetryConfig};
use crate::dataset::{Chunk, Cursor, Dataset, FetchRequest, UpdateReport};
use crate::error::{DatasetError, DatasetResult, EngineError, EngineResult};
use crate::filter::Filter;
use crate::operator::{self, Operator};
use docflow_document::Document;
use tracing::{debug, info, warn};

/// Where the engine is in its pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Waiting to fetch the next chunk.
    Fetching,
    /// A chunk has been handed out and is being processed.
    Processing,
    /// The dataset is exhausted or a fatal error occurred.
    Done,
}

impl EngineState {
    /// Returns true once no more chunks will be produced.
    pub fn is_done(&self) -> bool {
        matches!(self, EngineState::Done)
    }
}

/// Counters collected over one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Non-empty chunks fetched.
    pub chunks_fetched: u64,
    /// Documents fetched across all chunks.
    pub documents_fetched: u64,
    /// Documents the service reported as updated.
    pub documents_updated: u64,
    /// Update requests that succeeded.
    pub updates_sent: u64,
    /// Failed attempts that were retried.
    pub retries: u64,
}

/// Outcome of applying an operator over the whole dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Chunks processed.
    pub chunks: usize,
    /// Documents fetched.
    pub documents_fetched: usize,
    /// Diffs uploaded.
    pub documents_changed: usize,
    /// Ids the service failed to update.
    pub failed_documents: Vec<String>,
}

impl ApplyReport {
    /// Fraction of uploaded diffs the service accepted. 1.0 when nothing
    /// was uploaded.
    pub fn success_ratio(&self) -> f64 {
        if self.documents_changed == 0 {
            return 1.0;
        }
        let failed = self.failed_documents.len().min(self.documents_changed);
        (self.documents_changed - failed) as f64 / self.documents_changed as f64
    }
}

/// How an engine ties fetching, transforming and updating together.
pub trait Strategy<D: Dataset, O: Operator> {
    /// Processes every chunk the engine yields.
    fn apply(&mut self, engine: &mut Engine<D, O>) -> EngineResult<ApplyReport>;
}

/// Pull a chunk, diff-transform it, push the diffs, repeat.
#[derive(Debug, Clone, Copy, Default)]
pub struct StableStrategy;

impl<D: Dataset, O: Operator> Strategy<D, O> for StableStrategy {
    fn apply(&mut self, engine: &mut Engine<D, O>) -> EngineResult<ApplyReport> {
        let mut report = ApplyReport::default();
        while let Some(chunk) = engine.next_chunk() {
            let chunk = chunk?;
            report.chunks += 1;
            report.documents_fetched += chunk.len();

            let updates = engine.transform_chunk(&chunk)?;
            report.documents_changed += updates.len();
            if let Some(ack) = engine.update_chunk(&updates)? {
                report.failed_documents.extend(ack.failed_documents);
            }
        }
        Ok(report)
    }
}

/// Drives one pass of an operator over a dataset.
pub struct Engine<D: Dataset, O: Operator> {
    dataset: D,
    operator: O,
    config: EngineConfig,
    filters: Vec<Filter>,
    chunksize: usize,
    size: usize,
    num_chunks: usize,
    after_id: Option<Cursor>,
    chunk_index: usize,
    retry_count: u32,
    state: EngineState,
    stats: EngineStats,
}

impl<D: Dataset, O: Operator> Engine<D, O> {
    /// Validates the configuration against the dataset and sizes the pass.
    ///
    /// No documents are fetched here; the only calls made are `schema`
    /// (when fields are selected) and `count`.
    pub fn new(dataset: D, operator: O, config: EngineConfig) -> EngineResult<Self> {
        if config.chunksize == ChunkSize::Fixed(0) {
            return Err(EngineError::validation("chunksize must be positive"));
        }
        if config.total_workers > 0 && config.worker_number > config.total_workers {
            return Err(EngineError::validation(format!(
                "worker_number {} exceeds total_workers {}",
                config.worker_number, config.total_workers
            )));
        }
        if let Some(fields) = config.select_fields.as_deref().filter(|f| !f.is_empty()) {
            let schema = dataset.schema()?;
            let missing: Vec<&str> = fields
                .iter()
                .map(String::as_str)
                .filter(|field| !schema.contains(field))
                .collect();
            if !missing.is_empty() {
                return Err(EngineError::validation(format!(
                    "fields not in dataset schema: {}",
                    missing.join(", ")
                )));
            }
        }

        let mut filters = config.filters.clone();
        filters.extend(Filter::worker_partition(
            config.worker_number,
            config.total_workers,
        ));

        let size = dataset.count(&filters)?;
        let (chunksize, num_chunks) = match config.chunksize {
            ChunkSize::Fixed(n) => (n, size.div_ceil(n)),
            ChunkSize::WholeDataset => (size.max(1), 1),
        };

        debug!(
            dataset = dataset.dataset_id(),
            operator = operator.name(),
            size,
            chunksize,
            num_chunks,
            "engine configured"
        );

        Ok(Self {
            after_id: config.after_id.clone(),
            dataset,
            operator,
            config,
            filters,
            chunksize,
            size,
            num_chunks,
            chunk_index: 0,
            retry_count: 0,
            state: EngineState::Fetching,
            stats: EngineStats::default(),
        })
    }

    /// Documents matching the filters when the engine was built.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Expected number of chunks.
    pub fn num_chunks(&self) -> usize {
        self.num_chunks
    }

    /// Documents requested per fetch.
    pub fn chunksize(&self) -> usize {
        self.chunksize
    }

    /// Effective filters, including the worker partition.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Cursor the next fetch will use.
    pub fn after_id(&self) -> Option<&Cursor> {
        self.after_id.as_ref()
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Counters so far.
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// The dataset.
    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    /// The operator.
    pub fn operator(&self) -> &O {
        &self.operator
    }

    /// The operator, mutably.
    pub fn operator_mut(&mut self) -> &mut O {
        &mut self.operator
    }

    /// Fetches the next non-empty chunk.
    ///
    /// Returns `None` once a fetch comes back empty, and on every call after
    /// that or after an error, without contacting the dataset.
    pub fn next_chunk(&mut self) -> Option<EngineResult<Vec<Document>>> {
        if self.state.is_done() {
            return None;
        }
        self.state = EngineState::Fetching;

        let request = FetchRequest {
            page_size: self.chunksize,
            filters: self.filters.clone(),
            select_fields: self.config.select_fields.clone(),
            after_id: self.after_id.clone(),
            worker_number: (self.config.worker_number > 0).then_some(self.config.worker_number),
        };
        let dataset = &self.dataset;
        let fetched = with_retry(
            &self.config.retry,
            &mut self.retry_count,
            &mut self.stats,
            "fetch",
            DatasetError::is_transient,
            || dataset.get_documents(&request),
        );

        let Chunk {
            documents,
            after_id,
        } = match fetched {
            Ok(chunk) => chunk,
            Err(e) => {
                self.state = EngineState::Done;
                return Some(Err(e));
            }
        };

        if documents.is_empty() {
            debug!(chunks = self.chunk_index, "dataset exhausted");
            self.state = EngineState::Done;
            return None;
        }

        self.after_id = after_id.or_else(|| {
            documents
                .last()
                .and_then(Document::id_value)
                .map(|id| Cursor::after(id.clone()))
        });
        self.chunk_index += 1;
        self.stats.chunks_fetched += 1;
        self.stats.documents_fetched += documents.len() as u64;
        self.state = EngineState::Processing;
        info!(
            documents = documents.len(),
            "chunk {}/{}",
            self.chunk_index,
            self.num_chunks
        );
        Some(Ok(documents))
    }

    /// Iterates over the remaining chunks.
    pub fn iterate(&mut self) -> Chunks<'_, D, O> {
        Chunks { engine: self }
    }

    /// Runs the operator over a chunk and returns the non-empty diffs.
    pub fn transform_chunk(&mut self, documents: &[Document]) -> EngineResult<Vec<Document>> {
        operator::apply(&mut self.operator, documents, &self.config.diff).map_err(|e| {
            self.state = EngineState::Done;
            EngineError::Transform(e)
        })
    }

    /// Pushes diffs to the dataset.
    ///
    /// An empty slice makes no call and returns `Ok(None)`. Any dataset
    /// error counts as a failed attempt.
    pub fn update_chunk(&mut self, documents: &[Document]) -> EngineResult<Option<UpdateReport>> {
        if documents.is_empty() {
            return Ok(None);
        }
        let dataset = &self.dataset;
        let report = with_retry(
            &self.config.retry,
            &mut self.retry_count,
            &mut self.stats,
            "update",
            |_| true,
            || dataset.update_documents(documents),
        )
        .inspect_err(|_| self.state = EngineState::Done)?;

        self.stats.updates_sent += 1;
        self.stats.documents_updated += report.updated as u64;
        if !report.failed_documents.is_empty() {
            warn!(
                failed = report.failed_documents.len(),
                "dataset rejected some updates"
            );
        }
        Ok(Some(report))
    }

    /// Runs pre-hooks, the strategy, then post-hooks.
    ///
    /// Post-hooks are skipped when the strategy fails.
    pub fn run<S: Strategy<D, O>>(&mut self, strategy: &mut S) -> EngineResult<ApplyReport> {
        info!(
            dataset = self.dataset.dataset_id(),
            operator = self.operator.name(),
            size = self.size,
            num_chunks = self.num_chunks,
            "starting run"
        );
        self.operator
            .pre_hooks(&self.dataset)
            .map_err(|source| EngineError::Hook {
                stage: "pre",
                source,
            })?;

        let report = strategy.apply(self).inspect_err(|e| {
            warn!(error = %e, "apply failed, skipping post hooks");
        })?;
        self.state = EngineState::Done;

        self.operator
            .post_hooks(&self.dataset)
            .map_err(|source| EngineError::Hook {
                stage: "post",
                source,
            })?;

        info!(
            chunks = report.chunks,
            changed = report.documents_changed,
            failed = report.failed_documents.len(),
            "run complete"
        );
        Ok(report)
    }

    /// Runs with the default [`StableStrategy`].
    pub fn call(&mut self) -> EngineResult<ApplyReport> {
        self.run(&mut StableStrategy)
    }
}

impl<D: Dataset + std::fmt::Debug, O: Operator> std::fmt::Debug for Engine<D, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("dataset", &self.dataset)
            .field("operator", &self.operator.name())
            .field("size", &self.size)
            .field("chunksize", &self.chunksize)
            .field("state", &self.state)
            .finish()
    }
}

/// Iterator over an engine's remaining chunks.
pub struct Chunks<'a, D: Dataset, O: Operator> {
    engine: &'a mut Engine<D, O>,
}

impl<D: Dataset, O: Operator> Iterator for Chunks<'_, D, O> {
    type Item = EngineResult<Vec<Document>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.engine.next_chunk()
    }
}

impl<D: Dataset, O: Operator> std::iter::FusedIterator for Chunks<'_, D, O> {}

/// Calls `call` until it succeeds, a non-retryable error occurs, or
/// `max_retries` retries have failed.
fn with_retry<T>(
    retry: &RetryConfig,
    retry_count: &mut u32,
    stats: &mut EngineStats,
    operation: &'static str,
    retryable: impl Fn(&DatasetError) -> bool,
    mut call: impl FnMut() -> DatasetResult<T>,
) -> EngineResult<T> {
    loop {
        match call() {
            Ok(value) => {
                *retry_count = 0;
                return Ok(value);
            }
            Err(e) if !retryable(&e) => {
                *retry_count = 0;
                return Err(e.into());
            }
            Err(e) => {
                if *retry_count >= retry.max_retries {
                    let attempts = *retry_count + 1;
                    *retry_count = 0;
                    return Err(EngineError::MaxRetriesExceeded {
                        operation,
                        attempts,
                        last_error: e.to_string(),
                    });
                }
                *retry_count += 1;
                stats.retries += 1;
                warn!(
                    operation,
                    attempt = *retry_count,
                    max_retries = retry.max_retries,
                    error = %e,
                    "retrying after {:?}",
                    retry.backoff
                );
                if !retry.backoff.is_zero() {
                    std::thread::sleep(retry.backoff);
                }
            }
        }
    }
}
