//! Configuration for the engine.

use crate::dataset::Cursor;
use crate::filter::Filter;
use docflow_document::DiffOptions;
use std::time::Duration;

/// Default number of documents per chunk.
pub const DEFAULT_CHUNKSIZE: usize = 8;

/// How many documents to fetch per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkSize {
    /// A fixed page size, which must be positive.
    Fixed(usize),
    /// Fetch the whole filtered dataset as one chunk.
    WholeDataset,
}

impl Default for ChunkSize {
    fn default() -> Self {
        ChunkSize::Fixed(DEFAULT_CHUNKSIZE)
    }
}

/// Retry policy for fetches and updates.
///
/// Backoff is a fixed sleep between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt of one fetch or update.
    pub max_retries: u32,
    /// Sleep between attempts.
    pub backoff: Duration,
}

impl RetryConfig {
    /// Creates a retry configuration with the default backoff.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Duration::from_secs(1),
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Sets the backoff interval.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Total attempts one operation may make.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Configuration for one engine run.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Documents per chunk.
    pub chunksize: ChunkSize,
    /// Caller filters. The worker partition filter is appended at build time.
    pub filters: Vec<Filter>,
    /// Fields to fetch; `None` fetches whole documents.
    pub select_fields: Option<Vec<String>>,
    /// Cursor to resume from.
    pub after_id: Option<Cursor>,
    /// This worker's number, counting from 1. Zero disables sharding.
    pub worker_number: u32,
    /// Number of workers sharing the dataset. Zero disables sharding.
    pub total_workers: u32,
    /// Retry policy.
    pub retry: RetryConfig,
    /// Diff comparison options.
    pub diff: DiffOptions,
}

impl EngineConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a fixed chunk size.
    #[must_use]
    pub fn with_chunksize(mut self, chunksize: usize) -> Self {
        self.chunksize = ChunkSize::Fixed(chunksize);
        self
    }

    /// Processes the whole filtered dataset as one chunk.
    #[must_use]
    pub fn whole_dataset(mut self) -> Self {
        self.chunksize = ChunkSize::WholeDataset;
        self
    }

    /// Replaces the filters.
    #[must_use]
    pub fn with_filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = filters;
        self
    }

    /// Adds a filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Restricts the fields fetched.
    #[must_use]
    pub fn with_select_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Resumes from a cursor.
    #[must_use]
    pub fn with_after_id(mut self, after_id: Cursor) -> Self {
        self.after_id = Some(after_id);
        self
    }

    /// Shards the dataset across workers.
    #[must_use]
    pub fn with_workers(mut self, worker_number: u32, total_workers: u32) -> Self {
        self.worker_number = worker_number;
        self.total_workers = total_workers;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the diff options.
    #[must_use]
    pub fn with_diff_options(mut self, diff: DiffOptions) -> Self {
        self.diff = diff;
        self
    }
}
