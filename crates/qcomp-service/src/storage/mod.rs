//! Pluggable storage backends for job persistence.
//!
//! - `MemoryStorage`: in-memory storage (no persistence)
//! - `SqliteStorage`: `SQLite` database surviving process restarts

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::job::{JobId, JobRecord, JobState, Transition};

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStorage;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;

/// Default number of jobs returned by [`JobStorage::list`].
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Order of [`JobStorage::list`] results by creation time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Filter for querying jobs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobFilter {
    pub state: Option<JobState>,
    pub backend: Option<String>,
    pub limit: usize,
    pub order: ListOrder,
}

impl Default for JobFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl JobFilter {
    pub fn new() -> Self {
        Self {
            state: None,
            backend: None,
            limit: DEFAULT_LIST_LIMIT,
            order: ListOrder::NewestFirst,
        }
    }

    pub fn with_state(mut self, state: JobState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_order(mut self, order: ListOrder) -> Self {
        self.order = order;
        self
    }

    /// Whether a record passes the state and backend predicates.
    pub fn matches(&self, record: &JobRecord) -> bool {
        self.state.is_none_or(|s| s == record.state)
            && self
                .backend
                .as_deref()
                .is_none_or(|b| b == record.backend())
    }
}

/// Job persistence.
///
/// All methods on a single job are atomic with respect to each other:
/// concurrent callers never observe a half-applied transition.
#[async_trait]
pub trait JobStorage: Send + Sync {
    /// Store a new job. Fails if the identifier already exists.
    async fn insert(&self, record: &JobRecord) -> Result<()>;

    /// Retrieve a job by ID.
    async fn get(&self, id: &JobId) -> Result<Option<JobRecord>>;

    /// Validate and apply a transition, returning the updated record.
    ///
    /// Fails with `JobNotFound` or `InvalidTransition`; on failure the stored
    /// record is unchanged.
    async fn transition(&self, id: &JobId, transition: Transition) -> Result<JobRecord>;

    /// List jobs matching a filter.
    async fn list(&self, filter: &JobFilter) -> Result<Vec<JobRecord>>;

    /// Delete a job. Returns whether it existed.
    async fn delete(&self, id: &JobId) -> Result<bool>;

    /// Delete terminal jobs that finished before `cutoff`. Returns the count.
    async fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    /// Number of jobs in each state, in lifecycle order.
    async fn count_by_state(&self) -> Result<Vec<(JobState, usize)>>;
}
