//! Job store facade over a pluggable storage backend.

use chrono::{DateTime, Utc};
use qcomp_compile::CompilationConstraints;
use qcomp_ir::Circuit;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{Error, Result};
use crate::job::{JobId, JobRecord, JobState, Transition};
use crate::storage::{JobFilter, JobStorage, MemoryStorage};

/// Thread-safe job store. The single source of truth for job state.
#[derive(Clone)]
pub struct JobStore {
    storage: Arc<dyn JobStorage>,
}

impl JobStore {
    /// Job store with in-memory storage.
    pub fn new() -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
        }
    }

    /// Job store with a custom storage backend.
    pub fn with_storage(storage: Arc<dyn JobStorage>) -> Self {
        Self { storage }
    }

    /// Build the storage backend named by the configuration.
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        match config.backend {
            StorageBackend::Memory => Ok(Self::new()),
            #[cfg(feature = "sqlite")]
            StorageBackend::Sqlite => {
                let path = config.path.clone().ok_or_else(|| {
                    Error::StorageError("sqlite storage requires a path".into())
                })?;
                let storage = tokio::task::spawn_blocking(move || {
                    crate::storage::SqliteStorage::open(path)
                })
                .await
                .map_err(|e| Error::StorageError(format!("task join error: {e}")))??;
                Ok(Self::with_storage(Arc::new(storage)))
            }
            #[cfg(not(feature = "sqlite"))]
            StorageBackend::Sqlite => Err(Error::StorageError(
                "built without the `sqlite` feature".into(),
            )),
        }
    }

    /// Create a job in the `Submitted` state.
    pub async fn create(
        &self,
        circuit: Circuit,
        constraints: CompilationConstraints,
    ) -> Result<JobRecord> {
        let record = JobRecord::new(JobId::generate(), circuit, constraints);
        self.storage.insert(&record).await?;
        Ok(record)
    }

    /// Get a job by ID.
    pub async fn get(&self, id: &JobId) -> Result<JobRecord> {
        self.storage
            .get(id)
            .await?
            .ok_or_else(|| Error::JobNotFound(id.to_string()))
    }

    /// Atomically move a job to a new state.
    pub async fn transition(&self, id: &JobId, transition: Transition) -> Result<JobRecord> {
        self.storage.transition(id, transition).await
    }

    pub async fn list(&self, filter: &JobFilter) -> Result<Vec<JobRecord>> {
        self.storage.list(filter).await
    }

    pub async fn delete(&self, id: &JobId) -> Result<bool> {
        self.storage.delete(id).await
    }

    pub async fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.storage.purge_finished_before(cutoff).await
    }

    pub async fn count_by_state(&self) -> Result<Vec<(JobState, usize)>> {
        self.storage.count_by_state().await
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
