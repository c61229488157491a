//! In-memory job storage (no persistence).
//!
//! Jobs live in an `Arc<RwLock<..>>` map and are lost when the process exits.
//! A monotonically increasing sequence number records creation order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{JobFilter, JobStorage, ListOrder};
use crate::error::{Error, Result};
use crate::job::{JobId, JobRecord, JobState, Transition};

#[derive(Default)]
struct Inner {
    next_seq: u64,
    jobs: FxHashMap<JobId, (u64, JobRecord)>,
}

/// In-memory job storage.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStorage for MemoryStorage {
    async fn insert(&self, record: &JobRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.jobs.contains_key(&record.id) {
            return Err(Error::StorageError(format!(
                "job {} already exists",
                record.id
            )));
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.jobs.insert(record.id.clone(), (seq, record.clone()));
        Ok(())
    }

    async fn get(&self, id: &JobId) -> Result<Option<JobRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.jobs.get(id).map(|(_, record)| record.clone()))
    }

    async fn transition(&self, id: &JobId, transition: Transition) -> Result<JobRecord> {
        let mut inner = self.inner.write().await;
        let (_, record) = inner
            .jobs
            .get_mut(id)
            .ok_or_else(|| Error::JobNotFound(id.to_string()))?;
        record.apply(transition, Utc::now())?;
        Ok(record.clone())
    }

    async fn list(&self, filter: &JobFilter) -> Result<Vec<JobRecord>> {
        let inner = self.inner.read().await;

        let mut matched: Vec<&(u64, JobRecord)> = inner
            .jobs
            .values()
            .filter(|(_, record)| filter.matches(record))
            .collect();

        match filter.order {
            ListOrder::NewestFirst => matched.sort_by_key(|(seq, _)| std::cmp::Reverse(*seq)),
            ListOrder::OldestFirst => matched.sort_by_key(|(seq, _)| *seq),
        }

        Ok(matched
            .into_iter()
            .take(filter.limit)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn delete(&self, id: &JobId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.jobs.remove(id).is_some())
    }

    async fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut inner = self.inner.write().await;
        let before = inner.jobs.len();
        inner.jobs.retain(|_, (_, record)| {
            !(record.is_terminal() && record.finished_at.is_some_and(|t| t < cutoff))
        });
        Ok(before - inner.jobs.len())
    }

    async fn count_by_state(&self) -> Result<Vec<(JobState, usize)>> {
        let inner = self.inner.read().await;
        Ok(JobState::ALL
            .into_iter()
            .map(|state| {
                let n = inner
                    .jobs
                    .values()
                    .filter(|(_, record)| record.state == state)
                    .count();
                (state, n)
            })
            .collect())
    }
}
