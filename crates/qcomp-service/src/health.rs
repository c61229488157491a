//! Health reporting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Instant;

use crate::dispatcher::Dispatcher;

/// Server uptime tracker.
static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Record the start time. Later calls keep the first value.
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

/// Seconds since [`init_start_time`], or 0 if it was never called.
pub fn uptime_seconds() -> u64 {
    START_TIME.get().map_or(0, |start| start.elapsed().as_secs())
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy", or "degraded" when the job store cannot be read
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub workers: usize,
    pub queue_depth: usize,
    /// Job count per state; empty when degraded
    pub jobs: BTreeMap<String, usize>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Collect the health report. Never fails; storage errors mark it degraded.
pub async fn report(dispatcher: &Dispatcher) -> HealthResponse {
    let (status, jobs) = match dispatcher.store().count_by_state().await {
        Ok(counts) => (
            "healthy",
            counts
                .into_iter()
                .map(|(state, n)| (state.to_string(), n))
                .collect(),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not read the job store");
            ("degraded", BTreeMap::new())
        }
    };

    HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime_seconds(),
        workers: dispatcher.config().workers,
        queue_depth: dispatcher.queue_depth().await,
        jobs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::DispatcherConfig;
    use crate::job_store::JobStore;
    use qcomp_compile::BackendRegistry;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_report_counts_every_state() {
        init_start_time();
        let dispatcher = Dispatcher::new(
            JobStore::new(),
            Arc::new(BackendRegistry::with_defaults()),
            DispatcherConfig::new(3, Duration::from_secs(5)),
        );
        let report = report(&dispatcher).await;
        assert!(report.is_healthy());
        assert_eq!(report.workers, 3);
        assert_eq!(report.jobs.len(), 6);
        assert_eq!(report.jobs["queued"], 0);
    }
}
