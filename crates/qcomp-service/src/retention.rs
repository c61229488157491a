//! Periodic cleanup of finished jobs.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::job_store::JobStore;

/// Delete terminal jobs that finished more than `retention` ago.
pub async fn sweep_once(store: &JobStore, retention: Duration) -> Result<usize> {
    let retention = chrono::Duration::from_std(retention)
        .map_err(|e| Error::Internal(format!("retention period out of range: {e}")))?;
    let removed = store.purge_finished_before(Utc::now() - retention).await?;
    if removed > 0 {
        info!(removed, "Purged finished jobs");
    } else {
        debug!("No finished jobs to purge");
    }
    Ok(removed)
}

/// Run [`sweep_once`] every `interval` until the task is aborted.
pub fn spawn_sweeper(store: JobStore, retention: Duration, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_once(&store, retention).await {
                warn!(error = %e, "Retention sweep failed");
            }
        }
    })
}
