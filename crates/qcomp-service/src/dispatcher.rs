//! Job scheduler and dispatcher.
//!
//! Submissions are recorded in the [`JobStore`] and pushed on a FIFO queue.
//! A single admission task takes a worker slot from a counting semaphore,
//! pops the queue head and moves that job to `Running`, so jobs start in
//! submission order and never more than `workers` jobs run at once.
//! Compilation itself runs on the blocking pool; its outcome is written back
//! to the store as `Succeeded` or `Failed` and nothing is retried.
//!
//! Every state change is also published as a [`JobEvent`], which is what
//! [`Dispatcher::await_result`] waits on.

use std::any::Any;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use qcomp_compile::{BackendRegistry, CompilationConstraints, CompileBudget};
use qcomp_ir::Circuit;
use tokio::sync::{Mutex, Notify, OwnedSemaphorePermit, Semaphore, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Error, Result};
use crate::job::{ErrorKind, JobError, JobId, JobRecord, JobState, Transition};
use crate::job_store::JobStore;
use crate::metrics::Metrics;
use crate::storage::{JobFilter, ListOrder};

/// Default per-job compilation budget, kept below the default request ceiling.
pub const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(3300);

const EVENT_CAPACITY: usize = 1024;

/// Number of worker slots when none is configured.
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(4, NonZeroUsize::get)
}

/// Dispatcher settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Worker slots; at most this many jobs are `Running` at once.
    pub workers: usize,
    /// Wall-clock budget for a single compilation.
    pub compile_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            compile_timeout: DEFAULT_COMPILE_TIMEOUT,
        }
    }
}

impl DispatcherConfig {
    pub fn new(workers: usize, compile_timeout: Duration) -> Self {
        Self {
            workers,
            compile_timeout,
        }
    }
}

/// A job entered a new state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEvent {
    pub id: JobId,
    pub state: JobState,
}

/// Outcome of [`Dispatcher::recover`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Jobs put back on the queue.
    pub requeued: usize,
    /// Jobs that were running when the previous process stopped.
    pub interrupted: usize,
}

/// Accepts jobs and drives them through their lifecycle.
///
/// Cheap to clone; clones share the same queue and worker slots.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
    admission: Arc<Mutex<Option<JoinHandle<()>>>>,
}

struct Inner {
    store: JobStore,
    registry: Arc<BackendRegistry>,
    config: DispatcherConfig,
    slots: Arc<Semaphore>,
    queue: Mutex<VecDeque<JobId>>,
    queued: Notify,
    events: broadcast::Sender<JobEvent>,
    shutdown: watch::Sender<bool>,
    metrics: Metrics,
}

impl Dispatcher {
    /// Create a dispatcher and start its admission task.
    ///
    /// Must be called from within a Tokio runtime. A worker count of zero is
    /// raised to one.
    pub fn new(store: JobStore, registry: Arc<BackendRegistry>, mut config: DispatcherConfig) -> Self {
        config.workers = config.workers.max(1);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown, _) = watch::channel(false);

        let inner = Arc::new(Inner {
            store,
            registry,
            slots: Arc::new(Semaphore::new(config.workers)),
            config,
            queue: Mutex::new(VecDeque::new()),
            queued: Notify::new(),
            events,
            shutdown,
            metrics: Metrics::new(),
        });

        let handle = tokio::spawn(admission_loop(Arc::clone(&inner)));
        info!(
            workers = inner.config.workers,
            compile_timeout_s = inner.config.compile_timeout.as_secs(),
            "Dispatcher started"
        );

        Self {
            inner,
            admission: Arc::new(Mutex::new(Some(handle))),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.inner.store
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.inner.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    /// Jobs waiting for a worker slot.
    pub async fn queue_depth(&self) -> usize {
        self.inner.queue.lock().await.len()
    }

    /// Receive every subsequent job state change.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.events.subscribe()
    }

    /// Accept a job. Returns once it is `Queued`; never waits on compilation.
    ///
    /// Invalid constraints are rejected here and no job is created. An
    /// unknown backend identifier is accepted and fails the job when it runs.
    #[instrument(skip_all, fields(backend = %constraints.backend))]
    pub async fn submit(
        &self,
        circuit: Circuit,
        constraints: CompilationConstraints,
    ) -> Result<JobId> {
        if *self.inner.shutdown.borrow() {
            return Err(Error::ShuttingDown);
        }
        constraints.validate()?;

        let record = self.inner.store.create(circuit, constraints).await?;
        let id = record.id.clone();
        self.inner.emit(&id, JobState::Submitted);

        // Counted before queueing so a concurrent cancel's decrement pairs with it.
        self.inner.metrics.record_job_submitted(record.backend());
        match self.inner.store.transition(&id, Transition::Queue).await {
            Ok(_) => {}
            // Cancelled before it reached the queue; the job exists and is final.
            Err(Error::InvalidTransition {
                from: JobState::Cancelled,
                ..
            }) => {
                info!(job_id = %id, "Job cancelled before it was queued");
                return Ok(id);
            }
            Err(e) => return Err(e),
        }
        self.inner.emit(&id, JobState::Queued);

        self.inner.queue.lock().await.push_back(id.clone());
        self.inner.queued.notify_one();

        info!(job_id = %id, qubits = record.circuit.num_qubits(), "Job queued");
        Ok(id)
    }

    /// Wait until the job is terminal or `timeout` elapses.
    ///
    /// Holds no worker slot. On `Timeout` the job keeps running.
    #[instrument(skip(self), fields(job_id = %id))]
    pub async fn await_result(&self, id: &JobId, timeout: Duration) -> Result<JobRecord> {
        let mut events = self.inner.events.subscribe();
        let record = self.inner.store.get(id).await?;
        if record.is_terminal() {
            return Ok(record);
        }

        let wait = async {
            loop {
                match events.recv().await {
                    Ok(event) if event.id == *id && event.state.is_terminal() => {
                        return self.inner.store.get(id).await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Event receiver lagged, re-reading job");
                        let record = self.inner.store.get(id).await?;
                        if record.is_terminal() {
                            return Ok(record);
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => return Err(Error::ShuttingDown),
                }
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| Error::Timeout {
                id: id.to_string(),
                waited: timeout,
            })?
    }

    /// Cancel a job that has not started.
    ///
    /// Returns `false` when the job is already running or terminal.
    #[instrument(skip(self), fields(job_id = %id))]
    pub async fn cancel(&self, id: &JobId) -> Result<bool> {
        match self.inner.store.transition(id, Transition::Cancel).await {
            Ok(record) => {
                self.inner.queue.lock().await.retain(|queued| queued != id);
                self.inner.metrics.record_job_cancelled(record.backend());
                self.inner.emit(id, JobState::Cancelled);
                info!("Job cancelled");
                Ok(true)
            }
            Err(Error::InvalidTransition { from, .. }) => {
                debug!(state = %from, "Job can no longer be cancelled");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Pick up jobs left behind by a previous process.
    ///
    /// `Submitted` and `Queued` jobs are queued again in creation order.
    /// `Running` jobs cannot be resumed and are failed. Call once at startup,
    /// before accepting submissions.
    #[instrument(skip(self))]
    pub async fn recover(&self) -> Result<RecoveryReport> {
        let all_in = |state| {
            JobFilter::new()
                .with_state(state)
                .with_limit(usize::MAX)
                .with_order(ListOrder::OldestFirst)
        };
        let mut report = RecoveryReport::default();

        for record in self.inner.store.list(&all_in(JobState::Running)).await? {
            let failed = self
                .inner
                .store
                .transition(
                    &record.id,
                    Transition::Fail(JobError::internal("interrupted by restart")),
                )
                .await?;
            self.inner.metrics.record_job_interrupted(failed.backend());
            self.inner.emit(&failed.id, JobState::Failed);
            warn!(job_id = %failed.id, "Job was running at shutdown, marked failed");
            report.interrupted += 1;
        }

        let mut pending = self.inner.store.list(&all_in(JobState::Submitted)).await?;
        pending.extend(self.inner.store.list(&all_in(JobState::Queued)).await?);
        pending.sort_by_key(|record| record.created_at);

        let mut ids = Vec::with_capacity(pending.len());
        for record in pending {
            if record.state == JobState::Submitted {
                self.inner.store.transition(&record.id, Transition::Queue).await?;
                self.inner.emit(&record.id, JobState::Queued);
            }
            ids.push(record.id);
        }

        {
            let mut queue = self.inner.queue.lock().await;
            for id in ids {
                if !queue.contains(&id) {
                    queue.push_back(id);
                    self.inner.metrics.record_job_requeued();
                    report.requeued += 1;
                }
            }
        }
        self.inner.queued.notify_one();

        info!(
            requeued = report.requeued,
            interrupted = report.interrupted,
            "Recovered jobs from previous run"
        );
        Ok(report)
    }

    /// Stop admitting jobs and wait for running compilations to finish.
    ///
    /// Queued jobs stay `Queued` in the store and are picked up by
    /// [`Dispatcher::recover`] on the next start.
    pub async fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
        if let Some(handle) = self.admission.lock().await.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "Admission task ended abnormally");
            }
        }

        let workers = u32::try_from(self.inner.config.workers).unwrap_or(u32::MAX);
        if self.inner.slots.acquire_many(workers).await.is_err() {
            warn!("Worker slots closed before running jobs drained");
        }
        info!("Dispatcher stopped");
    }
}

impl Inner {
    fn emit(&self, id: &JobId, state: JobState) {
        // No subscribers is fine.
        let _ = self.events.send(JobEvent {
            id: id.clone(),
            state,
        });
    }

    async fn start(self: &Arc<Self>, id: JobId, permit: OwnedSemaphorePermit) {
        match self.store.transition(&id, Transition::Start).await {
            Ok(record) => {
                self.metrics.record_job_started();
                self.emit(&id, JobState::Running);
                info!(job_id = %id, backend = record.backend(), "Job started");
                let inner = Arc::clone(self);
                tokio::spawn(async move { inner.execute(record, permit).await });
            }
            Err(Error::InvalidTransition { from, .. }) => {
                debug!(job_id = %id, state = %from, "Skipping job that is no longer queued");
            }
            Err(e) => error!(job_id = %id, error = %e, "Failed to start job"),
        }
    }

    async fn execute(&self, record: JobRecord, permit: OwnedSemaphorePermit) {
        let id = record.id.clone();
        let backend = record.backend().to_string();
        let started = Instant::now();

        let (outcome, permit) = self.compile(record, permit).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let transition = match outcome {
            Ok(compiled) => Transition::Succeed(compiled),
            Err(error) => Transition::Fail(error),
        };

        match self.store.transition(&id, transition).await {
            Ok(done) => {
                match &done.error {
                    None => {
                        self.metrics.record_job_succeeded(&backend, elapsed_ms);
                        info!(job_id = %id, elapsed_ms, "Job succeeded");
                    }
                    Some(err) => {
                        self.metrics
                            .record_job_failed(&backend, err.kind.as_str(), elapsed_ms);
                        warn!(job_id = %id, kind = %err.kind, error = %err.message, "Job failed");
                    }
                }
                self.emit(&id, done.state);
            }
            Err(e) => error!(job_id = %id, error = %e, "Failed to record job outcome"),
        }

        // Release the slot only after the terminal state is visible.
        drop(permit);
    }

    /// Run the backend on the blocking pool.
    ///
    /// The permit travels with the blocking task and comes back when it
    /// returns. On timeout it stays with the still-running task.
    async fn compile(
        &self,
        record: JobRecord,
        permit: OwnedSemaphorePermit,
    ) -> (
        std::result::Result<Circuit, JobError>,
        Option<OwnedSemaphorePermit>,
    ) {
        let backend = match self.registry.get(record.backend()) {
            Ok(backend) => backend,
            Err(e) => return (Err(JobError::from(&e)), Some(permit)),
        };

        let limit = self.config.compile_timeout;
        let JobRecord {
            circuit,
            constraints,
            ..
        } = record;

        let task = tokio::task::spawn_blocking(move || {
            let budget = CompileBudget::with_timeout(limit);
            let result = catch_unwind(AssertUnwindSafe(|| {
                backend.compile(&circuit, &constraints, &budget)
            }));
            (result, permit)
        });

        match tokio::time::timeout(limit, task).await {
            Ok(Ok((Ok(Ok(compiled)), permit))) => (Ok(compiled), Some(permit)),
            Ok(Ok((Ok(Err(e)), permit))) => (Err(JobError::from(&e)), Some(permit)),
            Ok(Ok((Err(panic), permit))) => (
                Err(JobError::internal(format!(
                    "compiler panicked: {}",
                    panic_message(panic.as_ref())
                ))),
                Some(permit),
            ),
            Ok(Err(e)) => (
                Err(JobError::internal(format!("compilation task failed: {e}"))),
                None,
            ),
            Err(_) => (
                Err(JobError::new(
                    ErrorKind::CompilationTimeout,
                    format!("compilation exceeded {:.3}s", limit.as_secs_f64()),
                )),
                None,
            ),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn admission_loop(inner: Arc<Inner>) {
    let mut shutdown = inner.shutdown.subscribe();
    loop {
        if *shutdown.borrow() {
            break;
        }

        let permit = tokio::select! {
            _ = shutdown.changed() => continue,
            permit = Arc::clone(&inner.slots).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let Some(id) = next_queued(&inner, &mut shutdown).await else {
            break;
        };
        inner.start(id, permit).await;
    }
    debug!("Admission loop stopped");
}

async fn next_queued(inner: &Inner, shutdown: &mut watch::Receiver<bool>) -> Option<JobId> {
    loop {
        if let Some(id) = inner.queue.lock().await.pop_front() {
            return Some(id);
        }
        if *shutdown.borrow() {
            return None;
        }
        tokio::select! {
            _ = shutdown.changed() => {}
            () = inner.queued.notified() => {}
        }
    }
}
