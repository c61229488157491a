//! Prometheus metrics for the compilation job service.
//!
//! Metrics live in the default registry, registered once on first use.

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramVec, TextEncoder, register_counter_vec, register_gauge,
    register_histogram_vec,
};

lazy_static! {
    /// Jobs accepted by the dispatcher, by backend
    pub static ref JOBS_SUBMITTED: CounterVec = register_counter_vec!(
        "qcomp_jobs_submitted_total",
        "Total number of jobs submitted",
        &["backend"]
    )
    .unwrap();

    /// Jobs that reached Succeeded, by backend
    pub static ref JOBS_SUCCEEDED: CounterVec = register_counter_vec!(
        "qcomp_jobs_succeeded_total",
        "Total number of jobs compiled successfully",
        &["backend"]
    )
    .unwrap();

    /// Jobs that reached Failed, by backend and error kind
    pub static ref JOBS_FAILED: CounterVec = register_counter_vec!(
        "qcomp_jobs_failed_total",
        "Total number of jobs that failed",
        &["backend", "kind"]
    )
    .unwrap();

    /// Jobs cancelled before they started, by backend
    pub static ref JOBS_CANCELLED: CounterVec = register_counter_vec!(
        "qcomp_jobs_cancelled_total",
        "Total number of jobs cancelled",
        &["backend"]
    )
    .unwrap();

    /// Wall-clock compilation time in milliseconds
    pub static ref COMPILE_DURATION: HistogramVec = register_histogram_vec!(
        "qcomp_compile_duration_milliseconds",
        "Compilation duration in milliseconds",
        &["backend"],
        vec![1.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 30000.0, 300000.0]
    )
    .unwrap();

    /// Jobs waiting for a worker slot
    pub static ref QUEUED_JOBS: Gauge = register_gauge!(
        "qcomp_queued_jobs",
        "Number of jobs waiting for a worker slot"
    )
    .unwrap();

    /// Jobs in the Running state. A timed-out compilation leaves this gauge
    /// while its worker slot stays busy until the backend call returns.
    pub static ref RUNNING_JOBS: Gauge = register_gauge!(
        "qcomp_running_jobs",
        "Number of jobs in the Running state"
    )
    .unwrap();
}

/// Convenience handle over the global metrics.
#[derive(Clone, Copy, Debug, Default)]
pub struct Metrics;

impl Metrics {
    pub fn new() -> Self {
        Self
    }

    pub fn record_job_submitted(&self, backend: &str) {
        JOBS_SUBMITTED.with_label_values(&[backend]).inc();
        QUEUED_JOBS.inc();
    }

    pub fn record_job_started(&self) {
        QUEUED_JOBS.dec();
        RUNNING_JOBS.inc();
    }

    pub fn record_job_succeeded(&self, backend: &str, duration_ms: f64) {
        JOBS_SUCCEEDED.with_label_values(&[backend]).inc();
        COMPILE_DURATION
            .with_label_values(&[backend])
            .observe(duration_ms);
        RUNNING_JOBS.dec();
    }

    pub fn record_job_failed(&self, backend: &str, kind: &str, duration_ms: f64) {
        JOBS_FAILED.with_label_values(&[backend, kind]).inc();
        COMPILE_DURATION
            .with_label_values(&[backend])
            .observe(duration_ms);
        RUNNING_JOBS.dec();
    }

    /// A queued job was cancelled before reaching a worker.
    pub fn record_job_cancelled(&self, backend: &str) {
        JOBS_CANCELLED.with_label_values(&[backend]).inc();
        QUEUED_JOBS.dec();
    }

    /// A job from a previous process was put back on the queue.
    pub fn record_job_requeued(&self) {
        QUEUED_JOBS.inc();
    }

    /// A job found running at startup was failed.
    pub fn record_job_interrupted(&self, backend: &str) {
        JOBS_FAILED
            .with_label_values(&[backend, "InternalCompilerError"])
            .inc();
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
