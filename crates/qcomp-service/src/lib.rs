//! Asynchronous quantum circuit compilation job service.
//!
//! Clients submit a circuit plus compilation constraints and receive a job
//! identifier straight away. Compilation runs later on a bounded pool of
//! worker slots; results and failures are recorded in a durable job store and
//! read back by polling or by waiting on the job.
//!
//! # Architecture
//!
//! ```text
//! rest (axum) ──submit──> Dispatcher ──compile──> CompilationBackend
//!      │                      │
//!    export               transition
//!      v                      v
//!  exporter <─────read───── JobStore (memory | sqlite)
//! ```
//!
//! # Features
//!
//! - **sqlite**: persistent job storage with schema migrations (default)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use qcomp_compile::{BackendRegistry, CompilationConstraints};
//! use qcomp_ir::{Circuit, QubitId};
//! use qcomp_service::{Dispatcher, DispatcherConfig, JobStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::new(
//!         JobStore::new(),
//!         Arc::new(BackendRegistry::with_defaults()),
//!         DispatcherConfig::default(),
//!     );
//!
//!     let mut circuit = Circuit::with_size("bell", 2, 0);
//!     circuit.h(QubitId(0))?;
//!     circuit.cx(QubitId(0), QubitId(1))?;
//!
//!     let id = dispatcher
//!         .submit(circuit, CompilationConstraints::new("star-5q", 2))
//!         .await?;
//!     let job = dispatcher.await_result(&id, Duration::from_secs(60)).await?;
//!     println!("{}: {}", job.id, job.state);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod exporter;
pub mod health;
pub mod job;
pub mod job_store;
pub mod metrics;
pub mod rest;
pub mod retention;
pub mod storage;
pub mod tracing_config;

// Re-export commonly used types
pub use config::{Config, ConfigError, StorageBackend, StorageConfig};
pub use dispatcher::{Dispatcher, DispatcherConfig, JobEvent, RecoveryReport};
pub use error::{Error, Result};
pub use exporter::{CompiledPayload, JobResponse, export};
pub use job::{ErrorKind, JobError, JobId, JobRecord, JobState, RECORD_VERSION, Transition};
pub use job_store::JobStore;
pub use metrics::Metrics;
pub use storage::{JobFilter, JobStorage, ListOrder, MemoryStorage};

#[cfg(feature = "sqlite")]
pub use storage::SqliteStorage;
pub use tracing_config::{LogFormat, init_tracing};
