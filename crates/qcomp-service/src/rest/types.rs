//! JSON request and response bodies of the HTTP API.

use qcomp_compile::{BackendInfo, CompilationConstraints};
use serde::{Deserialize, Serialize};

use crate::exporter::JobResponse;
use crate::job::JobState;

/// Version of the HTTP API contract.
pub const API_VERSION: &str = "1.0";

/// Default wait for `GET /api/v1/jobs/:id/wait`.
pub const DEFAULT_WAIT_MS: u64 = 30_000;

/// Largest page `GET /api/v1/jobs` returns.
pub const MAX_LIST_LIMIT: usize = 1000;

/// `POST /api/v1/jobs` and `POST /api/v1/transpile`.
///
/// The circuit stays untyped here so that circuit errors are reported as
/// `MalformedCircuit` rather than as a generic body error.
#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub circuit: serde_json::Value,
    pub constraints: CompilationConstraints,
}

/// `POST /api/v1/jobs` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub id: String,
    pub state: JobState,
    pub location: String,
}

/// Query of `GET /api/v1/jobs`.
#[derive(Debug, Default, Deserialize)]
pub struct ListJobsQuery {
    pub state: Option<String>,
    pub backend: Option<String>,
    pub limit: Option<usize>,
}

/// `GET /api/v1/jobs` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobResponse>,
}

/// Query of `GET /api/v1/jobs/:id/wait`.
#[derive(Debug, Default, Deserialize)]
pub struct WaitQuery {
    pub timeout_ms: Option<u64>,
}

/// `DELETE /api/v1/jobs/:id` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct CancelJobResponse {
    pub id: String,
    pub cancelled: bool,
    pub state: JobState,
}

/// `GET /api/v1/version` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

/// `GET /api/v1/backends` response.
#[derive(Debug, Serialize)]
pub struct ListBackendsResponse {
    pub backends: Vec<BackendInfo>,
}

/// Generic error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}
