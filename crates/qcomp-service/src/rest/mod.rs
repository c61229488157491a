//! HTTP interface of the compilation job service.
//!
//! | Method | Path | |
//! |--------|------|-|
//! | GET | `/api/v1/version` | API contract version |
//! | GET | `/health` | liveness, uptime and job counts |
//! | GET | `/metrics` | Prometheus text format |
//! | GET | `/api/v1/backends` | registered backends |
//! | POST | `/api/v1/jobs` | submit, `202 Accepted` with `Location` |
//! | GET | `/api/v1/jobs` | list, filtered by `state`, `backend`, `limit` |
//! | GET | `/api/v1/jobs/:id` | current state or result |
//! | GET | `/api/v1/jobs/:id/wait` | block until terminal or `timeout_ms` |
//! | DELETE | `/api/v1/jobs/:id` | cancel |
//! | POST | `/api/v1/transpile` | submit and wait in one call |
//!
//! Routes under `/api/v1` other than `version` require the bearer token
//! when one is configured.

pub mod auth;
pub mod types;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use qcomp_compile::CompilationConstraints;
use qcomp_ir::Circuit;

use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::exporter::export;
use crate::health;
use crate::job::{JobId, JobState};
use crate::metrics::Metrics;
use crate::storage::JobFilter;

use auth::AuthState;
use types::*;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub auth: AuthState,
    /// Ceiling on blocking waits.
    pub request_timeout: Duration,
    pub metrics_enabled: bool,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            auth: AuthState::default(),
            request_timeout: Duration::from_secs(3600),
            metrics_enabled: true,
        }
    }
}

/// Build the router.
///
/// `cors_origins` is a comma-separated list of allowed origins or `"*"`;
/// `None` adds no CORS headers.
pub fn rest_router(state: AppState, cors_origins: Option<&str>) -> Router {
    let api = Router::new()
        .route("/api/v1/backends", get(list_backends_handler))
        .route("/api/v1/jobs", post(submit_job_handler).get(list_jobs_handler))
        .route(
            "/api/v1/jobs/:id",
            get(get_job_handler).delete(cancel_job_handler),
        )
        .route("/api/v1/jobs/:id/wait", get(wait_job_handler))
        .route("/api/v1/transpile", post(transpile_handler))
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth::bearer_auth,
        ));

    let router = Router::new()
        .route("/api/v1/version", get(version_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match cors_origins {
        Some(origins) => router.layer(build_cors_layer(origins)),
        None => router,
    }
}

fn build_cors_layer(origins: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::LOCATION]);

    if origins.trim() == "*" {
        layer.allow_origin(tower_http::cors::Any)
    } else {
        let allowed: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|o| o.trim().parse().ok())
            .collect();
        layer.allow_origin(allowed)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::MalformedCircuit(_) | Error::InvalidConstraints(_) | Error::InvalidArgument(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::JobNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidTransition { .. } => StatusCode::CONFLICT,
            Error::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            Error::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            Error::Json(_) | Error::StorageError(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                code: self.code().to_string(),
            }),
        )
            .into_response()
    }
}

/// Decode a submission body. Circuit problems become `MalformedCircuit`.
fn parse_submission(body: &[u8]) -> Result<(Circuit, CompilationConstraints)> {
    let request: SubmitJobRequest = serde_json::from_slice(body)
        .map_err(|e| Error::InvalidArgument(format!("invalid request body: {e}")))?;
    let circuit = qcomp_ir::parse(&serde_json::to_vec(&request.circuit)?)?;
    Ok((circuit, request.constraints))
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn version_handler() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: API_VERSION.to_string(),
    })
}

async fn health_handler(State(state): State<AppState>) -> Response {
    let report = health::report(&state.dispatcher).await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

async fn metrics_handler(State(state): State<AppState>) -> Result<Response> {
    if !state.metrics_enabled {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }
    let body = Metrics::new()
        .export()
        .map_err(|e| Error::Internal(format!("metrics export failed: {e}")))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

async fn list_backends_handler(State(state): State<AppState>) -> Json<ListBackendsResponse> {
    Json(ListBackendsResponse {
        backends: state.dispatcher.registry().list(),
    })
}

async fn submit_job_handler(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let (circuit, constraints) = parse_submission(&body)?;
    let id = state.dispatcher.submit(circuit, constraints).await?;
    let location = format!("/api/v1/jobs/{id}");

    info!(job_id = %id, "Job submitted over HTTP");
    Ok((
        StatusCode::ACCEPTED,
        [(header::LOCATION, location.clone())],
        Json(SubmitJobResponse {
            id: id.to_string(),
            state: JobState::Queued,
            location,
        }),
    )
        .into_response())
}

async fn list_jobs_handler(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<ListJobsResponse>> {
    let mut filter = JobFilter::new();
    if let Some(s) = query.state.as_deref() {
        filter = filter.with_state(s.parse()?);
    }
    if let Some(backend) = query.backend {
        filter = filter.with_backend(backend);
    }
    if let Some(limit) = query.limit {
        filter = filter.with_limit(limit.min(MAX_LIST_LIMIT));
    }

    let jobs = state.dispatcher.store().list(&filter).await?;
    Ok(Json(ListJobsResponse {
        jobs: jobs.iter().map(export).collect(),
    }))
}

async fn get_job_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let record = state.dispatcher.store().get(&JobId::new(id)).await?;
    Ok(Json(export(&record)).into_response())
}

async fn wait_job_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<WaitQuery>,
) -> Result<Response> {
    let timeout = Duration::from_millis(query.timeout_ms.unwrap_or(DEFAULT_WAIT_MS))
        .min(state.request_timeout);
    let record = state
        .dispatcher
        .await_result(&JobId::new(id), timeout)
        .await?;
    Ok(Json(export(&record)).into_response())
}

async fn cancel_job_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CancelJobResponse>> {
    let id = JobId::new(id);
    let cancelled = state.dispatcher.cancel(&id).await?;
    let record = state.dispatcher.store().get(&id).await?;
    Ok(Json(CancelJobResponse {
        id: id.to_string(),
        cancelled,
        state: record.state,
    }))
}

/// Submit and wait in one request, bounded by the request ceiling.
///
/// A failed compilation answers `422` with the job's error; a job still
/// running at the ceiling answers `408` and can be polled by id.
async fn transpile_handler(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let (circuit, constraints) = parse_submission(&body)?;
    let id = state.dispatcher.submit(circuit, constraints).await?;
    let record = state
        .dispatcher
        .await_result(&id, state.request_timeout)
        .await?;

    let status = match record.state {
        JobState::Succeeded => StatusCode::OK,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    Ok((status, Json(export(&record))).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (Error::MalformedCircuit("x".into()), StatusCode::BAD_REQUEST),
            (Error::JobNotFound("x".into()), StatusCode::NOT_FOUND),
            (
                Error::Timeout {
                    id: "x".into(),
                    waited: Duration::from_millis(1),
                },
                StatusCode::REQUEST_TIMEOUT,
            ),
            (
                Error::StorageError("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_parse_submission_rejects_out_of_range_qubit() {
        let body = serde_json::json!({
            "circuit": {
                "format_version": 1,
                "num_qubits": 1,
                "operations": [{"op": "h", "qubits": [3]}]
            },
            "constraints": {"backend": "ideal-simulator"}
        });
        let err = parse_submission(&serde_json::to_vec(&body).unwrap()).unwrap_err();
        assert!(matches!(err, Error::MalformedCircuit(_)));
    }

    #[test]
    fn test_parse_submission_requires_constraints() {
        let body = br#"{"circuit": {"format_version": 1, "num_qubits": 1, "operations": []}}"#;
        let err = parse_submission(body).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
