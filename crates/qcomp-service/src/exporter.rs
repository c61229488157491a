//! Converts job records into the response contract.

use chrono::{DateTime, Utc};
use qcomp_ir::{Circuit, CircuitStats, to_qasm};
use serde::{Deserialize, Serialize};

use crate::job::{JobError, JobRecord, JobState};

/// Compiled output of a succeeded job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledPayload {
    pub circuit: Circuit,
    pub stats: CircuitStats,
    pub qasm: String,
}

/// Client-facing view of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: String,
    pub state: JobState,
    /// False while the job is still being processed.
    pub complete: bool,
    pub backend: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<CompiledPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

/// Map a job record to its response. Pure.
pub fn export(record: &JobRecord) -> JobResponse {
    let result = match (record.state, &record.result) {
        (JobState::Succeeded, Some(circuit)) => Some(CompiledPayload {
            circuit: circuit.clone(),
            stats: circuit.stats(),
            qasm: to_qasm(circuit),
        }),
        _ => None,
    };
    let error = match record.state {
        JobState::Failed => record.error.clone(),
        _ => None,
    };

    JobResponse {
        id: record.id.to_string(),
        state: record.state,
        complete: record.is_terminal(),
        backend: record.backend().to_string(),
        created_at: record.created_at,
        started_at: record.started_at,
        finished_at: record.finished_at,
        result,
        error,
    }
}
