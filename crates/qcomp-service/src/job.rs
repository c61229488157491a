//! Job records and the job state machine.
//!
//! ```text
//! Submitted ──> Queued ──> Running ──> Succeeded
//!     │            │           └─────> Failed
//!     └────────────┴─────────────────> Cancelled
//! ```
//!
//! `Succeeded`, `Failed` and `Cancelled` are terminal.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use qcomp_compile::{CompilationConstraints, CompileError};
use qcomp_ir::Circuit;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Version of the persisted [`JobRecord`] layout.
///
/// Bump when a field changes meaning. Adding an optional field does not
/// require a bump: unknown fields are ignored and missing ones default.
pub const RECORD_VERSION: u32 = 1;

/// Opaque job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Submitted,
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    /// Every state, in lifecycle order.
    pub const ALL: [JobState; 6] = [
        JobState::Submitted,
        JobState::Queued,
        JobState::Running,
        JobState::Succeeded,
        JobState::Failed,
        JobState::Cancelled,
    ];

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled
        )
    }

    /// Whether the state machine has an edge from `self` to `next`.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Submitted, Queued)
                | (Queued, Running)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Submitted, Cancelled)
                | (Queued, Cancelled)
        )
    }

    /// Canonical lowercase name, shared by storage and the HTTP API.
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Submitted => "submitted",
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        JobState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidArgument(format!("unknown job state '{s}'")))
    }
}

/// Kind of a terminal job failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnsupportedBackend,
    UnsatisfiableConstraints,
    CompilationTimeout,
    InternalCompilerError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnsupportedBackend => "UnsupportedBackend",
            ErrorKind::UnsatisfiableConstraints => "UnsatisfiableConstraints",
            ErrorKind::CompilationTimeout => "CompilationTimeout",
            ErrorKind::InternalCompilerError => "InternalCompilerError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&CompileError> for ErrorKind {
    fn from(err: &CompileError) -> Self {
        match err {
            CompileError::UnsupportedBackend(_) => ErrorKind::UnsupportedBackend,
            CompileError::CircuitTooLarge { .. }
            | CompileError::Unsatisfiable(_)
            | CompileError::InvalidConstraints(_) => ErrorKind::UnsatisfiableConstraints,
            CompileError::Timeout { .. } => ErrorKind::CompilationTimeout,
            _ => ErrorKind::InternalCompilerError,
        }
    }
}

/// Structured failure stored on a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalCompilerError, message)
    }
}

impl From<&CompileError> for JobError {
    fn from(err: &CompileError) -> Self {
        Self::new(ErrorKind::from(err), err.to_string())
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A state change together with the payload it attaches.
#[derive(Debug, Clone)]
pub enum Transition {
    Queue,
    Start,
    Succeed(Circuit),
    Fail(JobError),
    Cancel,
}

impl Transition {
    /// State the job is in after the transition.
    pub fn target(&self) -> JobState {
        match self {
            Transition::Queue => JobState::Queued,
            Transition::Start => JobState::Running,
            Transition::Succeed(_) => JobState::Succeeded,
            Transition::Fail(_) => JobState::Failed,
            Transition::Cancel => JobState::Cancelled,
        }
    }
}

fn default_record_version() -> u32 {
    RECORD_VERSION
}

/// Persisted job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default = "default_record_version")]
    pub record_version: u32,
    pub id: JobId,
    pub circuit: Circuit,
    pub constraints: CompilationConstraints,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Circuit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl JobRecord {
    /// New record in the `Submitted` state.
    pub fn new(id: JobId, circuit: Circuit, constraints: CompilationConstraints) -> Self {
        Self {
            record_version: RECORD_VERSION,
            id,
            circuit,
            constraints,
            state: JobState::Submitted,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
        }
    }

    pub fn backend(&self) -> &str {
        &self.constraints.backend
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply a transition, stamping `now` on the timestamp it affects.
    ///
    /// On error the record is unchanged.
    pub fn apply(&mut self, transition: Transition, now: DateTime<Utc>) -> Result<()> {
        let to = transition.target();
        if !self.state.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                id: self.id.to_string(),
                from: self.state,
                to,
            });
        }

        match transition {
            Transition::Queue => {}
            Transition::Start => self.started_at = Some(now),
            Transition::Succeed(circuit) => self.result = Some(circuit),
            Transition::Fail(error) => self.error = Some(error),
            Transition::Cancel => {}
        }
        if to.is_terminal() {
            self.finished_at = Some(now);
        }
        self.state = to;
        Ok(())
    }
}
