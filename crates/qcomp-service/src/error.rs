//! Error types for the compilation job service.

use std::time::Duration;

use qcomp_compile::CompileError;
use qcomp_ir::IrError;
use thiserror::Error;

use crate::job::JobState;

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the service.
///
/// Compilation failures are not represented here: they are captured into the
/// job record as a [`crate::job::JobError`] and never cross the dispatcher.
#[derive(Debug, Error)]
pub enum Error {
    /// The submitted circuit could not be parsed or validated.
    #[error("Malformed circuit: {0}")]
    MalformedCircuit(String),

    /// The constraint set is structurally invalid.
    #[error("Invalid constraints: {0}")]
    InvalidConstraints(String),

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// A state change the job state machine does not allow.
    #[error("Invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: JobState,
        to: JobState,
    },

    /// The caller stopped waiting; the job itself may still be running.
    #[error("Timed out after {waited:?} waiting for job {id}")]
    Timeout { id: String, waited: Duration },

    /// A request parameter could not be interpreted.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The dispatcher no longer accepts work.
    #[error("Dispatcher is shutting down")]
    ShuttingDown,

    /// JSON encoding of a stored record failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Storage error.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code for the error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::MalformedCircuit(_) => "MalformedCircuit",
            Error::InvalidConstraints(_) => "InvalidConstraints",
            Error::JobNotFound(_) => "JobNotFound",
            Error::InvalidTransition { .. } => "InvalidTransition",
            Error::Timeout { .. } => "Timeout",
            Error::InvalidArgument(_) => "InvalidArgument",
            Error::ShuttingDown => "ShuttingDown",
            Error::Json(_) | Error::StorageError(_) => "StorageError",
            Error::Internal(_) => "Internal",
        }
    }

    /// Whether the error was caused by the client's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedCircuit(_) | Error::InvalidConstraints(_) | Error::InvalidArgument(_)
        )
    }
}

impl From<IrError> for Error {
    fn from(err: IrError) -> Self {
        if err.is_malformed_input() {
            Error::MalformedCircuit(err.to_string())
        } else {
            Error::Internal(err.to_string())
        }
    }
}

impl From<CompileError> for Error {
    fn from(err: CompileError) -> Self {
        match err {
            CompileError::InvalidConstraints(msg) => Error::InvalidConstraints(msg),
            other => Error::Internal(other.to_string()),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::StorageError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(Error::JobNotFound("x".into()).code(), "JobNotFound");
        assert_eq!(
            Error::Timeout {
                id: "x".into(),
                waited: Duration::from_millis(5)
            }
            .code(),
            "Timeout"
        );
        assert_eq!(Error::StorageError("disk".into()).code(), "StorageError");
    }

    #[test]
    fn test_invalid_constraints_survive_conversion() {
        let err: Error = CompileError::InvalidConstraints("level 9".into()).into();
        assert!(matches!(err, Error::InvalidConstraints(ref m) if m == "level 9"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_parse_error_is_malformed_circuit() {
        let err: Error = qcomp_ir::parse(b"not json").unwrap_err().into();
        assert!(matches!(err, Error::MalformedCircuit(_)));
    }
}
