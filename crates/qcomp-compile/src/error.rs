//! Error types for compilation.

use std::time::Duration;

use qcomp_ir::IrError;
use thiserror::Error;

/// Errors produced by compilation backends and passes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// No backend registered under this identifier.
    #[error("Unsupported backend '{0}'")]
    UnsupportedBackend(String),

    /// The circuit needs more qubits than the target provides.
    #[error("Circuit requires {required} qubits but the target provides {available}")]
    CircuitTooLarge {
        /// Qubits the circuit uses.
        required: u32,
        /// Qubits the target has.
        available: u32,
    },

    /// The circuit cannot be mapped onto the requested gate set or topology.
    #[error("Unsatisfiable constraints: {0}")]
    Unsatisfiable(String),

    /// The constraint set itself is invalid.
    #[error("Invalid constraints: {0}")]
    InvalidConstraints(String),

    /// Compilation ran past its wall-clock budget.
    #[error("Compilation exceeded its budget of {budget:?}")]
    Timeout {
        /// The budget that was exceeded.
        budget: Duration,
    },

    /// Unexpected failure inside the compiler.
    #[error("Internal compiler error: {0}")]
    Internal(String),

    /// Circuit construction failed while rewriting.
    #[error("IR error: {0}")]
    Ir(#[from] IrError),
}

impl CompileError {
    /// Whether the failure means the circuit cannot be compiled for the target.
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(
            self,
            CompileError::CircuitTooLarge { .. } | CompileError::Unsatisfiable(_)
        )
    }
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
