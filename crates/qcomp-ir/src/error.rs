//! Error types for the IR crate.

use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Errors that can occur while building, parsing or serializing circuits.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Serialized input could not be turned into a valid circuit.
    #[error("Malformed circuit: {0}")]
    MalformedCircuit(String),

    /// Qubit index outside `[0, num_qubits)`.
    #[error("Qubit {qubit} out of range for circuit with {num_qubits} qubits{}", format_gate_context(.gate_name))]
    QubitOutOfRange {
        /// The offending qubit.
        qubit: QubitId,
        /// Size of the circuit's qubit index space.
        num_qubits: u32,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Classical bit index outside `[0, num_clbits)`.
    #[error("Classical bit {clbit} out of range for circuit with {num_clbits} bits")]
    ClbitOutOfRange {
        /// The offending classical bit.
        clbit: ClbitId,
        /// Size of the circuit's classical index space.
        num_clbits: u32,
    },

    /// Gate name is not part of the supported gate set.
    #[error("Unknown gate kind '{0}'")]
    UnknownGate(String),

    /// Gate applied to the wrong number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Gate given the wrong number of parameters.
    #[error("Gate '{gate_name}' takes {expected} parameters, got {got}")]
    ParamCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of parameters.
        expected: usize,
        /// Actual number of parameters provided.
        got: usize,
    },

    /// NaN or infinite gate parameter.
    #[error("Gate '{gate_name}' has a non-finite parameter")]
    NonFiniteParameter {
        /// Name of the gate.
        gate_name: String,
    },

    /// Duplicate qubit in operation.
    #[error("Duplicate qubit {qubit} in operation{}", format_gate_context(.gate_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Measurement operands do not pair up one qubit per classical bit.
    #[error("Measure needs one classical bit per qubit, got {qubits} qubits and {clbits} bits")]
    MeasureArity {
        /// Number of measured qubits.
        qubits: usize,
        /// Number of target classical bits.
        clbits: usize,
    },

    /// Classical register that cannot be added to the circuit.
    #[error("Invalid classical register '{name}': {reason}")]
    InvalidRegister {
        /// Requested register name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Serialization to the wire format failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

impl IrError {
    /// Whether this error is a client input problem rather than an internal fault.
    pub fn is_malformed_input(&self) -> bool {
        !matches!(self, IrError::Serialization(_))
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
