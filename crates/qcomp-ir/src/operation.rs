//! Circuit operations.

use crate::gate::Gate;
use crate::qubit::{ClbitId, QubitId};

/// What an operation does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperationKind {
    /// A unitary gate.
    Gate(Gate),
    /// Measure each qubit into the classical bit at the same position.
    Measure,
    /// Reset qubits to |0⟩.
    Reset,
    /// Scheduling barrier across the listed qubits.
    Barrier,
}

impl OperationKind {
    /// Wire and QASM name.
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Gate(g) => g.name(),
            OperationKind::Measure => "measure",
            OperationKind::Reset => "reset",
            OperationKind::Barrier => "barrier",
        }
    }
}

/// A single operation applied to concrete operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// The operation kind.
    pub kind: OperationKind,
    /// Qubit operands.
    pub qubits: Vec<QubitId>,
    /// Classical operands, only populated for measurements.
    pub clbits: Vec<ClbitId>,
}

impl Operation {
    /// A gate applied to the given qubits.
    pub fn gate(gate: Gate, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: OperationKind::Gate(gate),
            qubits: qubits.into_iter().collect(),
            clbits: Vec::new(),
        }
    }

    /// Measure `qubit` into `clbit`.
    pub fn measure(qubit: QubitId, clbit: ClbitId) -> Self {
        Self {
            kind: OperationKind::Measure,
            qubits: vec![qubit],
            clbits: vec![clbit],
        }
    }

    /// Reset a qubit.
    pub fn reset(qubit: QubitId) -> Self {
        Self {
            kind: OperationKind::Reset,
            qubits: vec![qubit],
            clbits: Vec::new(),
        }
    }

    /// Barrier over the given qubits.
    pub fn barrier(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: OperationKind::Barrier,
            qubits: qubits.into_iter().collect(),
            clbits: Vec::new(),
        }
    }

    /// The gate, if this is a gate operation.
    pub fn as_gate(&self) -> Option<&Gate> {
        match &self.kind {
            OperationKind::Gate(g) => Some(g),
            _ => None,
        }
    }

    /// Whether this is a unitary gate.
    pub fn is_gate(&self) -> bool {
        matches!(self.kind, OperationKind::Gate(_))
    }

    /// Whether this is a gate acting on two or more qubits.
    pub fn is_multi_qubit_gate(&self) -> bool {
        self.is_gate() && self.qubits.len() >= 2
    }

    /// Name of the operation.
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}
