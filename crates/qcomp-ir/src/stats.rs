//! Circuit statistics reported alongside compiled results.

use serde::{Deserialize, Serialize};

use crate::circuit::Circuit;
use crate::operation::OperationKind;

/// Size and depth figures for a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CircuitStats {
    /// Number of qubits.
    pub width: u32,
    /// Longest chain of dependent operations. Barriers synchronise but add nothing.
    pub depth: u32,
    /// Number of unitary gates.
    #[serde(rename = "number-of-gates")]
    pub gate_count: u32,
    /// Number of gates acting on two or more qubits.
    #[serde(rename = "number-of-multi-qubit-gates")]
    pub multi_qubit_gate_count: u32,
    /// Depth counting only multi-qubit gates.
    #[serde(rename = "multi-qubit-gate-depth")]
    pub multi_qubit_gate_depth: u32,
}

impl CircuitStats {
    /// Compute statistics for `circuit`.
    pub fn compute(circuit: &Circuit) -> Self {
        let n = circuit.num_qubits() as usize;
        let mut levels = vec![0u32; n];
        let mut mq_levels = vec![0u32; n];
        let mut stats = CircuitStats {
            width: circuit.num_qubits(),
            ..Default::default()
        };

        for op in circuit.operations() {
            let qubits: Vec<usize> = op.qubits.iter().map(|q| q.0 as usize).collect();
            let front = qubits.iter().map(|&q| levels[q]).max().unwrap_or(0);
            let mq_front = qubits.iter().map(|&q| mq_levels[q]).max().unwrap_or(0);

            let (level, mq_level) = match op.kind {
                OperationKind::Barrier => (front, mq_front),
                OperationKind::Gate(_) if qubits.len() >= 2 => {
                    stats.gate_count += 1;
                    stats.multi_qubit_gate_count += 1;
                    (front + 1, mq_front + 1)
                }
                OperationKind::Gate(_) => {
                    stats.gate_count += 1;
                    (front + 1, mq_front)
                }
                OperationKind::Measure | OperationKind::Reset => (front + 1, mq_front),
            };
            for &q in &qubits {
                levels[q] = level;
                mq_levels[q] = mq_level;
            }
        }

        stats.depth = levels.into_iter().max().unwrap_or(0);
        stats.multi_qubit_gate_depth = mq_levels.into_iter().max().unwrap_or(0);
        stats
    }
}
