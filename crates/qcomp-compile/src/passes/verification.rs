//! Final check that the output runs on the target.

use qcomp_ir::Circuit;

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Rejects any output that uses a gate outside the basis, a qubit beyond the
/// target, or a multi-qubit gate on an uncoupled pair.
///
/// A failure here is a compiler bug, reported as [`CompileError::Internal`].
pub struct VerifyTarget;

impl Pass for VerifyTarget {
    fn name(&self) -> &str {
        "VerifyTarget"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        if circuit.num_qubits() > properties.num_physical_qubits {
            return Err(CompileError::Internal(format!(
                "compiled circuit uses {} qubits, target has {}",
                circuit.num_qubits(),
                properties.num_physical_qubits
            )));
        }
        for (index, op) in circuit.operations().iter().enumerate() {
            let Some(gate) = op.as_gate() else {
                continue;
            };
            if !properties.basis_gates.contains(gate.name()) {
                return Err(CompileError::Internal(format!(
                    "operation {index}: gate '{}' is outside basis {}",
                    gate.name(),
                    properties.basis_gates
                )));
            }
            for (i, a) in op.qubits.iter().enumerate() {
                for b in &op.qubits[i + 1..] {
                    if !properties.allows_interaction(a.0, b.0) {
                        return Err(CompileError::Internal(format!(
                            "operation {index}: '{}' on uncoupled qubits {a} and {b}",
                            gate.name()
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
