//! SWAP insertion for restricted connectivity.

use qcomp_ir::{Circuit, Gate, Operation, QubitId};
use tracing::trace;

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{Layout, PropertySet};

/// Greedy shortest-path router.
///
/// For every two-qubit gate whose operands are not adjacent, the first operand
/// is swapped along a shortest path until it neighbours the second. Output
/// operations address physical qubits, so the circuit may widen to cover
/// physical qubits the path passes through.
pub struct BasicRouting;

impl Pass for BasicRouting {
    fn name(&self) -> &str {
        "BasicRouting"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn should_run(&self, _circuit: &Circuit, properties: &PropertySet) -> bool {
        properties.coupling_map.is_some()
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        let Some(coupling) = properties.coupling_map.as_ref() else {
            return Ok(());
        };
        let mut layout = properties
            .layout
            .clone()
            .ok_or_else(|| CompileError::Internal("routing requires a layout".into()))?;

        let physical = |layout: &Layout, q: QubitId| {
            layout
                .physical(q.0)
                .map(QubitId)
                .ok_or_else(|| CompileError::Internal(format!("{q} has no physical placement")))
        };

        let mut ops = Vec::with_capacity(circuit.len());
        let mut swaps = 0usize;
        for op in circuit.operations() {
            if op.is_gate() && op.qubits.len() == 2 {
                let p0 = physical(&layout, op.qubits[0])?.0;
                let p1 = physical(&layout, op.qubits[1])?.0;
                if !coupling.is_adjacent(p0, p1) {
                    let path = coupling.shortest_path(p0, p1).ok_or_else(|| {
                        CompileError::Unsatisfiable(format!(
                            "physical qubits {p0} and {p1} are not connected"
                        ))
                    })?;
                    for hop in path.windows(2).take(path.len().saturating_sub(2)) {
                        ops.push(Operation::gate(Gate::Swap, [QubitId(hop[0]), QubitId(hop[1])]));
                        layout.swap_physical(hop[0], hop[1]);
                        swaps += 1;
                    }
                }
            } else if op.qubits.len() > 2 && op.is_gate() {
                return Err(CompileError::Internal(format!(
                    "cannot route {}-qubit gate '{}'",
                    op.qubits.len(),
                    op.name()
                )));
            }

            let mut mapped = op.clone();
            for q in &mut mapped.qubits {
                *q = physical(&layout, *q)?;
            }
            ops.push(mapped);
        }

        let width = ops
            .iter()
            .flat_map(|op| op.qubits.iter())
            .map(|q| q.0 + 1)
            .max()
            .unwrap_or(0)
            .max(circuit.num_qubits());
        trace!(swaps, width, "routing finished");

        *circuit = super::rebuild(circuit, width, ops)?;
        properties.final_layout = Some(layout);
        Ok(())
    }
}
