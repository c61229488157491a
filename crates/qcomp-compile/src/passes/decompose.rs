//! Three-qubit gate decomposition.

use qcomp_ir::{Circuit, Gate, Operation, QubitId};

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Rewrites CCX and CSWAP into one- and two-qubit gates.
///
/// Runs whenever the target lacks the gate or has restricted connectivity,
/// since routing only moves two qubits at a time.
pub struct DecomposeMultiQubit;

fn needs_decomposition(gate: &Gate, properties: &PropertySet) -> bool {
    gate.num_qubits() > 2
        && (properties.coupling_map.is_some() || !properties.basis_gates.contains(gate.name()))
}

impl Pass for DecomposeMultiQubit {
    fn name(&self) -> &str {
        "DecomposeMultiQubit"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn should_run(&self, circuit: &Circuit, properties: &PropertySet) -> bool {
        circuit
            .operations()
            .iter()
            .filter_map(Operation::as_gate)
            .any(|g| needs_decomposition(g, properties))
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        let mut ops = Vec::with_capacity(circuit.len());
        for op in circuit.operations() {
            match op.as_gate() {
                Some(gate) if needs_decomposition(gate, properties) => {
                    ops.extend(decompose_three_qubit(gate, &op.qubits));
                }
                _ => ops.push(op.clone()),
            }
        }
        *circuit = super::rebuild(circuit, circuit.num_qubits(), ops)?;
        Ok(())
    }
}

/// Standard 6-CX Toffoli on controls `a`, `b` and target `c`.
fn toffoli(a: QubitId, b: QubitId, c: QubitId) -> Vec<Operation> {
    let g = |gate: Gate, qs: &[QubitId]| Operation::gate(gate, qs.iter().copied());
    vec![
        g(Gate::H, &[c]),
        g(Gate::CX, &[b, c]),
        g(Gate::Tdg, &[c]),
        g(Gate::CX, &[a, c]),
        g(Gate::T, &[c]),
        g(Gate::CX, &[b, c]),
        g(Gate::Tdg, &[c]),
        g(Gate::CX, &[a, c]),
        g(Gate::T, &[b]),
        g(Gate::T, &[c]),
        g(Gate::H, &[c]),
        g(Gate::CX, &[a, b]),
        g(Gate::T, &[a]),
        g(Gate::Tdg, &[b]),
        g(Gate::CX, &[a, b]),
    ]
}

pub(crate) fn decompose_three_qubit(gate: &Gate, qubits: &[QubitId]) -> Vec<Operation> {
    match (gate, qubits) {
        (Gate::CCX, &[a, b, c]) => toffoli(a, b, c),
        (Gate::CSwap, &[c, a, b]) => {
            let mut ops = vec![Operation::gate(Gate::CX, [b, a])];
            ops.extend(toffoli(c, a, b));
            ops.push(Operation::gate(Gate::CX, [b, a]));
            ops
        }
        _ => vec![Operation::gate(*gate, qubits.iter().copied())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{BasisGates, CouplingMap};

    #[test]
    fn test_ccx_expands_when_not_in_basis() {
        let mut circuit = Circuit::with_size("c", 3, 0);
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();
        let mut props = PropertySet::unconstrained(3)
            .with_target(None, BasisGates::new(["h", "t", "tdg", "cx"]));

        assert!(DecomposeMultiQubit.should_run(&circuit, &props));
        DecomposeMultiQubit.run(&mut circuit, &mut props).unwrap();
        assert_eq!(circuit.len(), 15);
        assert_eq!(circuit.stats().multi_qubit_gate_count, 6);
    }

    #[test]
    fn test_ccx_kept_on_ideal_target() {
        let mut circuit = Circuit::with_size("c", 3, 0);
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();
        let props = PropertySet::unconstrained(3);
        assert!(!DecomposeMultiQubit.should_run(&circuit, &props));
    }

    #[test]
    fn test_restricted_topology_forces_decomposition() {
        let mut circuit = Circuit::with_size("c", 3, 0);
        circuit
            .apply(Gate::CSwap, &[QubitId(0), QubitId(1), QubitId(2)])
            .unwrap();
        let mut props =
            PropertySet::unconstrained(3).with_target(Some(CouplingMap::linear(3)), BasisGates::all());
        DecomposeMultiQubit.run(&mut circuit, &mut props).unwrap();
        assert_eq!(circuit.len(), 17);
        assert!(circuit.operations().iter().all(|op| op.qubits.len() <= 2));
    }
}
