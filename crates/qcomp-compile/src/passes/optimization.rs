//! Peephole optimizations.

use std::f64::consts::PI;

use qcomp_ir::{Circuit, Gate, Operation};

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::passes::translation::normalize_angle;
use crate::property::PropertySet;

const EPS: f64 = 1e-12;

/// Output buffer that tracks, per qubit, the stack of surviving operations.
///
/// The top of a qubit's stack is the operation an incoming gate would sit
/// directly after, so removing a pair re-exposes the operation before it.
struct Peephole {
    ops: Vec<Option<Operation>>,
    stacks: Vec<Vec<usize>>,
}

impl Peephole {
    fn new(num_qubits: u32) -> Self {
        Self {
            ops: Vec::new(),
            stacks: vec![Vec::new(); num_qubits as usize],
        }
    }

    /// Index of the operation directly preceding `op` on all of its qubits.
    fn predecessor(&self, op: &Operation) -> Option<usize> {
        let first = op.qubits.first()?;
        let top = *self.stacks[first.0 as usize].last()?;
        let prev = self.ops[top].as_ref()?;
        let shared = op
            .qubits
            .iter()
            .all(|q| self.stacks[q.0 as usize].last() == Some(&top));
        (shared && prev.qubits.len() == op.qubits.len()).then_some(top)
    }

    fn push(&mut self, op: Operation) {
        let idx = self.ops.len();
        for q in &op.qubits {
            self.stacks[q.0 as usize].push(idx);
        }
        self.ops.push(Some(op));
    }

    fn remove(&mut self, idx: usize) {
        if let Some(op) = self.ops[idx].take() {
            for q in &op.qubits {
                self.stacks[q.0 as usize].pop();
            }
        }
    }

    fn finish(self) -> impl Iterator<Item = Operation> {
        self.ops.into_iter().flatten()
    }
}

fn same_operands(a: &Operation, b: &Operation, symmetric: bool) -> bool {
    a.qubits == b.qubits
        || (symmetric && a.qubits.len() == 2 && a.qubits[0] == b.qubits[1] && a.qubits[1] == b.qubits[0])
}

fn are_inverse(a: &Operation, b: &Operation) -> bool {
    let (Some(ga), Some(gb)) = (a.as_gate(), b.as_gate()) else {
        return false;
    };
    let pair = match (ga, gb) {
        (Gate::S, Gate::Sdg) | (Gate::Sdg, Gate::S) => true,
        (Gate::T, Gate::Tdg) | (Gate::Tdg, Gate::T) => true,
        (Gate::SX, Gate::SXdg) | (Gate::SXdg, Gate::SX) => true,
        (x, y) if x == y => matches!(
            x,
            Gate::X
                | Gate::Y
                | Gate::Z
                | Gate::H
                | Gate::CX
                | Gate::CY
                | Gate::CZ
                | Gate::CH
                | Gate::Swap
                | Gate::CCX
                | Gate::CSwap
        ),
        _ => false,
    };
    pair && same_operands(a, b, ga.is_symmetric())
}

/// Removes adjacent gate pairs that multiply to identity.
///
/// Handles self-inverse gates (`x x`, `cx cx`, ...) and dagger pairs
/// (`s sdg`, `t tdg`, `sx sxdg`). Cancellation cascades, so `h x x h`
/// disappears entirely.
pub struct CancelInverses;

impl Pass for CancelInverses {
    fn name(&self) -> &str {
        "CancelInverses"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit, _properties: &mut PropertySet) -> CompileResult<()> {
        let mut peephole = Peephole::new(circuit.num_qubits());
        for op in circuit.operations() {
            if op.is_gate() {
                if let Some(prev) = peephole.predecessor(op) {
                    if peephole.ops[prev].as_ref().is_some_and(|p| are_inverse(p, op)) {
                        peephole.remove(prev);
                        continue;
                    }
                }
            }
            peephole.push(op.clone());
        }
        *circuit = super::rebuild(circuit, circuit.num_qubits(), peephole.finish())?;
        Ok(())
    }
}

/// Combine two adjacent gates of the same rotation family.
fn merge(a: &Operation, b: &Operation) -> Option<Gate> {
    let (ga, gb) = (a.as_gate()?, b.as_gate()?);
    if !same_operands(a, b, ga.is_symmetric()) {
        return None;
    }
    match (*ga, *gb) {
        (Gate::Rx(x), Gate::Rx(y)) => Some(Gate::Rx(normalize_angle(x + y))),
        (Gate::Ry(x), Gate::Ry(y)) => Some(Gate::Ry(normalize_angle(x + y))),
        (Gate::Rz(x), Gate::Rz(y)) => Some(Gate::Rz(normalize_angle(x + y))),
        (Gate::P(x), Gate::P(y)) => Some(Gate::P(normalize_angle(x + y))),
        (Gate::Rzz(x), Gate::Rzz(y)) => Some(Gate::Rzz(normalize_angle(x + y))),
        (Gate::CP(x), Gate::CP(y)) => Some(Gate::CP(normalize_angle(x + y))),
        (Gate::CRz(x), Gate::CRz(y)) => Some(Gate::CRz(normalize_angle_4pi(x + y))),
        (Gate::Prx(x, phi1), Gate::Prx(y, phi2)) if (phi1 - phi2).abs() < EPS => {
            Some(Gate::Prx(normalize_angle(x + y), phi1))
        }
        _ => None,
    }
}

/// CRz has period 4π: CRz(2π) is a Z on the control.
fn normalize_angle_4pi(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(4.0 * PI);
    if wrapped > 2.0 * PI { wrapped - 4.0 * PI } else { wrapped }
}

/// Whether a gate is the identity up to global phase.
fn is_identity(gate: &Gate) -> bool {
    match *gate {
        Gate::I => true,
        Gate::Rx(a) | Gate::Ry(a) | Gate::Rz(a) | Gate::P(a) | Gate::Rzz(a) | Gate::CP(a) => {
            normalize_angle(a).abs() < EPS
        }
        Gate::CRz(a) => normalize_angle_4pi(a).abs() < EPS,
        Gate::Prx(theta, _) => normalize_angle(theta).abs() < EPS,
        Gate::U(theta, phi, lambda) => theta.abs() < EPS && normalize_angle(phi + lambda).abs() < EPS,
        _ => false,
    }
}

/// Folds adjacent same-axis rotations into one and drops identities.
pub struct MergeRotations;

impl Pass for MergeRotations {
    fn name(&self) -> &str {
        "MergeRotations"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit, _properties: &mut PropertySet) -> CompileResult<()> {
        let mut peephole = Peephole::new(circuit.num_qubits());
        for op in circuit.operations() {
            let Some(gate) = op.as_gate() else {
                peephole.push(op.clone());
                continue;
            };
            if is_identity(gate) {
                continue;
            }
            let merged = peephole
                .predecessor(op)
                .and_then(|prev| Some((prev, merge(peephole.ops[prev].as_ref()?, op)?)));
            match merged {
                Some((prev, gate)) => {
                    let qubits = peephole.ops[prev]
                        .as_ref()
                        .map(|p| p.qubits.clone())
                        .unwrap_or_default();
                    peephole.remove(prev);
                    if !is_identity(&gate) {
                        peephole.push(Operation::gate(gate, qubits));
                    }
                }
                None => peephole.push(op.clone()),
            }
        }
        *circuit = super::rebuild(circuit, circuit.num_qubits(), peephole.finish())?;
        Ok(())
    }
}

/// Repeats a group of passes until the operation count stops shrinking.
pub struct FixedPoint {
    passes: Vec<Box<dyn Pass>>,
    max_iterations: usize,
}

impl FixedPoint {
    /// Wrap `passes`, iterating at most 16 times.
    pub fn new(passes: Vec<Box<dyn Pass>>) -> Self {
        Self {
            passes,
            max_iterations: 16,
        }
    }
}

impl Pass for FixedPoint {
    fn name(&self) -> &str {
        "FixedPoint"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        for _ in 0..self.max_iterations {
            let before = circuit.len();
            for pass in &self.passes {
                if pass.should_run(circuit, properties) {
                    pass.run(circuit, properties)?;
                }
            }
            if circuit.len() >= before {
                break;
            }
        }
        Ok(())
    }
}
