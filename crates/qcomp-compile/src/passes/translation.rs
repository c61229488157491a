//! Rewriting into the target basis.
//!
//! Two-qubit gates are first expanded into CX plus single-qubit gates, CX is
//! then rendered with whichever entangler the basis has, and single-qubit
//! gates go through their U(θ, φ, λ) form into the basis family available.
//! Equivalence is up to global phase.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use qcomp_ir::{Circuit, Gate, Operation, OperationKind, QubitId};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::passes::decompose::decompose_three_qubit;
use crate::property::{BasisGates, PropertySet};

const EPS: f64 = 1e-12;

/// Rewrites every gate outside the basis.
pub struct BasisTranslation;

impl Pass for BasisTranslation {
    fn name(&self) -> &str {
        "BasisTranslation"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn should_run(&self, circuit: &Circuit, properties: &PropertySet) -> bool {
        circuit
            .operations()
            .iter()
            .filter_map(Operation::as_gate)
            .any(|g| !properties.basis_gates.contains(g.name()))
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        let basis = &properties.basis_gates;
        let mut ops = Vec::with_capacity(circuit.len() * 2);
        for op in circuit.operations() {
            match op.kind {
                OperationKind::Gate(gate) => translate_gate(gate, &op.qubits, basis, &mut ops)?,
                _ => ops.push(op.clone()),
            }
        }
        *circuit = super::rebuild(circuit, circuit.num_qubits(), ops)?;
        Ok(())
    }
}

fn unsupported(gate: &Gate, basis: &BasisGates) -> CompileError {
    CompileError::Unsatisfiable(format!(
        "gate '{}' cannot be expressed in basis {basis}",
        gate.name()
    ))
}

fn translate_gate(
    gate: Gate,
    qubits: &[QubitId],
    basis: &BasisGates,
    out: &mut Vec<Operation>,
) -> CompileResult<()> {
    if basis.contains(gate.name()) {
        out.push(Operation::gate(gate, qubits.iter().copied()));
        return Ok(());
    }
    match qubits {
        [q] => translate_1q(gate, *q, basis, out),
        [a, b] => translate_2q(gate, *a, *b, basis, out),
        _ => {
            for op in decompose_three_qubit(&gate, qubits) {
                if let OperationKind::Gate(inner) = op.kind {
                    if inner.num_qubits() > 2 {
                        return Err(unsupported(&gate, basis));
                    }
                    translate_gate(inner, &op.qubits, basis, out)?;
                }
            }
            Ok(())
        }
    }
}

fn translate_2q(
    gate: Gate,
    a: QubitId,
    b: QubitId,
    basis: &BasisGates,
    out: &mut Vec<Operation>,
) -> CompileResult<()> {
    if gate == Gate::CX {
        return if basis.contains("cz") {
            translate_gate(Gate::H, &[b], basis, out)?;
            out.push(Operation::gate(Gate::CZ, [a, b]));
            translate_gate(Gate::H, &[b], basis, out)
        } else {
            Err(unsupported(&gate, basis))
        };
    }

    let one = |g: Gate, q: QubitId| (g, vec![q]);
    let cx = |c: QubitId, t: QubitId| (Gate::CX, vec![c, t]);
    let seq: Vec<(Gate, Vec<QubitId>)> = match gate {
        Gate::CY => vec![one(Gate::Sdg, b), cx(a, b), one(Gate::S, b)],
        Gate::CZ => vec![one(Gate::H, b), cx(a, b), one(Gate::H, b)],
        Gate::CH => vec![
            one(Gate::S, b),
            one(Gate::H, b),
            one(Gate::T, b),
            cx(a, b),
            one(Gate::Tdg, b),
            one(Gate::H, b),
            one(Gate::Sdg, b),
        ],
        Gate::Swap => vec![cx(a, b), cx(b, a), cx(a, b)],
        Gate::CRz(lambda) => vec![
            one(Gate::Rz(lambda / 2.0), b),
            cx(a, b),
            one(Gate::Rz(-lambda / 2.0), b),
            cx(a, b),
        ],
        Gate::CP(lambda) => vec![
            one(Gate::P(lambda / 2.0), a),
            cx(a, b),
            one(Gate::P(-lambda / 2.0), b),
            cx(a, b),
            one(Gate::P(lambda / 2.0), b),
        ],
        Gate::Rzz(theta) => vec![cx(a, b), one(Gate::Rz(theta), b), cx(a, b)],
        _ => return Err(unsupported(&gate, basis)),
    };

    for (g, qs) in seq {
        translate_gate(g, &qs, basis, out)?;
    }
    Ok(())
}

/// U(θ, φ, λ) angles equal to a single-qubit gate up to global phase.
pub fn to_u_angles(gate: &Gate) -> Option<(f64, f64, f64)> {
    let angles = match *gate {
        Gate::I => (0.0, 0.0, 0.0),
        Gate::X => (PI, 0.0, PI),
        Gate::Y => (PI, FRAC_PI_2, FRAC_PI_2),
        Gate::Z => (0.0, 0.0, PI),
        Gate::H => (FRAC_PI_2, 0.0, PI),
        Gate::S => (0.0, 0.0, FRAC_PI_2),
        Gate::Sdg => (0.0, 0.0, -FRAC_PI_2),
        Gate::T => (0.0, 0.0, FRAC_PI_4),
        Gate::Tdg => (0.0, 0.0, -FRAC_PI_4),
        Gate::SX => (FRAC_PI_2, -FRAC_PI_2, FRAC_PI_2),
        Gate::SXdg => (FRAC_PI_2, FRAC_PI_2, -FRAC_PI_2),
        Gate::Rx(theta) => (theta, -FRAC_PI_2, FRAC_PI_2),
        Gate::Ry(theta) => (theta, 0.0, 0.0),
        Gate::Rz(theta) | Gate::P(theta) => (0.0, 0.0, theta),
        Gate::U(theta, phi, lambda) => (theta, phi, lambda),
        Gate::Prx(theta, phi) => (theta, phi - FRAC_PI_2, FRAC_PI_2 - phi),
        _ => return None,
    };
    Some(angles)
}

/// Wrap an angle into `(-π, π]`.
pub(crate) fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(2.0 * PI);
    if wrapped > PI { wrapped - 2.0 * PI } else { wrapped }
}

fn is_zero_angle(angle: f64) -> bool {
    normalize_angle(angle).abs() < EPS
}

fn translate_1q(
    gate: Gate,
    q: QubitId,
    basis: &BasisGates,
    out: &mut Vec<Operation>,
) -> CompileResult<()> {
    if gate == Gate::I {
        return Ok(());
    }
    let (theta, phi, lambda) = to_u_angles(&gate).ok_or_else(|| unsupported(&gate, basis))?;
    let mut emit = |g: Gate| out.push(Operation::gate(g, [q]));

    if theta.abs() < EPS {
        // Pure phase: diag(1, e^{i(φ+λ)}).
        let alpha = phi + lambda;
        if is_zero_angle(alpha) {
            return Ok(());
        }
        if basis.contains("rz") {
            emit(Gate::Rz(alpha));
            return Ok(());
        }
        if basis.contains("p") {
            emit(Gate::P(alpha));
            return Ok(());
        }
    }

    if basis.contains("u") {
        emit(Gate::U(theta, phi, lambda));
    } else if basis.contains("rz") && basis.contains("sx") {
        emit(Gate::Rz(lambda));
        emit(Gate::SX);
        emit(Gate::Rz(theta + PI));
        emit(Gate::SX);
        emit(Gate::Rz(phi + PI));
    } else if basis.contains("prx") {
        if theta.abs() >= EPS {
            emit(Gate::Prx(theta, FRAC_PI_2 - lambda));
        }
        let alpha = phi + lambda;
        if !is_zero_angle(alpha) {
            if basis.contains("rz") {
                emit(Gate::Rz(alpha));
            } else {
                emit(Gate::Prx(PI, 0.0));
                emit(Gate::Prx(PI, alpha / 2.0));
            }
        }
    } else if basis.contains("rz") && basis.contains("ry") {
        emit(Gate::Rz(lambda));
        emit(Gate::Ry(theta));
        emit(Gate::Rz(phi));
    } else {
        return Err(unsupported(&gate, basis));
    }
    Ok(())
}
