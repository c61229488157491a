//! Compiled circuits must implement the same unitary as their input, up to
//! global phase and, after routing, the final qubit permutation.

use num_complex::Complex64;
use proptest::prelude::*;
use qcomp_compile::{
    BasisGates, CompilationConstraints, CompileBudget, CouplingMap, PassManagerBuilder, Target,
    BackendRegistry, IDEAL_SIMULATOR,
};
use qcomp_ir::{ALL_GATE_NAMES, Circuit, Gate, OperationKind, QubitId};
use std::f64::consts::PI;

type Matrix = Vec<Vec<Complex64>>;

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn expi(theta: f64) -> Complex64 {
    Complex64::from_polar(1.0, theta)
}

fn mat2(a: Complex64, b: Complex64, cc: Complex64, d: Complex64) -> Matrix {
    vec![vec![a, b], vec![cc, d]]
}

fn identity(dim: usize) -> Matrix {
    (0..dim)
        .map(|i| (0..dim).map(|j| if i == j { c(1.0, 0.0) } else { c(0.0, 0.0) }).collect())
        .collect()
}

fn controlled(u: &Matrix) -> Matrix {
    let mut m = identity(4);
    for i in 0..2 {
        for j in 0..2 {
            m[2 + i][2 + j] = u[i][j];
        }
    }
    m
}

fn permutation(dim: usize, swap: (usize, usize)) -> Matrix {
    let mut m = identity(dim);
    m.swap(swap.0, swap.1);
    m
}

/// Gate matrix with the first operand as the most significant local bit.
fn gate_matrix(gate: &Gate) -> Matrix {
    let zero = c(0.0, 0.0);
    let one = c(1.0, 0.0);
    let s = std::f64::consts::FRAC_1_SQRT_2;
    match *gate {
        Gate::I => identity(2),
        Gate::X => mat2(zero, one, one, zero),
        Gate::Y => mat2(zero, c(0.0, -1.0), c(0.0, 1.0), zero),
        Gate::Z => mat2(one, zero, zero, -one),
        Gate::H => mat2(c(s, 0.0), c(s, 0.0), c(s, 0.0), c(-s, 0.0)),
        Gate::S => mat2(one, zero, zero, c(0.0, 1.0)),
        Gate::Sdg => mat2(one, zero, zero, c(0.0, -1.0)),
        Gate::T => mat2(one, zero, zero, expi(PI / 4.0)),
        Gate::Tdg => mat2(one, zero, zero, expi(-PI / 4.0)),
        Gate::SX => mat2(c(0.5, 0.5), c(0.5, -0.5), c(0.5, -0.5), c(0.5, 0.5)),
        Gate::SXdg => mat2(c(0.5, -0.5), c(0.5, 0.5), c(0.5, 0.5), c(0.5, -0.5)),
        Gate::Rx(t) => {
            let (co, si) = ((t / 2.0).cos(), (t / 2.0).sin());
            mat2(c(co, 0.0), c(0.0, -si), c(0.0, -si), c(co, 0.0))
        }
        Gate::Ry(t) => {
            let (co, si) = ((t / 2.0).cos(), (t / 2.0).sin());
            mat2(c(co, 0.0), c(-si, 0.0), c(si, 0.0), c(co, 0.0))
        }
        Gate::Rz(t) => mat2(expi(-t / 2.0), zero, zero, expi(t / 2.0)),
        Gate::P(t) => mat2(one, zero, zero, expi(t)),
        Gate::U(t, p, l) => {
            let (co, si) = ((t / 2.0).cos(), (t / 2.0).sin());
            mat2(
                c(co, 0.0),
                -expi(l) * si,
                expi(p) * si,
                expi(p + l) * co,
            )
        }
        Gate::Prx(t, p) => {
            let (co, si) = ((t / 2.0).cos(), (t / 2.0).sin());
            mat2(
                c(co, 0.0),
                c(0.0, -1.0) * expi(-p) * si,
                c(0.0, -1.0) * expi(p) * si,
                c(co, 0.0),
            )
        }
        Gate::CX => controlled(&gate_matrix(&Gate::X)),
        Gate::CY => controlled(&gate_matrix(&Gate::Y)),
        Gate::CZ => controlled(&gate_matrix(&Gate::Z)),
        Gate::CH => controlled(&gate_matrix(&Gate::H)),
        Gate::CRz(t) => controlled(&gate_matrix(&Gate::Rz(t))),
        Gate::CP(t) => controlled(&gate_matrix(&Gate::P(t))),
        Gate::Swap => permutation(4, (1, 2)),
        Gate::Rzz(t) => {
            let mut m = identity(4);
            for (i, parity) in [0.0, 1.0, 1.0, 0.0].iter().enumerate() {
                m[i][i] = if *parity == 0.0 { expi(-t / 2.0) } else { expi(t / 2.0) };
            }
            m
        }
        Gate::CCX => permutation(8, (6, 7)),
        Gate::CSwap => permutation(8, (5, 6)),
    }
}

/// Apply one operation to a state vector. Qubit `q` is bit `q` of the index.
fn apply(state: &[Complex64], gate: &Gate, qubits: &[QubitId]) -> Vec<Complex64> {
    let m = gate_matrix(gate);
    let k = qubits.len();
    let mut out = vec![c(0.0, 0.0); state.len()];
    for (i, amp) in state.iter().enumerate() {
        if amp.norm() == 0.0 {
            continue;
        }
        let local: usize = qubits
            .iter()
            .enumerate()
            .map(|(pos, q)| ((i >> q.0) & 1) << (k - 1 - pos))
            .sum();
        for lo in 0..(1 << k) {
            let coeff = m[lo][local];
            if coeff.norm() == 0.0 {
                continue;
            }
            let mut j = i;
            for (pos, q) in qubits.iter().enumerate() {
                let bit = (lo >> (k - 1 - pos)) & 1;
                j = (j & !(1 << q.0)) | (bit << q.0);
            }
            out[j] += coeff * amp;
        }
    }
    out
}

/// Unitary of a measurement-free circuit, as a list of columns.
fn unitary(circuit: &Circuit) -> Matrix {
    let dim = 1usize << circuit.num_qubits();
    (0..dim)
        .map(|col| {
            let mut state = vec![c(0.0, 0.0); dim];
            state[col] = c(1.0, 0.0);
            for op in circuit.operations() {
                if let OperationKind::Gate(gate) = op.kind {
                    state = apply(&state, &gate, &op.qubits);
                }
            }
            state
        })
        .collect()
}

fn equal_up_to_phase(a: &Matrix, b: &Matrix) -> bool {
    let mut best = (0usize, 0usize, 0.0f64);
    for (i, col) in b.iter().enumerate() {
        for (j, v) in col.iter().enumerate() {
            if v.norm() > best.2 {
                best = (i, j, v.norm());
            }
        }
    }
    let phase = a[best.0][best.1] / b[best.0][best.1];
    if (phase.norm() - 1.0).abs() > 1e-9 {
        return false;
    }
    a.iter()
        .zip(b)
        .all(|(ca, cb)| ca.iter().zip(cb).all(|(x, y)| (x - phase * y).norm() < 1e-9))
}

fn bases() -> Vec<BasisGates> {
    vec![
        BasisGates::rz_sx_cx(),
        BasisGates::prx_cz(),
        BasisGates::new(["u", "cz"]),
        BasisGates::new(["rz", "ry", "cx"]),
    ]
}

fn compile_ideal(circuit: &Circuit, basis: &BasisGates, level: u8) -> Circuit {
    let registry = BackendRegistry::with_defaults();
    let constraints = CompilationConstraints::new(IDEAL_SIMULATOR, level)
        .with_basis_gates(basis.names().into_iter().map(str::to_string));
    registry
        .get(IDEAL_SIMULATOR)
        .unwrap()
        .compile(circuit, &constraints, &CompileBudget::unlimited())
        .unwrap()
}

#[test]
fn every_gate_translates_faithfully() {
    for name in ALL_GATE_NAMES {
        let n = Gate::param_count(name).unwrap();
        let params: Vec<f64> = [0.37, -1.21, 2.4][..n].to_vec();
        let gate = Gate::from_parts(name, &params).unwrap();
        let qubits: Vec<QubitId> = (0..gate.num_qubits()).map(QubitId).collect();
        let mut circuit = Circuit::with_size(*name, 3, 0);
        circuit.apply(gate, &qubits).unwrap();
        let expected = unitary(&circuit);

        for basis in bases() {
            for level in [0, 3] {
                let compiled = compile_ideal(&circuit, &basis, level);
                assert!(
                    equal_up_to_phase(&unitary(&compiled), &expected),
                    "{name} in {basis} at level {level}"
                );
            }
        }
    }
}

#[test]
fn routed_circuit_matches_up_to_final_permutation() {
    let mut circuit = Circuit::with_size("routed", 5, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit.cx(QubitId(0), QubitId(4)).unwrap();
    circuit.rz(0.3, QubitId(4)).unwrap();
    circuit.apply(Gate::CP(0.8), &[QubitId(1), QubitId(3)]).unwrap();
    circuit.cx(QubitId(4), QubitId(2)).unwrap();
    circuit.ry(1.1, QubitId(0)).unwrap();

    let target = Target::new(5, &BasisGates::rz_sx_cx(), &CouplingMap::linear(5));
    for level in 0..=3 {
        let constraints = CompilationConstraints::new("linear", level);
        let mut props = target.resolve(&constraints).unwrap();
        let pm = PassManagerBuilder::new().with_optimization_level(level).build();
        let mut compiled = circuit.clone();
        pm.run(&mut compiled, &mut props, &CompileBudget::unlimited())
            .unwrap();
        let layout = props.final_layout.expect("routing records a final layout");

        // Relabel the original's output so logical l lands on its final physical qubit.
        let original = unitary(&circuit);
        let permuted: Matrix = original
            .iter()
            .map(|col| {
                let mut out = vec![c(0.0, 0.0); col.len()];
                for (i, amp) in col.iter().enumerate() {
                    let j: usize = (0..5)
                        .map(|l| ((i >> l) & 1) << layout.physical(l as u32).unwrap())
                        .sum();
                    out[j] = *amp;
                }
                out
            })
            .collect();

        assert_eq!(compiled.num_qubits(), 5);
        assert!(equal_up_to_phase(&unitary(&compiled), &permuted), "level {level}");
    }
}

fn gate_seed() -> impl Strategy<Value = (usize, u32, u32, f64)> {
    (0..ALL_GATE_NAMES.len(), 0u32..3, 1u32..3, -PI..PI)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_circuits_survive_every_level(seeds in prop::collection::vec(gate_seed(), 1..12), level in 0u8..=3) {
        let mut circuit = Circuit::with_size("random", 3, 0);
        for (idx, first, offset, angle) in seeds {
            let name = ALL_GATE_NAMES[idx];
            let n = Gate::param_count(name).unwrap();
            let gate = Gate::from_parts(name, &[angle, angle / 2.0, -angle][..n]).unwrap();
            let qubits: Vec<QubitId> = (0..gate.num_qubits())
                .map(|i| QubitId((first + i * offset) % 3))
                .collect();
            if circuit.apply(gate, &qubits).is_err() {
                continue;
            }
        }
        let expected = unitary(&circuit);
        for basis in bases() {
            let compiled = compile_ideal(&circuit, &basis, level);
            prop_assert!(equal_up_to_phase(&unitary(&compiled), &expected));
        }
    }
}
