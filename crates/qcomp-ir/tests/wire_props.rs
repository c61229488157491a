//! Property tests for the circuit wire format.

use proptest::prelude::*;
use qcomp_ir::{ALL_GATE_NAMES, Circuit, ClbitId, Gate, IrError, Operation, QubitId, parse, serialize};

/// Seed for one operation: (kind selector, operand picks, parameters).
type OpSeed = (usize, Vec<u32>, Vec<f64>);

/// Register names drawn by the strategy; repeats and `c` exercise clashes,
/// the empty name must be rejected.
const REGISTER_NAMES: [&str; 4] = ["c", "a", "meas", ""];

fn pick_distinct(num_qubits: u32, picks: &[u32], count: usize) -> Vec<QubitId> {
    let mut pool: Vec<u32> = (0..num_qubits).collect();
    let mut chosen = Vec::with_capacity(count);
    for p in picks.iter().take(count) {
        let idx = (*p as usize) % pool.len();
        chosen.push(QubitId(pool.remove(idx)));
    }
    chosen
}

fn build(
    num_qubits: u32,
    num_clbits: u32,
    named: bool,
    registers: Vec<(usize, u32)>,
    seeds: Vec<OpSeed>,
) -> Circuit {
    let mut circuit = if named {
        Circuit::with_size("prop", num_qubits, num_clbits)
    } else {
        Circuit::anonymous(num_qubits, num_clbits)
    };
    for (pick, size) in registers {
        let name = REGISTER_NAMES[pick % REGISTER_NAMES.len()];
        let before = circuit.clone();
        match circuit.add_creg(name, size) {
            Ok(bits) => assert_eq!(bits.len(), size as usize),
            Err(_) => assert_eq!(circuit, before),
        }
    }
    let num_clbits = circuit.num_clbits();
    let kinds = ALL_GATE_NAMES.len() + 3;
    for (selector, picks, params) in seeds {
        let selector = selector % kinds;
        let op = if selector < ALL_GATE_NAMES.len() {
            let name = ALL_GATE_NAMES[selector];
            let n = Gate::param_count(name).unwrap_or(0);
            let gate = Gate::from_parts(name, &params[..n]).unwrap();
            if gate.num_qubits() > num_qubits {
                continue;
            }
            Operation::gate(gate, pick_distinct(num_qubits, &picks, gate.num_qubits() as usize))
        } else if selector == ALL_GATE_NAMES.len() {
            if num_clbits == 0 {
                continue;
            }
            let q = pick_distinct(num_qubits, &picks, 1)[0];
            Operation::measure(q, ClbitId(picks[1] % num_clbits))
        } else if selector == ALL_GATE_NAMES.len() + 1 {
            Operation::reset(pick_distinct(num_qubits, &picks, 1)[0])
        } else {
            let count = 1 + (picks[2] as usize) % num_qubits as usize;
            Operation::barrier(pick_distinct(num_qubits, &picks, count))
        };
        circuit.push(op).unwrap();
    }
    circuit
}

fn op_seed() -> impl Strategy<Value = OpSeed> {
    (
        any::<usize>(),
        prop::collection::vec(any::<u32>(), 8),
        prop::collection::vec(-10.0f64..10.0, 3),
    )
}

fn circuit_strategy() -> impl Strategy<Value = Circuit> {
    (
        1u32..7,
        0u32..4,
        any::<bool>(),
        prop::collection::vec((any::<usize>(), 0u32..4), 0..4),
        prop::collection::vec(op_seed(), 0..40),
    )
        .prop_map(|(q, c, named, registers, seeds)| build(q, c, named, registers, seeds))
}

proptest! {
    #[test]
    fn prop_round_trip(circuit in circuit_strategy()) {
        let bytes = serialize(&circuit).unwrap();
        let parsed = parse(&bytes).unwrap();
        prop_assert_eq!(parsed, circuit);
    }

    #[test]
    fn prop_out_of_range_qubit_is_malformed(num_qubits in 1u32..16, excess in 0u32..100) {
        let doc = serde_json::json!({
            "format_version": 1,
            "num_qubits": num_qubits,
            "operations": [
                {"op": "h", "qubits": [0]},
                {"op": "x", "qubits": [num_qubits + excess]},
            ],
        });
        let err = parse(doc.to_string().as_bytes()).unwrap_err();
        prop_assert!(matches!(err, IrError::MalformedCircuit(_)));
    }

    #[test]
    fn prop_stats_bounded_by_gate_count(circuit in circuit_strategy()) {
        let stats = circuit.stats();
        prop_assert_eq!(stats.width, circuit.num_qubits());
        prop_assert!(stats.multi_qubit_gate_count <= stats.gate_count);
        prop_assert!(stats.multi_qubit_gate_depth <= stats.multi_qubit_gate_count);
        prop_assert!(stats.depth as usize <= circuit.len());
    }
}
