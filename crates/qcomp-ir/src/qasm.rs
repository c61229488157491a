//! OpenQASM 2.0 text export.

use std::fmt::Write;

use crate::circuit::Circuit;
use crate::operation::{Operation, OperationKind};
use crate::qubit::ClbitId;

const PRX_DEFINITION: &str = "gate prx(theta, phi) a { u(theta, phi - pi/2, pi/2 - phi) a; }\n";

/// Render a circuit as OpenQASM 2.0 source.
pub fn to_qasm(circuit: &Circuit) -> String {
    let mut out = String::from("OPENQASM 2.0;\ninclude \"qelib1.inc\";\n");
    if circuit
        .operations()
        .iter()
        .any(|op| op.name() == "prx")
    {
        out.push_str(PRX_DEFINITION);
    }

    if circuit.num_qubits() > 0 {
        let _ = writeln!(out, "qreg q[{}];", circuit.num_qubits());
    }
    let registers = register_layout(circuit);
    for (name, size) in &registers {
        let _ = writeln!(out, "creg {name}[{size}];");
    }

    for op in circuit.operations() {
        write_operation(&mut out, op, &registers);
    }
    out
}

fn register_layout(circuit: &Circuit) -> Vec<(String, u32)> {
    if circuit.classical_registers().is_empty() {
        if circuit.num_clbits() == 0 {
            return Vec::new();
        }
        return vec![("c".to_string(), circuit.num_clbits())];
    }
    circuit
        .classical_registers()
        .iter()
        .map(|r| (r.name.clone(), r.size))
        .collect()
}

fn clbit_ref(registers: &[(String, u32)], clbit: ClbitId) -> String {
    let mut offset = clbit.0;
    for (name, size) in registers {
        if offset < *size {
            return format!("{name}[{offset}]");
        }
        offset -= size;
    }
    format!("c[{}]", clbit.0)
}

fn write_operation(out: &mut String, op: &Operation, registers: &[(String, u32)]) {
    let qubits: Vec<String> = op.qubits.iter().map(|q| format!("q[{}]", q.0)).collect();
    match &op.kind {
        OperationKind::Gate(gate) => {
            let params = gate.params();
            if params.is_empty() {
                let _ = writeln!(out, "{} {};", gate.name(), qubits.join(","));
            } else {
                let params: Vec<String> = params.iter().map(f64::to_string).collect();
                let _ = writeln!(
                    out,
                    "{}({}) {};",
                    gate.name(),
                    params.join(","),
                    qubits.join(",")
                );
            }
        }
        OperationKind::Measure => {
            for (q, c) in qubits.iter().zip(&op.clbits) {
                let _ = writeln!(out, "measure {q} -> {};", clbit_ref(registers, *c));
            }
        }
        OperationKind::Reset => {
            for q in &qubits {
                let _ = writeln!(out, "reset {q};");
            }
        }
        OperationKind::Barrier => {
            if !qubits.is_empty() {
                let _ = writeln!(out, "barrier {};", qubits.join(","));
            }
        }
    }
}
