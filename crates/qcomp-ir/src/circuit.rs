//! The circuit type and its builder API.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::Gate;
use crate::operation::{Operation, OperationKind};
use crate::qubit::{ClassicalRegister, ClbitId, QubitId};
use crate::stats::CircuitStats;
use crate::wire::WireCircuit;

/// An ordered sequence of operations over a fixed qubit index space.
///
/// Every operation added through the builder methods or [`Circuit::push`] is
/// validated, so a `Circuit` value always satisfies:
///
/// - qubit indices lie in `[0, num_qubits)`, clbit indices in `[0, num_clbits)`
/// - no operation names the same qubit twice
/// - gate arity and parameter counts match the gate kind, parameters are finite
/// - classical registers, when present, partition the classical bits exactly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireCircuit", into = "WireCircuit")]
pub struct Circuit {
    name: Option<String>,
    num_qubits: u32,
    num_clbits: u32,
    classical_registers: Vec<ClassicalRegister>,
    operations: Vec<Operation>,
}

impl Circuit {
    /// Create an empty circuit with the given number of qubits and classical bits.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        Self {
            name: Some(name.into()),
            num_qubits,
            num_clbits,
            classical_registers: Vec::new(),
            operations: Vec::new(),
        }
    }

    /// Create an unnamed empty circuit.
    pub fn anonymous(num_qubits: u32, num_clbits: u32) -> Self {
        Self {
            name: None,
            num_qubits,
            num_clbits,
            classical_registers: Vec::new(),
            operations: Vec::new(),
        }
    }

    /// An empty circuit with the same name, sizes and registers as `self`.
    pub fn empty_like(&self) -> Self {
        Self {
            name: self.name.clone(),
            num_qubits: self.num_qubits,
            num_clbits: self.num_clbits,
            classical_registers: self.classical_registers.clone(),
            operations: Vec::new(),
        }
    }

    /// Circuit name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Size of the qubit index space.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Size of the classical bit index space.
    pub fn num_clbits(&self) -> u32 {
        self.num_clbits
    }

    /// Named classical registers.
    pub fn classical_registers(&self) -> &[ClassicalRegister] {
        &self.classical_registers
    }

    /// Operations in program order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the circuit has no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Grow the qubit index space. Never shrinks.
    pub fn widen(&mut self, num_qubits: u32) {
        self.num_qubits = self.num_qubits.max(num_qubits);
    }

    /// Append a classical register, extending the classical bit space.
    ///
    /// Returns the bits that belong to the new register. Bits created without
    /// a register are first given an implicit one named `c` (`c0` when `name`
    /// is `c`) so the register list keeps covering every bit.
    pub fn add_creg(&mut self, name: impl Into<String>, size: u32) -> IrResult<Vec<ClbitId>> {
        let name = name.into();
        let invalid = |reason: &str| IrError::InvalidRegister {
            name: name.clone(),
            reason: reason.to_string(),
        };
        if name.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.classical_registers.iter().any(|r| r.name == name) {
            return Err(invalid("a register with this name already exists"));
        }
        let start = self.num_clbits;
        let end = start
            .checked_add(size)
            .ok_or_else(|| invalid("classical bit count overflows"))?;

        if self.classical_registers.is_empty() && start > 0 {
            let implicit = implicit_register_name(&name);
            self.classical_registers
                .push(ClassicalRegister::new(implicit, start));
        }
        self.num_clbits = end;
        self.classical_registers.push(ClassicalRegister::new(name, size));
        Ok((start..end).map(ClbitId).collect())
    }

    /// Replace the register list. Sizes must add up to `num_clbits`.
    pub fn set_classical_registers(&mut self, registers: Vec<ClassicalRegister>) -> IrResult<()> {
        validate_registers(&registers, self.num_clbits)?;
        self.classical_registers = registers;
        Ok(())
    }

    /// Validate and append an operation.
    pub fn push(&mut self, op: Operation) -> IrResult<&mut Self> {
        self.validate_operation(&op)?;
        self.operations.push(op);
        Ok(self)
    }

    /// Apply a gate to the given qubits.
    pub fn apply(&mut self, gate: Gate, qubits: &[QubitId]) -> IrResult<&mut Self> {
        self.push(Operation::gate(gate, qubits.iter().copied()))
    }

    fn validate_operation(&self, op: &Operation) -> IrResult<()> {
        let gate_name = op.as_gate().map(|g| g.name().to_string());

        for (i, q) in op.qubits.iter().enumerate() {
            if q.0 >= self.num_qubits {
                return Err(IrError::QubitOutOfRange {
                    qubit: *q,
                    num_qubits: self.num_qubits,
                    gate_name,
                });
            }
            if op.qubits[..i].contains(q) {
                return Err(IrError::DuplicateQubit {
                    qubit: *q,
                    gate_name,
                });
            }
        }
        for c in &op.clbits {
            if c.0 >= self.num_clbits {
                return Err(IrError::ClbitOutOfRange {
                    clbit: *c,
                    num_clbits: self.num_clbits,
                });
            }
        }

        match &op.kind {
            OperationKind::Gate(gate) => {
                let expected = gate.num_qubits();
                if op.qubits.len() != expected as usize {
                    return Err(IrError::QubitCountMismatch {
                        gate_name: gate.name().into(),
                        expected,
                        got: op.qubits.len() as u32,
                    });
                }
                if !gate.has_finite_params() {
                    return Err(IrError::NonFiniteParameter {
                        gate_name: gate.name().into(),
                    });
                }
                if !op.clbits.is_empty() {
                    return Err(IrError::MeasureArity {
                        qubits: op.qubits.len(),
                        clbits: op.clbits.len(),
                    });
                }
            }
            OperationKind::Measure => {
                if op.qubits.is_empty() || op.qubits.len() != op.clbits.len() {
                    return Err(IrError::MeasureArity {
                        qubits: op.qubits.len(),
                        clbits: op.clbits.len(),
                    });
                }
            }
            OperationKind::Reset | OperationKind::Barrier => {
                if !op.clbits.is_empty() {
                    return Err(IrError::MeasureArity {
                        qubits: op.qubits.len(),
                        clbits: op.clbits.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Summary statistics over this circuit.
    pub fn stats(&self) -> CircuitStats {
        CircuitStats::compute(self)
    }

    // ── Gate builders ──────────────────────────────────────────────────

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Gate::H, &[qubit])
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Gate::X, &[qubit])
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Gate::Y, &[qubit])
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Gate::Z, &[qubit])
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Gate::S, &[qubit])
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Gate::T, &[qubit])
    }

    /// Apply sqrt(X) gate.
    pub fn sx(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Gate::SX, &[qubit])
    }

    /// Apply Rx rotation.
    pub fn rx(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Gate::Rx(theta), &[qubit])
    }

    /// Apply Ry rotation.
    pub fn ry(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Gate::Ry(theta), &[qubit])
    }

    /// Apply Rz rotation.
    pub fn rz(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Gate::Rz(theta), &[qubit])
    }

    /// Apply universal U gate.
    pub fn u(&mut self, theta: f64, phi: f64, lambda: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Gate::U(theta, phi, lambda), &[qubit])
    }

    /// Apply CNOT gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(Gate::CX, &[control, target])
    }

    /// Apply CZ gate.
    pub fn cz(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.apply(Gate::CZ, &[q1, q2])
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.apply(Gate::Swap, &[q1, q2])
    }

    /// Apply Toffoli gate.
    pub fn ccx(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(Gate::CCX, &[c1, c2, target])
    }

    /// Measure a qubit into a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.push(Operation::measure(qubit, clbit))
    }

    /// Measure qubit `i` into classical bit `i` for every qubit that has a bit.
    pub fn measure_all(&mut self) -> IrResult<&mut Self> {
        for i in 0..self.num_qubits.min(self.num_clbits) {
            self.measure(QubitId(i), ClbitId(i))?;
        }
        Ok(self)
    }

    /// Reset a qubit.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::reset(qubit))
    }

    /// Barrier across the given qubits.
    pub fn barrier(&mut self, qubits: &[QubitId]) -> IrResult<&mut Self> {
        self.push(Operation::barrier(qubits.iter().copied()))
    }
}

/// Name for the register holding bits created without one.
fn implicit_register_name(new_register: &str) -> &'static str {
    if new_register == "c" { "c0" } else { "c" }
}

pub(crate) fn validate_registers(registers: &[ClassicalRegister], num_clbits: u32) -> IrResult<()> {
    if registers.is_empty() {
        return Ok(());
    }
    let total: u64 = registers.iter().map(|r| u64::from(r.size)).sum();
    if total != u64::from(num_clbits) {
        return Err(IrError::MalformedCircuit(format!(
            "classical registers cover {total} bits but the circuit has {num_clbits}"
        )));
    }
    for (i, r) in registers.iter().enumerate() {
        if r.name.is_empty() || registers[..i].iter().any(|o| o.name == r.name) {
            return Err(IrError::MalformedCircuit(format!(
                "invalid or duplicate classical register name '{}'",
                r.name
            )));
        }
    }
    Ok(())
}
