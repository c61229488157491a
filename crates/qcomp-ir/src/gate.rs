//! Gate kinds.

use crate::error::{IrError, IrResult};

/// Every gate kind the service understands.
///
/// Angles are radians. Parametric gates carry their parameters inline so a
/// `Gate` value alone fully determines its unitary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gate {
    // Single-qubit Pauli gates
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    // Single-qubit Clifford gates
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,

    // Single-qubit rotations
    /// Rotation around X axis.
    Rx(f64),
    /// Rotation around Y axis.
    Ry(f64),
    /// Rotation around Z axis.
    Rz(f64),
    /// Phase gate.
    P(f64),
    /// Universal single-qubit gate U(θ, φ, λ).
    U(f64, f64, f64),
    /// Phased RX gate: PRX(θ, φ) = RZ(φ) · RX(θ) · RZ(-φ).
    Prx(f64, f64),

    // Two-qubit gates
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// SWAP gate.
    Swap,
    /// Controlled rotation around Z.
    CRz(f64),
    /// Controlled phase gate.
    CP(f64),
    /// ZZ rotation gate.
    Rzz(f64),

    // Three-qubit gates
    /// Toffoli gate.
    CCX,
    /// Fredkin gate.
    CSwap,
}

/// Names of every supported gate, in declaration order.
pub const ALL_GATE_NAMES: &[&str] = &[
    "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "sxdg", "rx", "ry", "rz", "p", "u",
    "prx", "cx", "cy", "cz", "ch", "swap", "crz", "cp", "rzz", "ccx", "cswap",
];

impl Gate {
    /// Wire and QASM name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Gate::I => "id",
            Gate::X => "x",
            Gate::Y => "y",
            Gate::Z => "z",
            Gate::H => "h",
            Gate::S => "s",
            Gate::Sdg => "sdg",
            Gate::T => "t",
            Gate::Tdg => "tdg",
            Gate::SX => "sx",
            Gate::SXdg => "sxdg",
            Gate::Rx(_) => "rx",
            Gate::Ry(_) => "ry",
            Gate::Rz(_) => "rz",
            Gate::P(_) => "p",
            Gate::U(..) => "u",
            Gate::Prx(..) => "prx",
            Gate::CX => "cx",
            Gate::CY => "cy",
            Gate::CZ => "cz",
            Gate::CH => "ch",
            Gate::Swap => "swap",
            Gate::CRz(_) => "crz",
            Gate::CP(_) => "cp",
            Gate::Rzz(_) => "rzz",
            Gate::CCX => "ccx",
            Gate::CSwap => "cswap",
        }
    }

    /// Number of qubits this gate acts on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            Gate::CX
            | Gate::CY
            | Gate::CZ
            | Gate::CH
            | Gate::Swap
            | Gate::CRz(_)
            | Gate::CP(_)
            | Gate::Rzz(_) => 2,
            Gate::CCX | Gate::CSwap => 3,
            _ => 1,
        }
    }

    /// Parameters of this gate, in wire order.
    pub fn params(&self) -> Vec<f64> {
        match *self {
            Gate::Rx(a) | Gate::Ry(a) | Gate::Rz(a) | Gate::P(a) => vec![a],
            Gate::CRz(a) | Gate::CP(a) | Gate::Rzz(a) => vec![a],
            Gate::Prx(theta, phi) => vec![theta, phi],
            Gate::U(theta, phi, lambda) => vec![theta, phi, lambda],
            _ => Vec::new(),
        }
    }

    /// Number of parameters the named gate takes, if the name is known.
    pub fn param_count(name: &str) -> Option<usize> {
        match name {
            "rx" | "ry" | "rz" | "p" | "crz" | "cp" | "rzz" => Some(1),
            "prx" => Some(2),
            "u" => Some(3),
            other if ALL_GATE_NAMES.contains(&other) => Some(0),
            _ => None,
        }
    }

    /// Build a gate from its wire name and parameter list.
    pub fn from_parts(name: &str, params: &[f64]) -> IrResult<Self> {
        let expected = Self::param_count(name).ok_or_else(|| IrError::UnknownGate(name.into()))?;
        if params.len() != expected {
            return Err(IrError::ParamCountMismatch {
                gate_name: name.into(),
                expected,
                got: params.len(),
            });
        }
        if params.iter().any(|p| !p.is_finite()) {
            return Err(IrError::NonFiniteParameter {
                gate_name: name.into(),
            });
        }

        let gate = match (name, params) {
            ("id", []) => Gate::I,
            ("x", []) => Gate::X,
            ("y", []) => Gate::Y,
            ("z", []) => Gate::Z,
            ("h", []) => Gate::H,
            ("s", []) => Gate::S,
            ("sdg", []) => Gate::Sdg,
            ("t", []) => Gate::T,
            ("tdg", []) => Gate::Tdg,
            ("sx", []) => Gate::SX,
            ("sxdg", []) => Gate::SXdg,
            ("rx", &[a]) => Gate::Rx(a),
            ("ry", &[a]) => Gate::Ry(a),
            ("rz", &[a]) => Gate::Rz(a),
            ("p", &[a]) => Gate::P(a),
            ("u", &[theta, phi, lambda]) => Gate::U(theta, phi, lambda),
            ("prx", &[theta, phi]) => Gate::Prx(theta, phi),
            ("cx", []) => Gate::CX,
            ("cy", []) => Gate::CY,
            ("cz", []) => Gate::CZ,
            ("ch", []) => Gate::CH,
            ("swap", []) => Gate::Swap,
            ("crz", &[a]) => Gate::CRz(a),
            ("cp", &[a]) => Gate::CP(a),
            ("rzz", &[a]) => Gate::Rzz(a),
            ("ccx", []) => Gate::CCX,
            ("cswap", []) => Gate::CSwap,
            _ => return Err(IrError::UnknownGate(name.into())),
        };
        Ok(gate)
    }

    /// Whether all parameters are finite numbers.
    pub fn has_finite_params(&self) -> bool {
        self.params().iter().all(|p| p.is_finite())
    }

    /// Whether swapping the operand order leaves the gate unchanged.
    pub fn is_symmetric(&self) -> bool {
        matches!(self, Gate::CZ | Gate::Swap | Gate::CP(_) | Gate::Rzz(_))
    }
}
