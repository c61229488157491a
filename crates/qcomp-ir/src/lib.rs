//! Circuit representation for the qcomp compilation service.
//!
//! A [`Circuit`] is an ordered list of [`Operation`]s over a fixed qubit index
//! space. Circuits are validated as they are built, so any value of the type
//! is well formed. The [`wire`] module defines the versioned JSON document
//! clients submit, and [`parse`]/[`serialize`] convert between the two with
//! `parse(serialize(c)) == c`.
//!
//! # Example
//!
//! ```rust
//! use qcomp_ir::{Circuit, QubitId, parse, serialize};
//!
//! let mut circuit = Circuit::with_size("bell", 2, 2);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure_all().unwrap();
//!
//! let bytes = serialize(&circuit).unwrap();
//! assert_eq!(parse(&bytes).unwrap(), circuit);
//! assert_eq!(circuit.stats().depth, 3);
//! ```

pub mod circuit;
pub mod error;
pub mod gate;
pub mod operation;
pub mod qasm;
pub mod qubit;
pub mod stats;
pub mod wire;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::{ALL_GATE_NAMES, Gate};
pub use operation::{Operation, OperationKind};
pub use qasm::to_qasm;
pub use qubit::{ClassicalRegister, ClbitId, QubitId};
pub use stats::CircuitStats;
pub use wire::{FORMAT_VERSION, parse, serialize};
