//! Compilation backends for the qcomp service.
//!
//! A [`CompilationBackend`] turns a [`qcomp_ir::Circuit`] plus
//! [`CompilationConstraints`] into a circuit the target can run, or fails with
//! a [`CompileError`]. Backends are looked up by identifier in a
//! [`BackendRegistry`].
//!
//! The built-in [`PipelineBackend`] runs a [`PassManager`] pipeline:
//!
//! | Step | Pass | Purpose |
//! |------|------|---------|
//! | 1 | [`passes::DecomposeMultiQubit`] | CCX and CSWAP into 1q/2q gates |
//! | 2 | [`passes::TrivialLayout`] | placement, qubit-count check |
//! | 3 | [`passes::BasicRouting`] | SWAP insertion on restricted topologies |
//! | 4 | [`passes::BasisTranslation`] | rewrite into the native gate set |
//! | 5 | [`passes::CancelInverses`], [`passes::MergeRotations`] | optimization, level 1 and up |
//! | 6 | [`passes::VerifyTarget`] | reject output the target cannot run |
//!
//! ```rust
//! use qcomp_compile::{BackendRegistry, CompilationConstraints, CompileBudget};
//! use qcomp_ir::{Circuit, QubitId};
//!
//! let registry = BackendRegistry::with_defaults();
//! let backend = registry.get("linear-5q").unwrap();
//!
//! let mut circuit = Circuit::with_size("ghz", 3, 0);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(2)).unwrap();
//!
//! let compiled = backend
//!     .compile(&circuit, &CompilationConstraints::new("linear-5q", 2), &CompileBudget::unlimited())
//!     .unwrap();
//! assert!(compiled.operations().iter().all(|op| ["rz", "sx", "x", "cx"].contains(&op.name())));
//! ```

pub mod backend;
pub mod budget;
pub mod error;
pub mod manager;
pub mod pass;
pub mod passes;
pub mod property;
pub mod registry;
pub mod target;

pub use backend::{CompilationBackend, PipelineBackend};
pub use budget::CompileBudget;
pub use error::{CompileError, CompileResult};
pub use manager::{PassManager, PassManagerBuilder};
pub use pass::{Pass, PassKind};
pub use property::{BasisGates, CouplingMap, Layout, PropertySet};
pub use registry::{BackendInfo, BackendRegistry, IDEAL_SIMULATOR};
pub use target::{CompilationConstraints, MAX_OPTIMIZATION_LEVEL, Target};
