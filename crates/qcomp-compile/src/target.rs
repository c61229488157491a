//! Backend targets and per-job compilation constraints.

use serde::{Deserialize, Serialize};

use qcomp_ir::ALL_GATE_NAMES;

use crate::error::{CompileError, CompileResult};
use crate::property::{BasisGates, CouplingMap, PropertySet};

/// Highest supported optimization level.
pub const MAX_OPTIMIZATION_LEVEL: u8 = 3;

/// What a backend can execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Physical qubit count.
    pub num_qubits: u32,
    /// Native gate names. `None` accepts every gate.
    #[serde(default)]
    pub basis_gates: Option<Vec<String>>,
    /// Undirected coupling edges. `None` means all-to-all.
    #[serde(default)]
    pub coupling_map: Option<Vec<(u32, u32)>>,
}

impl Target {
    /// All-to-all target that accepts every gate.
    pub fn ideal(num_qubits: u32) -> Self {
        Self {
            num_qubits,
            basis_gates: None,
            coupling_map: None,
        }
    }

    /// Target with a restricted basis and topology.
    pub fn new(num_qubits: u32, basis: &BasisGates, coupling: &CouplingMap) -> Self {
        Self {
            num_qubits,
            basis_gates: Some(basis.names().into_iter().map(str::to_string).collect()),
            coupling_map: Some(coupling.edges().to_vec()),
        }
    }

    fn basis(&self) -> BasisGates {
        match &self.basis_gates {
            Some(names) => BasisGates::new(names.iter().cloned()),
            None => BasisGates::all(),
        }
    }

    /// Resolve the properties a compilation for `constraints` runs with.
    ///
    /// Constraint restrictions only narrow the target: the basis is
    /// intersected, and requested coupling edges must exist on the target.
    pub fn resolve(&self, constraints: &CompilationConstraints) -> CompileResult<PropertySet> {
        let mut basis = self.basis();
        if let Some(requested) = &constraints.basis_gates {
            basis = basis.intersect(&BasisGates::new(requested.iter().cloned()));
            if basis.is_empty() {
                return Err(CompileError::Unsatisfiable(format!(
                    "none of the requested basis gates {requested:?} are supported by the target"
                )));
            }
        }

        let target_map = self
            .coupling_map
            .as_ref()
            .map(|edges| CouplingMap::from_edges(self.num_qubits, edges));

        let coupling = match &constraints.coupling_map {
            Some(requested) => {
                for &(a, b) in requested {
                    let supported = match &target_map {
                        Some(map) => map.is_adjacent(a, b),
                        None => a < self.num_qubits && b < self.num_qubits,
                    };
                    if !supported {
                        return Err(CompileError::Unsatisfiable(format!(
                            "coupling edge ({a}, {b}) is not available on the target"
                        )));
                    }
                }
                Some(CouplingMap::from_edges(self.num_qubits, requested))
            }
            None => target_map,
        };

        Ok(PropertySet::unconstrained(self.num_qubits).with_target(coupling, basis))
    }
}

/// Per-job compilation request parameters.
///
/// Immutable once attached to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationConstraints {
    /// Identifier of the backend to compile for.
    pub backend: String,
    /// Optimization level, 0 to 3.
    #[serde(default = "default_optimization_level")]
    pub optimization_level: u8,
    /// Optional narrowing of the backend's gate set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basis_gates: Option<Vec<String>>,
    /// Optional narrowing of the backend's connectivity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupling_map: Option<Vec<(u32, u32)>>,
}

fn default_optimization_level() -> u8 {
    1
}

impl CompilationConstraints {
    /// Constraints naming only a backend and optimization level.
    pub fn new(backend: impl Into<String>, optimization_level: u8) -> Self {
        Self {
            backend: backend.into(),
            optimization_level,
            basis_gates: None,
            coupling_map: None,
        }
    }

    /// Restrict the basis gates.
    #[must_use]
    pub fn with_basis_gates<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.basis_gates = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict the coupling map.
    #[must_use]
    pub fn with_coupling_map(mut self, edges: Vec<(u32, u32)>) -> Self {
        self.coupling_map = Some(edges);
        self
    }

    /// Structural checks that do not depend on the backend.
    ///
    /// Unknown backend identifiers pass; they fail the job when it starts.
    pub fn validate(&self) -> CompileResult<()> {
        if self.backend.trim().is_empty() {
            return Err(CompileError::InvalidConstraints(
                "backend identifier must not be empty".into(),
            ));
        }
        if self.optimization_level > MAX_OPTIMIZATION_LEVEL {
            return Err(CompileError::InvalidConstraints(format!(
                "optimization level {} exceeds maximum {MAX_OPTIMIZATION_LEVEL}",
                self.optimization_level
            )));
        }
        if let Some(names) = &self.basis_gates {
            if names.is_empty() {
                return Err(CompileError::InvalidConstraints(
                    "basis_gates must not be empty when given".into(),
                ));
            }
            if let Some(unknown) = names.iter().find(|n| !ALL_GATE_NAMES.contains(&n.as_str())) {
                return Err(CompileError::InvalidConstraints(format!(
                    "unknown basis gate '{unknown}'"
                )));
            }
        }
        if let Some(edges) = &self.coupling_map {
            if let Some((a, b)) = edges.iter().find(|(a, b)| a == b) {
                return Err(CompileError::InvalidConstraints(format!(
                    "coupling edge ({a}, {b}) is a self-loop"
                )));
            }
        }
        Ok(())
    }
}
