//! Registry of compilation backends.

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::Arc;

use crate::backend::{CompilationBackend, PipelineBackend};
use crate::error::{CompileError, CompileResult};
use crate::property::{BasisGates, CouplingMap};
use crate::target::Target;

/// Identifier of the all-to-all simulator target.
pub const IDEAL_SIMULATOR: &str = "ideal-simulator";

/// Backends keyed by identifier.
///
/// Lookups happen when a job starts, so new backends can be registered
/// without touching the dispatcher.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: FxHashMap<String, Arc<dyn CompilationBackend>>,
}

/// Public description of a registered backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendInfo {
    pub id: String,
    pub description: String,
    pub target: Target,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in targets.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PipelineBackend::new(
            IDEAL_SIMULATOR,
            "All-to-all simulator accepting every gate",
            Target::ideal(32),
        )));
        registry.register(Arc::new(PipelineBackend::new(
            "linear-5q",
            "5-qubit linear chain with RZ/SX/X/CX",
            Target::new(5, &BasisGates::rz_sx_cx(), &CouplingMap::linear(5)),
        )));
        registry.register(Arc::new(PipelineBackend::new(
            "star-5q",
            "5-qubit star around qubit 2 with PRX/CZ",
            Target::new(5, &BasisGates::prx_cz(), &CouplingMap::star(5, 2)),
        )));
        registry
    }

    /// Register a backend, replacing any backend with the same identifier.
    pub fn register(&mut self, backend: Arc<dyn CompilationBackend>) {
        self.backends.insert(backend.id().to_string(), backend);
    }

    /// Look up a backend.
    pub fn get(&self, id: &str) -> CompileResult<Arc<dyn CompilationBackend>> {
        self.backends
            .get(id)
            .cloned()
            .ok_or_else(|| CompileError::UnsupportedBackend(id.to_string()))
    }

    /// Whether a backend is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.backends.contains_key(id)
    }

    /// Registered backends, sorted by identifier.
    pub fn list(&self) -> Vec<BackendInfo> {
        let mut infos: Vec<_> = self
            .backends
            .values()
            .map(|b| BackendInfo {
                id: b.id().to_string(),
                description: b.description().to_string(),
                target: b.target().clone(),
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Number of registered backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Whether no backends are registered.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.backends.keys().collect();
        ids.sort();
        f.debug_struct("BackendRegistry").field("backends", &ids).finish()
    }
}
