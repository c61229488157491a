//! The compilation backend abstraction.

use qcomp_ir::Circuit;
use tracing::debug;

use crate::budget::CompileBudget;
use crate::error::CompileResult;
use crate::manager::PassManagerBuilder;
use crate::target::{CompilationConstraints, Target};

/// A compilation target the service can dispatch jobs to.
///
/// Implementations must be reentrant: `compile` may run concurrently for
/// unrelated jobs and must not share mutable state between calls.
pub trait CompilationBackend: Send + Sync {
    /// Identifier clients name in their constraints.
    fn id(&self) -> &str;

    /// Human readable description.
    fn description(&self) -> &str {
        ""
    }

    /// What the backend can execute.
    fn target(&self) -> &Target;

    /// Compile `circuit` for this backend.
    ///
    /// Returns a circuit that satisfies the backend's gate set and
    /// connectivity, narrowed by `constraints`.
    fn compile(
        &self,
        circuit: &Circuit,
        constraints: &CompilationConstraints,
        budget: &CompileBudget,
    ) -> CompileResult<Circuit>;
}

/// Backend that compiles with the built-in pass pipeline for a fixed target.
#[derive(Debug, Clone)]
pub struct PipelineBackend {
    id: String,
    description: String,
    target: Target,
}

impl PipelineBackend {
    /// Create a backend for `target`.
    pub fn new(id: impl Into<String>, description: impl Into<String>, target: Target) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            target,
        }
    }
}

impl CompilationBackend for PipelineBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn target(&self) -> &Target {
        &self.target
    }

    fn compile(
        &self,
        circuit: &Circuit,
        constraints: &CompilationConstraints,
        budget: &CompileBudget,
    ) -> CompileResult<Circuit> {
        constraints.validate()?;
        let mut properties = self.target.resolve(constraints)?;
        let pm = PassManagerBuilder::new()
            .with_optimization_level(constraints.optimization_level)
            .build();

        let mut working = circuit.clone();
        pm.run(&mut working, &mut properties, budget)?;
        debug!(
            backend = %self.id,
            input_ops = circuit.len(),
            output_ops = working.len(),
            "compiled circuit"
        );
        Ok(working)
    }
}
