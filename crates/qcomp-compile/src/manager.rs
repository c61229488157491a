//! Pass manager for orchestrating compilation.

use tracing::{debug, instrument};

use qcomp_ir::Circuit;

use crate::budget::CompileBudget;
use crate::error::CompileResult;
use crate::pass::Pass;
use crate::passes::{
    BasicRouting, BasisTranslation, CancelInverses, DecomposeMultiQubit, FixedPoint,
    MergeRotations, TrivialLayout, VerifyTarget,
};
use crate::property::PropertySet;
use crate::target::MAX_OPTIMIZATION_LEVEL;

/// Runs a sequence of passes in order.
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// Append a pass.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run every pass, checking the budget before each one.
    #[instrument(skip_all, fields(passes = self.passes.len(), qubits = circuit.num_qubits()))]
    pub fn run(
        &self,
        circuit: &mut Circuit,
        properties: &mut PropertySet,
        budget: &CompileBudget,
    ) -> CompileResult<()> {
        for pass in &self.passes {
            budget.check()?;
            if pass.should_run(circuit, properties) {
                pass.run(circuit, properties)?;
                debug!(pass = pass.name(), ops = circuit.len(), "pass completed");
            } else {
                debug!(pass = pass.name(), "pass skipped");
            }
        }
        budget.check()
    }

    /// Number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Whether there are no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Pass names in execution order.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the standard pipeline for an optimization level.
pub struct PassManagerBuilder {
    optimization_level: u8,
}

impl PassManagerBuilder {
    /// Builder at optimization level 1.
    pub fn new() -> Self {
        Self {
            optimization_level: 1,
        }
    }

    /// Set the optimization level.
    ///
    /// - Level 0: only the rewrites the target requires
    /// - Level 1: cancel adjacent inverse gates
    /// - Level 2: also merge adjacent rotations
    /// - Level 3: repeat both until nothing changes
    #[must_use]
    pub fn with_optimization_level(mut self, level: u8) -> Self {
        self.optimization_level = level.min(MAX_OPTIMIZATION_LEVEL);
        self
    }

    /// Build the pipeline.
    pub fn build(self) -> PassManager {
        let mut pm = PassManager::new();
        pm.add_pass(DecomposeMultiQubit);
        pm.add_pass(TrivialLayout);
        pm.add_pass(BasicRouting);
        pm.add_pass(BasisTranslation);

        match self.optimization_level {
            0 => {}
            1 => pm.add_pass(CancelInverses),
            2 => {
                pm.add_pass(CancelInverses);
                pm.add_pass(MergeRotations);
            }
            _ => pm.add_pass(FixedPoint::new(vec![
                Box::new(CancelInverses),
                Box::new(MergeRotations),
            ])),
        }

        pm.add_pass(VerifyTarget);
        pm
    }
}

impl Default for PassManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
