//! Pass trait and types for compilation passes.

use qcomp_ir::Circuit;

use crate::error::CompileResult;
use crate::property::PropertySet;

/// The kind of compilation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Reads the circuit and records facts in the `PropertySet`.
    Analysis,
    /// Rewrites the circuit.
    Transformation,
}

/// One step of the compilation pipeline.
///
/// Passes hold no mutable state, so a single pass value can serve any number
/// of concurrent compilations.
pub trait Pass: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Whether the pass rewrites the circuit.
    fn kind(&self) -> PassKind;

    /// Run the pass.
    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()>;

    /// Skip the pass when it has nothing to do.
    fn should_run(&self, _circuit: &Circuit, _properties: &PropertySet) -> bool {
        true
    }
}
