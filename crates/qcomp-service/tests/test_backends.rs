//! Backends with controllable behavior for dispatcher tests.
//!
//! `SleepyBackend` holds its worker for a fixed time and returns the input
//! unchanged. `PanickingBackend` panics on every call.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use qcomp_compile::{
    BackendRegistry, CompilationBackend, CompilationConstraints, CompileBudget, CompileResult,
    Target,
};
use qcomp_ir::{Circuit, QubitId};

pub const SLEEPY: &str = "sleepy";
pub const PANICKY: &str = "panicky";

pub struct SleepyBackend {
    target: Target,
    delay: Duration,
}

impl SleepyBackend {
    pub fn new(delay: Duration) -> Self {
        Self {
            target: Target::ideal(8),
            delay,
        }
    }
}

impl CompilationBackend for SleepyBackend {
    fn id(&self) -> &str {
        SLEEPY
    }

    fn target(&self) -> &Target {
        &self.target
    }

    fn compile(
        &self,
        circuit: &Circuit,
        _constraints: &CompilationConstraints,
        _budget: &CompileBudget,
    ) -> CompileResult<Circuit> {
        std::thread::sleep(self.delay);
        Ok(circuit.clone())
    }
}

pub struct PanickingBackend {
    target: Target,
}

impl PanickingBackend {
    pub fn new() -> Self {
        Self {
            target: Target::ideal(8),
        }
    }
}

impl CompilationBackend for PanickingBackend {
    fn id(&self) -> &str {
        PANICKY
    }

    fn target(&self) -> &Target {
        &self.target
    }

    fn compile(
        &self,
        _circuit: &Circuit,
        _constraints: &CompilationConstraints,
        _budget: &CompileBudget,
    ) -> CompileResult<Circuit> {
        panic!("routing table corrupted");
    }
}

/// Default backends plus the sleepy and panicking test backends.
pub fn registry(delay: Duration) -> Arc<BackendRegistry> {
    let mut registry = BackendRegistry::with_defaults();
    registry.register(Arc::new(SleepyBackend::new(delay)));
    registry.register(Arc::new(PanickingBackend::new()));
    Arc::new(registry)
}

pub fn ghz(n: u32) -> Circuit {
    let mut circuit = Circuit::with_size("ghz", n, n);
    circuit.h(QubitId(0)).unwrap();
    for q in 1..n {
        circuit.cx(QubitId(q - 1), QubitId(q)).unwrap();
    }
    circuit.measure_all().unwrap();
    circuit
}
