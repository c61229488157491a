//! Initial qubit placement.

use qcomp_ir::Circuit;

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{Layout, PropertySet};

/// Places logical qubit `i` on physical qubit `i`.
///
/// Fails with [`CompileError::CircuitTooLarge`] when the circuit has more
/// qubits than the target.
pub struct TrivialLayout;

impl Pass for TrivialLayout {
    fn name(&self) -> &str {
        "TrivialLayout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        let required = circuit.num_qubits();
        if required > properties.num_physical_qubits {
            return Err(CompileError::CircuitTooLarge {
                required,
                available: properties.num_physical_qubits,
            });
        }
        properties.layout = Some(Layout::trivial(required));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_written() {
        let mut circuit = Circuit::with_size("c", 3, 0);
        let mut props = PropertySet::unconstrained(5);
        TrivialLayout.run(&mut circuit, &mut props).unwrap();
        assert_eq!(props.layout.unwrap().len(), 3);
    }

    #[test]
    fn test_too_many_qubits() {
        let mut circuit = Circuit::with_size("c", 6, 0);
        let mut props = PropertySet::unconstrained(5);
        let err = TrivialLayout.run(&mut circuit, &mut props).unwrap_err();
        assert!(matches!(
            err,
            CompileError::CircuitTooLarge {
                required: 6,
                available: 5
            }
        ));
        assert!(err.is_unsatisfiable());
    }
}
