//! Built-in compilation passes.

mod decompose;
mod layout;
mod optimization;
mod routing;
mod translation;
mod verification;

pub use decompose::DecomposeMultiQubit;
pub use layout::TrivialLayout;
pub use optimization::{CancelInverses, FixedPoint, MergeRotations};
pub use routing::BasicRouting;
pub use translation::{BasisTranslation, to_u_angles};
pub use verification::VerifyTarget;

use qcomp_ir::{Circuit, Operation};

use crate::error::CompileResult;

/// Replace the circuit's operations, keeping its name, sizes and registers.
pub(crate) fn rebuild(
    circuit: &Circuit,
    num_qubits: u32,
    ops: impl IntoIterator<Item = Operation>,
) -> CompileResult<Circuit> {
    let mut out = circuit.empty_like();
    out.widen(num_qubits);
    for op in ops {
        out.push(op)?;
    }
    Ok(out)
}
