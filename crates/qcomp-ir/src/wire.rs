//! Versioned JSON wire format.
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "name": "bell",
//!   "num_qubits": 2,
//!   "num_clbits": 2,
//!   "classical_registers": [{"name": "c", "size": 2}],
//!   "operations": [
//!     {"op": "h", "qubits": [0]},
//!     {"op": "cx", "qubits": [0, 1]},
//!     {"op": "measure", "qubits": [0], "clbits": [0]}
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::circuit::{Circuit, validate_registers};
use crate::error::{IrError, IrResult};
use crate::gate::Gate;
use crate::operation::{Operation, OperationKind};
use crate::qubit::{ClassicalRegister, ClbitId, QubitId};

/// Current wire format version.
pub const FORMAT_VERSION: u32 = 1;

/// Serialized form of a [`Circuit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireCircuit {
    pub format_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub num_qubits: u32,
    #[serde(default)]
    pub num_clbits: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classical_registers: Vec<ClassicalRegister>,
    #[serde(default)]
    pub operations: Vec<WireOperation>,
}

/// Serialized form of an [`Operation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireOperation {
    pub op: String,
    pub qubits: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clbits: Vec<u32>,
}

impl From<&Operation> for WireOperation {
    fn from(op: &Operation) -> Self {
        let params = op.as_gate().map(Gate::params).unwrap_or_default();
        Self {
            op: op.name().to_string(),
            qubits: op.qubits.iter().map(|q| q.0).collect(),
            params,
            clbits: op.clbits.iter().map(|c| c.0).collect(),
        }
    }
}

impl TryFrom<WireOperation> for Operation {
    type Error = IrError;

    fn try_from(wire: WireOperation) -> IrResult<Self> {
        let kind = match wire.op.as_str() {
            "measure" => OperationKind::Measure,
            "reset" => OperationKind::Reset,
            "barrier" => OperationKind::Barrier,
            name => OperationKind::Gate(Gate::from_parts(name, &wire.params)?),
        };
        if !matches!(kind, OperationKind::Gate(_)) && !wire.params.is_empty() {
            return Err(IrError::ParamCountMismatch {
                gate_name: wire.op,
                expected: 0,
                got: wire.params.len(),
            });
        }
        Ok(Operation {
            kind,
            qubits: wire.qubits.into_iter().map(QubitId).collect(),
            clbits: wire.clbits.into_iter().map(ClbitId).collect(),
        })
    }
}

impl From<Circuit> for WireCircuit {
    fn from(circuit: Circuit) -> Self {
        WireCircuit::from(&circuit)
    }
}

impl From<&Circuit> for WireCircuit {
    fn from(circuit: &Circuit) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            name: circuit.name().map(str::to_string),
            num_qubits: circuit.num_qubits(),
            num_clbits: circuit.num_clbits(),
            classical_registers: circuit.classical_registers().to_vec(),
            operations: circuit.operations().iter().map(WireOperation::from).collect(),
        }
    }
}

impl TryFrom<WireCircuit> for Circuit {
    type Error = IrError;

    fn try_from(wire: WireCircuit) -> IrResult<Self> {
        if wire.format_version != FORMAT_VERSION {
            return Err(IrError::MalformedCircuit(format!(
                "unsupported format_version {} (expected {FORMAT_VERSION})",
                wire.format_version
            )));
        }
        validate_registers(&wire.classical_registers, wire.num_clbits)?;

        let mut circuit = match wire.name {
            Some(name) => Circuit::with_size(name, wire.num_qubits, wire.num_clbits),
            None => Circuit::anonymous(wire.num_qubits, wire.num_clbits),
        };
        circuit.set_classical_registers(wire.classical_registers)?;
        for (index, op) in wire.operations.into_iter().enumerate() {
            let op = Operation::try_from(op).map_err(|e| at_operation(index, &e))?;
            circuit.push(op).map_err(|e| at_operation(index, &e))?;
        }
        Ok(circuit)
    }
}

fn at_operation(index: usize, err: &IrError) -> IrError {
    IrError::MalformedCircuit(format!("operation {index}: {err}"))
}

/// Parse a circuit from its wire form.
///
/// Every failure, including invalid JSON, is reported as
/// [`IrError::MalformedCircuit`].
pub fn parse(bytes: &[u8]) -> IrResult<Circuit> {
    let wire: WireCircuit =
        serde_json::from_slice(bytes).map_err(|e| IrError::MalformedCircuit(e.to_string()))?;
    Circuit::try_from(wire).map_err(|e| match e {
        IrError::MalformedCircuit(_) => e,
        other => IrError::MalformedCircuit(other.to_string()),
    })
}

/// Serialize a circuit to its wire form.
pub fn serialize(circuit: &Circuit) -> IrResult<Vec<u8>> {
    Ok(serde_json::to_vec(&WireCircuit::from(circuit))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bell() -> Circuit {
        let mut c = Circuit::with_size("bell", 2, 2);
        c.h(QubitId(0)).unwrap();
        c.cx(QubitId(0), QubitId(1)).unwrap();
        c.measure_all().unwrap();
        c
    }

    #[test]
    fn test_round_trip() {
        let c = bell();
        let bytes = serialize(&c).unwrap();
        assert_eq!(parse(&bytes).unwrap(), c);
    }

    #[test]
    fn test_parse_minimal_document() {
        let c = parse(br#"{"format_version":1,"num_qubits":3,"operations":[{"op":"rz","qubits":[2],"params":[0.5]}]}"#)
            .unwrap();
        assert_eq!(c.num_qubits(), 3);
        assert_eq!(c.num_clbits(), 0);
        assert_eq!(c.operations()[0].as_gate(), Some(&Gate::Rz(0.5)));
    }

    #[test]
    fn test_out_of_range_is_malformed() {
        let err = parse(br#"{"format_version":1,"num_qubits":2,"operations":[{"op":"h","qubits":[2]}]}"#)
            .unwrap_err();
        assert!(matches!(err, IrError::MalformedCircuit(msg) if msg.contains("operation 0")));
    }

    #[test]
    fn test_unknown_gate_is_malformed() {
        let err = parse(br#"{"format_version":1,"num_qubits":1,"operations":[{"op":"frobnicate","qubits":[0]}]}"#)
            .unwrap_err();
        assert!(matches!(err, IrError::MalformedCircuit(msg) if msg.contains("frobnicate")));
    }

    #[test]
    fn test_bad_version_and_bad_json() {
        assert!(matches!(
            parse(br#"{"format_version":2,"num_qubits":1}"#),
            Err(IrError::MalformedCircuit(_))
        ));
        assert!(matches!(parse(b"not json"), Err(IrError::MalformedCircuit(_))));
    }

    #[test]
    fn test_register_sizes_must_match() {
        let err = parse(
            br#"{"format_version":1,"num_qubits":1,"num_clbits":2,"classical_registers":[{"name":"c","size":1}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, IrError::MalformedCircuit(_)));
    }

    #[test]
    fn test_params_on_measure_rejected() {
        let err = parse(
            br#"{"format_version":1,"num_qubits":1,"num_clbits":1,"operations":[{"op":"measure","qubits":[0],"clbits":[0],"params":[1.0]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, IrError::MalformedCircuit(_)));
    }

    #[test]
    fn test_serde_embeds_wire_form() {
        let value = serde_json::to_value(bell()).unwrap();
        assert_eq!(value["format_version"], 1);
        assert_eq!(value["operations"][1]["op"], "cx");
        let back: Circuit = serde_json::from_value(value).unwrap();
        assert_eq!(back, bell());
    }
}
