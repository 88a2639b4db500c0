use std::collections::BTreeMap;
use std::fmt::Write as _;

use tracing::debug;

use crate::{ComputationGraph, Error, Result};

/// The default (`ai.onnx`) operator domain is spelled as the empty string.
pub const DEFAULT_DOMAIN: &str = "";

pub const MIN_IR_VERSION: i64 = 3;
pub const MAX_IR_VERSION: i64 = 10;

/// Highest default-domain opset each IR version was released alongside.
const IR_OPSET_CEILING: [(i64, i64); 8] = [
    (3, 8),
    (4, 9),
    (5, 10),
    (6, 11),
    (7, 14),
    (8, 18),
    (9, 20),
    (10, 22),
];

/// First default-domain opset defining each operator this crate can author.
const OPERATOR_SINCE: [(&str, i64); 10] = [
    ("Identity", 1),
    ("Add", 1),
    ("Mul", 1),
    ("Relu", 1),
    ("MatMul", 1),
    ("Gemm", 1),
    ("Softmax", 1),
    ("Reshape", 1),
    ("Cast", 1),
    ("Flatten", 1),
];

pub fn max_opset_for_ir(ir_version: i64) -> Option<i64> {
    IR_OPSET_CEILING
        .iter()
        .find(|(ir, _)| *ir == ir_version)
        .map(|(_, opset)| *opset)
}

pub fn min_opset_for(operator_type: &str) -> Option<i64> {
    OPERATOR_SINCE
        .iter()
        .find(|(op, _)| *op == operator_type)
        .map(|(_, since)| *since)
}

/// A graph plus the container metadata written alongside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializedModel {
    pub producer_name: String,
    pub producer_version: String,
    pub ir_version: i64,
    pub opset_entries: BTreeMap<String, i64>,
    pub graph: ComputationGraph,
}

impl SerializedModel {
    pub fn default_opset(&self) -> Option<i64> {
        self.opset_entries.get(DEFAULT_DOMAIN).copied()
    }

    /// Multi-line summary: versions first, then one line per graph input and output.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Graph: {}", self.graph.name);
        let _ = writeln!(out, "  Producer: {}", self.producer_name);
        for (domain, version) in &self.opset_entries {
            if domain.is_empty() {
                let _ = writeln!(out, "  Opset version: {version}");
            } else {
                let _ = writeln!(out, "  Opset version: {version} ({domain})");
            }
        }
        let _ = writeln!(out, "  IR version: {}", self.ir_version);
        for spec in &self.graph.graph_inputs {
            let _ = writeln!(
                out,
                "  Input: name='{}', type={}, shape={}",
                spec.name,
                spec.element_type,
                spec.shape_string()
            );
        }
        for spec in &self.graph.graph_outputs {
            let _ = writeln!(
                out,
                "  Output: name='{}', type={}, shape={}",
                spec.name,
                spec.element_type,
                spec.shape_string()
            );
        }
        let ops: Vec<&str> = self.graph.operator_types().collect();
        let _ = write!(out, "  Nodes: {} [{}]", ops.len(), ops.join(", "));
        out
    }
}

/// Wraps `graph` with container metadata after checking it can be consumed.
///
/// Both versions are required: the IR version must be in
/// `MIN_IR_VERSION..=MAX_IR_VERSION`, and the opset must satisfy every
/// operator in the graph without exceeding what that IR version carries.
pub fn serialize(
    graph: ComputationGraph,
    producer_name: &str,
    ir_version: i64,
    opset_version: i64,
) -> Result<SerializedModel> {
    if !(MIN_IR_VERSION..=MAX_IR_VERSION).contains(&ir_version) {
        return Err(Error::config(
            "ir_version",
            format!(
                "{ir_version} is outside the supported range {MIN_IR_VERSION}..={MAX_IR_VERSION}"
            ),
        ));
    }
    if opset_version < 1 {
        return Err(Error::config(
            "opset_version",
            format!("{opset_version} is not a valid opset"),
        ));
    }
    if let Some(ceiling) = max_opset_for_ir(ir_version) {
        if opset_version > ceiling {
            return Err(Error::config(
                "opset_version",
                format!(
                    "opset {opset_version} needs a newer IR than {ir_version} (max opset {ceiling})"
                ),
            ));
        }
    }

    graph.validate()?;

    for op in graph.operator_types() {
        let since = min_opset_for(op).ok_or_else(|| {
            Error::config(
                "opset_version",
                format!("operator '{op}' is not in the default-domain registry"),
            )
        })?;
        if opset_version < since {
            return Err(Error::config(
                "opset_version",
                format!("operator '{op}' requires opset >= {since}, got {opset_version}"),
            ));
        }
    }

    debug!(
        graph = %graph.name,
        ir_version,
        opset_version,
        nodes = graph.nodes.len(),
        "graph validated for serialization"
    );

    Ok(SerializedModel {
        producer_name: producer_name.to_string(),
        producer_version: env!("CARGO_PKG_VERSION").to_string(),
        ir_version,
        opset_entries: BTreeMap::from([(DEFAULT_DOMAIN.to_string(), opset_version)]),
        graph,
    })
}
