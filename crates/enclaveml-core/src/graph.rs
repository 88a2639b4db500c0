use std::collections::HashSet;
use std::fmt;

use crate::{ElementType, Error, Result};

/// Largest fixed axis the container can carry (`dim_value` is a signed 64-bit field).
pub const MAX_FIXED_DIM: u64 = i64::MAX as u64;

/// One axis of a tensor shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dim {
    Fixed(u64),
    /// Resolved at execution time. An empty name is an anonymous dynamic axis.
    Symbolic(String),
}

impl Dim {
    pub fn symbolic(name: impl Into<String>) -> Self {
        Dim::Symbolic(name.into())
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Dim::Symbolic(_))
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(n) => write!(f, "{n}"),
            Dim::Symbolic(name) if name.is_empty() => f.write_str("?"),
            Dim::Symbolic(name) => f.write_str(name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorSpec {
    pub name: String,
    pub element_type: ElementType,
    pub shape: Vec<Dim>,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, element_type: ElementType, shape: Vec<Dim>) -> Self {
        Self {
            name: name.into(),
            element_type,
            shape,
        }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// `[batch, 2]` style rendering used in summaries.
    pub fn shape_string(&self) -> String {
        let dims: Vec<String> = self.shape.iter().map(Dim::to_string).collect();
        format!("[{}]", dims.join(", "))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationNode {
    pub operator_type: String,
    pub input_names: Vec<String>,
    pub output_names: Vec<String>,
}

impl OperationNode {
    pub fn new(
        operator_type: impl Into<String>,
        input_names: Vec<String>,
        output_names: Vec<String>,
    ) -> Self {
        Self {
            operator_type: operator_type.into(),
            input_names,
            output_names,
        }
    }
}

/// Nodes are stored in execution order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComputationGraph {
    pub name: String,
    pub nodes: Vec<OperationNode>,
    pub graph_inputs: Vec<TensorSpec>,
    pub graph_outputs: Vec<TensorSpec>,
}

impl ComputationGraph {
    pub fn operator_types(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.operator_type.as_str())
    }

    /// Checks name hygiene, single assignment and reference integrity.
    ///
    /// A name may appear both as graph input and graph output only when no
    /// node produces it, i.e. the value passes straight through the graph.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("graph.name", "must not be empty"));
        }

        let input_names = unique_names("graph_inputs", &self.graph_inputs)?;
        let output_names = unique_names("graph_outputs", &self.graph_outputs)?;
        for spec in self.graph_inputs.iter().chain(&self.graph_outputs) {
            check_shape(spec)?;
        }

        let mut defined: HashSet<&str> = input_names.clone();
        for (idx, node) in self.nodes.iter().enumerate() {
            if node.operator_type.trim().is_empty() {
                return Err(Error::config(
                    format!("nodes[{idx}].operator_type"),
                    "must not be empty",
                ));
            }
            if node.output_names.is_empty() {
                return Err(Error::config(
                    format!("nodes[{idx}].output_names"),
                    "node produces no values",
                ));
            }

            // Empty strings mark omitted optional inputs.
            for name in node.input_names.iter().filter(|n| !n.is_empty()) {
                if !defined.contains(name.as_str()) {
                    return Err(Error::config(
                        format!("nodes[{idx}].input_names"),
                        format!("'{name}' is not a graph input or an earlier node output"),
                    ));
                }
            }
            for name in &node.output_names {
                if name.is_empty() {
                    return Err(Error::config(
                        format!("nodes[{idx}].output_names"),
                        "output names must not be empty",
                    ));
                }
                if !defined.insert(name.as_str()) {
                    return Err(Error::config(
                        format!("nodes[{idx}].output_names"),
                        format!("'{name}' is already defined"),
                    ));
                }
            }
        }

        for name in &output_names {
            if !defined.contains(name) {
                return Err(Error::config(
                    "graph_outputs",
                    format!("'{name}' is never produced"),
                ));
            }
        }

        Ok(())
    }
}

fn unique_names<'a>(field: &str, specs: &'a [TensorSpec]) -> Result<HashSet<&'a str>> {
    let mut seen = HashSet::with_capacity(specs.len());
    for spec in specs {
        if spec.name.trim().is_empty() {
            return Err(Error::config(field, "tensor names must not be empty"));
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(Error::config(
                field,
                format!("duplicate tensor name '{}'", spec.name),
            ));
        }
    }
    Ok(seen)
}

fn check_shape(spec: &TensorSpec) -> Result<()> {
    for (axis, dim) in spec.shape.iter().enumerate() {
        match dim {
            Dim::Fixed(0) => {
                return Err(Error::config(
                    format!("{}.shape", spec.name),
                    format!("axis {axis} has fixed size 0"),
                ));
            }
            Dim::Fixed(n) if *n > MAX_FIXED_DIM => {
                return Err(Error::config(
                    format!("{}.shape", spec.name),
                    format!("axis {axis} size {n} exceeds {MAX_FIXED_DIM}"),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}
