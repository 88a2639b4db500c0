//! Mapping between the in-memory graph model and the ONNX wire schema.

use std::collections::BTreeMap;

use enclaveml_proto::onnx::{
    self, tensor_shape_proto::dimension::Value as DimValue, type_proto::Value as TypeValue,
};
use prost::Message;

use crate::{
    ComputationGraph, Dim, ElementType, Error, OperationNode, Result, SerializedModel, TensorSpec,
};

impl SerializedModel {
    pub fn to_proto(&self) -> onnx::ModelProto {
        onnx::ModelProto {
            ir_version: self.ir_version,
            opset_import: self
                .opset_entries
                .iter()
                .map(|(domain, version)| onnx::OperatorSetIdProto {
                    domain: domain.clone(),
                    version: *version,
                })
                .collect(),
            producer_name: self.producer_name.clone(),
            producer_version: self.producer_version.clone(),
            graph: Some(graph_to_proto(&self.graph)),
            ..Default::default()
        }
    }

    pub fn encode_to_vec(&self) -> Vec<u8> {
        self.to_proto().encode_to_vec()
    }

    /// Reads a container without re-running the authoring checks in `serialize`;
    /// files produced elsewhere may use operators this crate cannot author.
    pub fn from_proto(proto: onnx::ModelProto) -> Result<Self> {
        let graph = proto
            .graph
            .ok_or_else(|| Error::Decode("model has no graph".to_string()))?;

        let mut opset_entries = BTreeMap::new();
        for entry in proto.opset_import {
            opset_entries.insert(entry.domain, entry.version);
        }

        Ok(SerializedModel {
            producer_name: proto.producer_name,
            producer_version: proto.producer_version,
            ir_version: proto.ir_version,
            opset_entries,
            graph: graph_from_proto(graph)?,
        })
    }
}

pub fn decode(bytes: &[u8]) -> Result<SerializedModel> {
    let proto = onnx::ModelProto::decode(bytes)?;
    SerializedModel::from_proto(proto)
}

fn graph_to_proto(graph: &ComputationGraph) -> onnx::GraphProto {
    onnx::GraphProto {
        node: graph
            .nodes
            .iter()
            .map(|node| onnx::NodeProto {
                input: node.input_names.clone(),
                output: node.output_names.clone(),
                op_type: node.operator_type.clone(),
                ..Default::default()
            })
            .collect(),
        name: graph.name.clone(),
        input: graph.graph_inputs.iter().map(value_info).collect(),
        output: graph.graph_outputs.iter().map(value_info).collect(),
        ..Default::default()
    }
}

fn value_info(spec: &TensorSpec) -> onnx::ValueInfoProto {
    let dim = spec
        .shape
        .iter()
        .map(|d| onnx::tensor_shape_proto::Dimension {
            value: match d {
                // validate() keeps fixed axes within i64.
                Dim::Fixed(n) => Some(DimValue::DimValue(i64::try_from(*n).unwrap_or(i64::MAX))),
                Dim::Symbolic(name) if name.is_empty() => None,
                Dim::Symbolic(name) => Some(DimValue::DimParam(name.clone())),
            },
            ..Default::default()
        })
        .collect();

    onnx::ValueInfoProto {
        name: spec.name.clone(),
        r#type: Some(onnx::TypeProto {
            value: Some(TypeValue::TensorType(onnx::type_proto::Tensor {
                elem_type: spec.element_type.to_proto() as i32,
                shape: Some(onnx::TensorShapeProto { dim }),
            })),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn graph_from_proto(graph: onnx::GraphProto) -> Result<ComputationGraph> {
    let nodes = graph
        .node
        .into_iter()
        .map(|node| OperationNode {
            operator_type: node.op_type,
            input_names: node.input,
            output_names: node.output,
        })
        .collect();

    Ok(ComputationGraph {
        name: graph.name,
        nodes,
        graph_inputs: graph
            .input
            .into_iter()
            .map(tensor_spec_from_proto)
            .collect::<Result<Vec<_>>>()?,
        graph_outputs: graph
            .output
            .into_iter()
            .map(tensor_spec_from_proto)
            .collect::<Result<Vec<_>>>()?,
    })
}

fn tensor_spec_from_proto(info: onnx::ValueInfoProto) -> Result<TensorSpec> {
    let name = info.name;
    let Some(TypeValue::TensorType(tensor)) = info.r#type.and_then(|t| t.value) else {
        return Err(Error::Decode(format!("value '{name}' is not a tensor")));
    };

    let element_type = ElementType::from_proto(tensor.elem_type).ok_or_else(|| {
        Error::Decode(format!(
            "value '{name}' has unsupported element type code {}",
            tensor.elem_type
        ))
    })?;

    // An absent shape means unknown rank; it is read back as rank 0.
    let shape = tensor
        .shape
        .map(|s| s.dim)
        .unwrap_or_default()
        .into_iter()
        .map(|d| match d.value {
            Some(DimValue::DimValue(n)) => u64::try_from(n)
                .map(Dim::Fixed)
                .map_err(|_| Error::Decode(format!("value '{name}' has negative dimension {n}"))),
            Some(DimValue::DimParam(param)) => Ok(Dim::Symbolic(param)),
            None => Ok(Dim::Symbolic(String::new())),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TensorSpec {
        name,
        element_type,
        shape,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_identity_graph, serialize};

    fn identity_model() -> SerializedModel {
        let graph = build_identity_graph("input", "output", 2, ElementType::Float32).unwrap();
        serialize(graph, "onnx-example", 7, 12).unwrap()
    }

    #[test]
    fn proto_carries_header_fields() {
        let proto = identity_model().to_proto();
        assert_eq!(proto.ir_version, 7);
        assert_eq!(proto.producer_name, "onnx-example");
        assert_eq!(proto.opset_import.len(), 1);
        assert_eq!(proto.opset_import[0].domain, "");
        assert_eq!(proto.opset_import[0].version, 12);

        let graph = proto.graph.unwrap();
        assert_eq!(graph.name, "simple-identity-model");
        assert_eq!(graph.node.len(), 1);
        assert_eq!(graph.node[0].op_type, "Identity");
        assert_eq!(graph.node[0].input, vec!["input".to_string()]);
        assert_eq!(graph.node[0].output, vec!["output".to_string()]);
    }

    #[test]
    fn dims_map_to_value_and_param() {
        let proto = identity_model().to_proto();
        let graph = proto.graph.unwrap();
        let input = &graph.input[0];
        let Some(TypeValue::TensorType(tensor)) = input.r#type.clone().and_then(|t| t.value) else {
            panic!("input is not a tensor");
        };
        assert_eq!(tensor.elem_type, 1);
        let dims: Vec<_> = tensor.shape.unwrap().dim.into_iter().map(|d| d.value).collect();
        assert_eq!(
            dims,
            vec![
                Some(DimValue::DimParam("batch".to_string())),
                Some(DimValue::DimValue(2)),
            ]
        );
    }

    #[test]
    fn anonymous_dims_survive_decode() {
        let mut model = identity_model();
        model.graph.graph_inputs[0].shape[0] = Dim::Symbolic(String::new());
        let decoded = decode(&model.encode_to_vec()).unwrap();
        assert_eq!(decoded.graph.graph_inputs[0].shape[0], Dim::Symbolic(String::new()));
    }

    #[test]
    fn decode_round_trips_the_model() {
        let model = identity_model();
        assert_eq!(decode(&model.encode_to_vec()).unwrap(), model);
    }

    #[test]
    fn decode_rejects_missing_graph() {
        let bytes = onnx::ModelProto {
            ir_version: 10,
            ..Default::default()
        }
        .encode_to_vec();
        assert!(matches!(decode(&bytes), Err(Error::Decode(_))));
    }

    #[test]
    fn decode_rejects_non_tensor_values() {
        let mut proto = identity_model().to_proto();
        if let Some(graph) = proto.graph.as_mut() {
            graph.output[0].r#type = Some(onnx::TypeProto::default());
        }
        let err = decode(&proto.encode_to_vec()).unwrap_err();
        assert!(err.to_string().contains("'output' is not a tensor"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode(b"definitely not protobuf"), Err(Error::Decode(_))));
    }
}
