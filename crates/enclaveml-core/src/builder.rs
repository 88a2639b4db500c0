use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};

use crate::atomic::atomic_write;
use crate::convert::decode;
use crate::{
    serialize, ComputationGraph, Dim, ElementType, Error, OperationNode, Result, SerializedModel,
    TensorSpec, MAX_FIXED_DIM,
};

pub const IDENTITY_GRAPH_NAME: &str = "simple-identity-model";
pub const BATCH_DIM: &str = "batch";
pub const DEFAULT_PRODUCER: &str = "enclaveml";

/// Single `Identity` node mapping `[batch, feature_dim]` to the same shape.
pub fn build_identity_graph(
    input_name: &str,
    output_name: &str,
    feature_dim: u64,
    element_type: ElementType,
) -> Result<ComputationGraph> {
    if feature_dim == 0 {
        return Err(Error::config("feature_dim", "must be a positive integer"));
    }
    if feature_dim > MAX_FIXED_DIM {
        return Err(Error::config(
            "feature_dim",
            format!("{feature_dim} exceeds the largest storable axis {MAX_FIXED_DIM}"),
        ));
    }
    if input_name.trim().is_empty() {
        return Err(Error::config("input_name", "must not be empty"));
    }
    if output_name.trim().is_empty() {
        return Err(Error::config("output_name", "must not be empty"));
    }
    if input_name == output_name {
        return Err(Error::config(
            "output_name",
            format!("must differ from input_name '{input_name}'"),
        ));
    }

    let shape = vec![Dim::symbolic(BATCH_DIM), Dim::Fixed(feature_dim)];
    Ok(ComputationGraph {
        name: IDENTITY_GRAPH_NAME.to_string(),
        nodes: vec![OperationNode::new(
            "Identity",
            vec![input_name.to_string()],
            vec![output_name.to_string()],
        )],
        graph_inputs: vec![TensorSpec::new(input_name, element_type, shape.clone())],
        graph_outputs: vec![TensorSpec::new(output_name, element_type, shape)],
    })
}

/// Writes the encoded container to `path`, creating parent directories as needed.
/// An existing file is replaced atomically; nothing partial is left on failure.
pub fn save_to_path(model: &SerializedModel, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = model.encode_to_vec();
    debug!(graph = %model.graph.name, bytes = bytes.len(), "encoded model container");

    atomic_write(path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "saved model container");
    Ok(())
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<SerializedModel> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::lookup("model container", path),
        _ => Error::io(path, e),
    })?;
    decode(&bytes)
}

/// Everything needed to author one identity container. The IR and opset
/// versions have no defaults; callers must pick them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildConfig {
    pub producer_name: String,
    pub ir_version: i64,
    pub opset_version: i64,
    pub input_name: String,
    pub output_name: String,
    pub feature_dim: u64,
    pub element_type: ElementType,
}

impl BuildConfig {
    pub fn identity(ir_version: i64, opset_version: i64) -> Self {
        Self {
            producer_name: DEFAULT_PRODUCER.to_string(),
            ir_version,
            opset_version,
            input_name: "input_tensor".to_string(),
            output_name: "output_tensor".to_string(),
            feature_dim: 2,
            element_type: ElementType::Float32,
        }
    }

    pub fn build(&self) -> Result<SerializedModel> {
        let graph = build_identity_graph(
            &self.input_name,
            &self.output_name,
            self.feature_dim,
            self.element_type,
        )?;
        serialize(graph, &self.producer_name, self.ir_version, self.opset_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_graph_matches_reference_layout() {
        let graph =
            build_identity_graph("input_tensor", "output_tensor", 2, ElementType::Float32).unwrap();

        assert_eq!(graph.graph_inputs.len(), 1);
        assert_eq!(graph.graph_outputs.len(), 1);
        let input = &graph.graph_inputs[0];
        let output = &graph.graph_outputs[0];
        assert_eq!(input.name, "input_tensor");
        assert_eq!(output.name, "output_tensor");
        assert_eq!(input.element_type, ElementType::Float32);
        assert_eq!(input.shape, vec![Dim::symbolic("batch"), Dim::Fixed(2)]);
        assert_eq!(input.shape, output.shape);
        assert_eq!(input.element_type, output.element_type);

        assert_eq!(
            graph.nodes,
            vec![OperationNode::new(
                "Identity",
                vec!["input_tensor".into()],
                vec!["output_tensor".into()],
            )]
        );
        graph.validate().unwrap();
    }

    #[test]
    fn shapes_agree_for_any_feature_dim_and_type() {
        for feature_dim in [1u64, 2, 3, 17, 768, 4096, u32::MAX as u64] {
            for element_type in ElementType::ALL {
                let graph = build_identity_graph("x", "y", feature_dim, element_type).unwrap();
                let (input, output) = (&graph.graph_inputs[0], &graph.graph_outputs[0]);
                assert_eq!(input.shape, output.shape);
                assert_eq!(input.element_type, output.element_type);
                assert!(input.shape[0].is_dynamic());
                assert_eq!(input.shape[1], Dim::Fixed(feature_dim));
                graph.validate().unwrap();
            }
        }
    }

    #[test]
    fn rejects_bad_arguments_by_field() {
        let cases = [
            ("x", "y", 0, "feature_dim"),
            ("", "y", 2, "input_name"),
            ("  ", "y", 2, "input_name"),
            ("x", "", 2, "output_name"),
            ("same", "same", 2, "output_name"),
            ("x", "y", MAX_FIXED_DIM + 1, "feature_dim"),
            ("x", "y", u64::MAX, "feature_dim"),
        ];
        for (input, output, dim, expected) in cases {
            match build_identity_graph(input, output, dim, ElementType::Float32) {
                Err(Error::Configuration { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected {expected} rejection, got {other:?}"),
            }
        }
    }

    #[test]
    fn build_config_uses_default_producer() {
        let model = BuildConfig::identity(10, 10).build().unwrap();
        assert_eq!(model.producer_name, DEFAULT_PRODUCER);
    }

    #[test]
    fn build_config_requires_compatible_versions() {
        assert!(BuildConfig::identity(10, 10).build().is_ok());
        assert!(BuildConfig::identity(7, 12).build().is_ok());
        assert!(BuildConfig::identity(10, 0).build().unwrap_err().is_configuration());
        assert!(BuildConfig::identity(12, 12).build().unwrap_err().is_configuration());
    }

    #[test]
    fn largest_feature_dim_survives_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("wide.onnx");
        let graph = build_identity_graph("x", "y", MAX_FIXED_DIM, ElementType::Float32).unwrap();
        save_to_path(&serialize(graph, "t", 10, 10).unwrap(), &path).unwrap();

        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded.graph.graph_inputs[0].shape[1], Dim::Fixed(MAX_FIXED_DIM));
        assert_eq!(loaded.graph.graph_outputs[0].shape[1], Dim::Fixed(MAX_FIXED_DIM));
    }

    #[test]
    fn missing_file_is_a_lookup_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_from_path(tmp.path().join("absent.onnx")).unwrap_err();
        assert!(matches!(err, Error::Lookup { what: "model container", .. }));
    }
}
