use std::path::PathBuf;

/// File name the pretrained exporter gives the model container.
pub const EXPORTED_MODEL_FILE: &str = "model.onnx";

#[derive(Clone, Debug)]
pub enum ModelArtifact {
    OnnxPath(PathBuf),
    /// Directory holding `model.onnx` next to its tokenizer files.
    ExportDir(PathBuf),
}

impl ModelArtifact {
    pub fn model_path(&self) -> PathBuf {
        match self {
            ModelArtifact::OnnxPath(path) => path.clone(),
            ModelArtifact::ExportDir(dir) => dir.join(EXPORTED_MODEL_FILE),
        }
    }
}
