use anyhow::Result;

use crate::{Device, ModelArtifact, Tensor, TensorSpec};

/// Input and output tensors a loaded model reports.
#[derive(Clone, Debug, Default)]
pub struct ModelSignature {
    pub inputs: Vec<TensorSpec>,
    pub outputs: Vec<TensorSpec>,
}

pub trait Backend: Send + Sync + 'static {
    type Model: BackendModel;

    fn name(&self) -> &'static str;
    fn load(&self, artifact: &ModelArtifact, device: Device) -> Result<Self::Model>;
}

pub trait BackendModel: Send + 'static {
    fn signature(&self) -> &ModelSignature;

    /// One tensor per declared input, in declaration order.
    fn infer(&mut self, inputs: Vec<Tensor>) -> Result<Vec<Tensor>>;
}
