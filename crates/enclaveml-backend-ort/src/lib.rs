use std::fmt::Debug;

use anyhow::{bail, ensure, Context, Result};
use bytes::Bytes;
use enclaveml_core::{
    Backend, BackendModel, Device, Dim, ElementType, Error, ModelArtifact, ModelSignature, Shape,
    Tensor, TensorSpec,
};
use ort::{
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session, SessionInputValue,
    },
    tensor::{PrimitiveTensorElementType, TensorElementType},
    value::{DynValue, ValueRef, ValueType},
};
use tracing::debug;

pub struct OrtBackend;

impl OrtBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrtBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub struct OrtModel {
    signature: ModelSignature,
    session: Session,
    input_names: Vec<String>,
}

impl Backend for OrtBackend {
    type Model = OrtModel;

    fn name(&self) -> &'static str {
        "onnxruntime"
    }

    fn load(&self, artifact: &ModelArtifact, device: Device) -> Result<Self::Model> {
        let path = artifact.model_path();
        if !path.is_file() {
            return Err(Error::lookup("model container", &path).into());
        }

        let builder = Session::builder()
            .context("failed to create ORT session builder")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("failed to configure ORT session builder")?;

        let builder = configure_session_builder(builder, &device)?;

        let session = builder
            .commit_from_file(&path)
            .with_context(|| format!("failed to load ONNX model from {}", path.display()))?;

        let input_names = session
            .inputs
            .iter()
            .map(|input| input.name.clone())
            .collect();

        let signature = build_signature(&session)?;
        debug!(
            path = %path.display(),
            inputs = signature.inputs.len(),
            outputs = signature.outputs.len(),
            "loaded ORT session"
        );

        Ok(OrtModel {
            signature,
            session,
            input_names,
        })
    }
}

impl BackendModel for OrtModel {
    fn signature(&self) -> &ModelSignature {
        &self.signature
    }

    fn infer(&mut self, inputs: Vec<Tensor>) -> Result<Vec<Tensor>> {
        ensure!(
            inputs.len() == self.input_names.len(),
            "expected {} inputs, got {}",
            self.input_names.len(),
            inputs.len()
        );

        let mut ort_inputs = Vec::with_capacity(inputs.len());
        for (name, input) in self.input_names.iter().zip(inputs) {
            let value = tensor_to_ort_value(input)?;
            ort_inputs.push((name.clone(), SessionInputValue::from(value)));
        }

        let outputs = self.session.run(ort_inputs)?;
        let mut out_tensors = Vec::with_capacity(outputs.len());
        for (_, value) in outputs.iter() {
            out_tensors.push(ort_value_to_tensor(&value)?);
        }

        Ok(out_tensors)
    }
}

/// Outcome of running an identity container once.
#[derive(Clone, Debug)]
pub struct IdentityCheck {
    pub input_name: String,
    pub output_name: String,
    pub shape: Vec<usize>,
    pub bytes: usize,
}

/// Runs the model on a generated `[batch, ...]` FLOAT tensor and checks the
/// single output is byte-identical to the input. `batch` may be 0, in which
/// case the output must be an empty tensor of shape `[0, ...]`.
pub fn verify_identity(
    artifact: &ModelArtifact,
    device: Device,
    batch: usize,
) -> Result<IdentityCheck> {
    let mut model = OrtBackend::new().load(artifact, device)?;
    let signature = model.signature().clone();
    ensure!(
        signature.inputs.len() == 1 && signature.outputs.len() == 1,
        "identity check expects one input and one output, model has {} and {}",
        signature.inputs.len(),
        signature.outputs.len()
    );

    let input_spec = &signature.inputs[0];
    ensure!(
        input_spec.element_type == ElementType::Float32,
        "identity check expects a FLOAT input, got {}",
        input_spec.element_type
    );

    let shape = concrete_shape(input_spec, batch)?;
    let numel = shape.iter().product::<usize>();
    let data: Vec<f32> = (0..numel).map(|i| i as f32 * 0.5 - 1.0).collect();
    let input = Tensor::from_f32(Shape::from_slice(&shape), &data)?;

    let outputs = model.infer(vec![input.clone()])?;
    let output = outputs.first().context("model produced no outputs")?;
    ensure!(
        output.dtype == input.dtype,
        "output type {} differs from input type {}",
        output.dtype,
        input.dtype
    );
    ensure!(
        output.shape == input.shape,
        "output shape {:?} differs from input shape {:?}",
        output.shape.0.as_slice(),
        shape
    );
    ensure!(output.data == input.data, "output bytes differ from input bytes");

    Ok(IdentityCheck {
        input_name: input_spec.name.clone(),
        output_name: signature.outputs[0].name.clone(),
        shape,
        bytes: input.data.len(),
    })
}

/// Leading dynamic axis becomes `batch`; any other dynamic axis is an error.
fn concrete_shape(spec: &TensorSpec, batch: usize) -> Result<Vec<usize>> {
    spec.shape
        .iter()
        .enumerate()
        .map(|(axis, dim)| match dim {
            Dim::Fixed(n) => usize::try_from(*n).context("dimension does not fit in usize"),
            Dim::Symbolic(_) if axis == 0 => Ok(batch),
            Dim::Symbolic(name) => bail!(
                "input '{}' has dynamic axis {axis} ({name:?}) beyond the batch axis",
                spec.name
            ),
        })
        .collect()
}

fn build_signature(session: &Session) -> Result<ModelSignature> {
    let inputs = session
        .inputs
        .iter()
        .map(|input| tensor_spec_from_value_type(&input.name, &input.input_type))
        .collect::<Result<Vec<_>>>()?;

    let outputs = session
        .outputs
        .iter()
        .map(|output| tensor_spec_from_value_type(&output.name, &output.output_type))
        .collect::<Result<Vec<_>>>()?;

    Ok(ModelSignature { inputs, outputs })
}

fn configure_session_builder(builder: SessionBuilder, device: &Device) -> Result<SessionBuilder> {
    match device {
        Device::Cpu => Ok(builder),
        Device::Cuda { device_id } => configure_cuda(builder, *device_id),
    }
}

fn configure_cuda(builder: SessionBuilder, device_id: u32) -> Result<SessionBuilder> {
    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::cuda::CUDAExecutionProvider;
        let ep = CUDAExecutionProvider::default()
            .with_device_id(device_id as i32)
            .build();
        builder
            .with_execution_providers([ep])
            .context("failed to enable ORT CUDA execution provider")
    }
    #[cfg(not(feature = "cuda"))]
    {
        let _ = (builder, device_id);
        bail!("CUDA requested but enclaveml-backend-ort was built without the `cuda` feature")
    }
}

fn tensor_spec_from_value_type(name: &str, value_type: &ValueType) -> Result<TensorSpec> {
    let ValueType::Tensor { ty, shape, .. } = value_type else {
        bail!("unsupported non-tensor IO value type for '{name}'");
    };

    let element_type = ort_element_to_element_type(*ty)?;
    let dims = shape
        .iter()
        .map(|d| {
            if *d < 0 {
                Dim::Symbolic(String::new())
            } else {
                Dim::Fixed(*d as u64)
            }
        })
        .collect();

    Ok(TensorSpec::new(name, element_type, dims))
}

fn ort_element_to_element_type(ty: TensorElementType) -> Result<ElementType> {
    match ty {
        TensorElementType::Float32 => Ok(ElementType::Float32),
        TensorElementType::Float64 => Ok(ElementType::Float64),
        TensorElementType::Float16 => Ok(ElementType::Float16),
        TensorElementType::Bfloat16 => Ok(ElementType::Bfloat16),
        TensorElementType::Int8 => Ok(ElementType::Int8),
        TensorElementType::Int16 => Ok(ElementType::Int16),
        TensorElementType::Int32 => Ok(ElementType::Int32),
        TensorElementType::Int64 => Ok(ElementType::Int64),
        TensorElementType::Uint8 => Ok(ElementType::Uint8),
        TensorElementType::Uint16 => Ok(ElementType::Uint16),
        TensorElementType::Uint32 => Ok(ElementType::Uint32),
        TensorElementType::Uint64 => Ok(ElementType::Uint64),
        TensorElementType::Bool => Ok(ElementType::Bool),
        TensorElementType::String => Ok(ElementType::String),
        #[allow(unreachable_patterns)]
        _ => bail!("unsupported tensor element type: {ty}"),
    }
}

/// Fixed-width scalars moved between `Bytes` and ORT buffers, little-endian.
trait LeScalar: PrimitiveTensorElementType + Debug + Clone + 'static {
    const WIDTH: usize;
    fn read(chunk: &[u8]) -> Self;
    fn write(&self, out: &mut Vec<u8>);
}

macro_rules! le_scalar {
    ($($t:ty),*) => {
        $(impl LeScalar for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();

            fn read(chunk: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(chunk);
                <$t>::from_le_bytes(buf)
            }

            fn write(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        })*
    };
}

le_scalar!(f32, f64, i8, i32, i64, u8);

fn to_ort<T: LeScalar>(shape: Vec<usize>, bytes: &Bytes) -> Result<DynValue> {
    let data: Vec<T> = bytes.chunks_exact(T::WIDTH).map(T::read).collect();
    Ok(ort::value::Tensor::from_array((shape, data))?.into_dyn())
}

fn from_ort<T: LeScalar>(value: &ValueRef<'_>, dtype: ElementType, shape: Shape) -> Result<Tensor> {
    let array = value.try_extract_array::<T>()?;
    let slice = array.as_slice().context("non-contiguous output tensor")?;
    let mut data = Vec::with_capacity(slice.len() * T::WIDTH);
    for v in slice {
        v.write(&mut data);
    }
    Tensor::from_cpu_bytes(dtype, shape, Bytes::from(data))
}

fn tensor_to_ort_value(tensor: Tensor) -> Result<DynValue> {
    let shape: Vec<usize> = tensor.shape.0.iter().copied().collect();

    match tensor.dtype {
        ElementType::Float32 => to_ort::<f32>(shape, &tensor.data),
        ElementType::Float64 => to_ort::<f64>(shape, &tensor.data),
        ElementType::Int8 => to_ort::<i8>(shape, &tensor.data),
        ElementType::Int32 => to_ort::<i32>(shape, &tensor.data),
        ElementType::Int64 => to_ort::<i64>(shape, &tensor.data),
        ElementType::Uint8 => to_ort::<u8>(shape, &tensor.data),
        other => bail!("{other} inputs are not supported yet"),
    }
}

fn ort_value_to_tensor(value: &ValueRef<'_>) -> Result<Tensor> {
    let ValueType::Tensor { ty, shape, .. } = value.dtype() else {
        bail!("non-tensor outputs are not supported");
    };

    let dims: Vec<usize> = shape.iter().map(|d| *d as usize).collect();
    let shape = Shape::from_slice(&dims);

    // ORT may hand back a null data pointer for zero-sized outputs.
    if shape.numel() == 0 {
        let dtype = ort_element_to_element_type(*ty)?;
        return Tensor::from_cpu_bytes(dtype, shape, Bytes::new());
    }

    match *ty {
        TensorElementType::Float32 => from_ort::<f32>(value, ElementType::Float32, shape),
        TensorElementType::Float64 => from_ort::<f64>(value, ElementType::Float64, shape),
        TensorElementType::Int8 => from_ort::<i8>(value, ElementType::Int8, shape),
        TensorElementType::Int32 => from_ort::<i32>(value, ElementType::Int32, shape),
        TensorElementType::Int64 => from_ort::<i64>(value, ElementType::Int64, shape),
        TensorElementType::Uint8 => from_ort::<u8>(value, ElementType::Uint8, shape),
        other => bail!("unsupported output tensor element type: {other}"),
    }
}
