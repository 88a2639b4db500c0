use std::fmt;
use std::str::FromStr;

use anyhow::{ensure, Result};
use bytes::Bytes;
use enclaveml_proto::onnx::tensor_proto::DataType;
use smallvec::SmallVec;

#[derive(Clone, Debug)]
pub enum Device {
    Cpu,
    Cuda { device_id: u32 },
}

/// Tensor element type, mirroring `TensorProto.DataType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    Float32,
    Uint8,
    Int8,
    Uint16,
    Int16,
    Int32,
    Int64,
    String,
    Bool,
    Float16,
    Float64,
    Uint32,
    Uint64,
    Complex64,
    Complex128,
    Bfloat16,
    Float8E4M3Fn,
    Float8E4M3Fnuz,
    Float8E5M2,
    Float8E5M2Fnuz,
    Uint4,
    Int4,
}

impl ElementType {
    pub const ALL: [ElementType; 22] = [
        ElementType::Float32,
        ElementType::Uint8,
        ElementType::Int8,
        ElementType::Uint16,
        ElementType::Int16,
        ElementType::Int32,
        ElementType::Int64,
        ElementType::String,
        ElementType::Bool,
        ElementType::Float16,
        ElementType::Float64,
        ElementType::Uint32,
        ElementType::Uint64,
        ElementType::Complex64,
        ElementType::Complex128,
        ElementType::Bfloat16,
        ElementType::Float8E4M3Fn,
        ElementType::Float8E4M3Fnuz,
        ElementType::Float8E5M2,
        ElementType::Float8E5M2Fnuz,
        ElementType::Uint4,
        ElementType::Int4,
    ];

    pub fn to_proto(self) -> DataType {
        match self {
            ElementType::Float32 => DataType::Float,
            ElementType::Uint8 => DataType::Uint8,
            ElementType::Int8 => DataType::Int8,
            ElementType::Uint16 => DataType::Uint16,
            ElementType::Int16 => DataType::Int16,
            ElementType::Int32 => DataType::Int32,
            ElementType::Int64 => DataType::Int64,
            ElementType::String => DataType::String,
            ElementType::Bool => DataType::Bool,
            ElementType::Float16 => DataType::Float16,
            ElementType::Float64 => DataType::Double,
            ElementType::Uint32 => DataType::Uint32,
            ElementType::Uint64 => DataType::Uint64,
            ElementType::Complex64 => DataType::Complex64,
            ElementType::Complex128 => DataType::Complex128,
            ElementType::Bfloat16 => DataType::Bfloat16,
            ElementType::Float8E4M3Fn => DataType::Float8e4m3fn,
            ElementType::Float8E4M3Fnuz => DataType::Float8e4m3fnuz,
            ElementType::Float8E5M2 => DataType::Float8e5m2,
            ElementType::Float8E5M2Fnuz => DataType::Float8e5m2fnuz,
            ElementType::Uint4 => DataType::Uint4,
            ElementType::Int4 => DataType::Int4,
        }
    }

    /// `None` for `UNDEFINED` and codes this schema does not know.
    pub fn from_proto(raw: i32) -> Option<Self> {
        let data_type = DataType::try_from(raw).ok()?;
        ElementType::ALL
            .into_iter()
            .find(|ty| ty.to_proto() == data_type)
    }

    /// Bytes per element for fixed-width types. Strings and sub-byte types have none.
    pub fn byte_size(self) -> Option<usize> {
        match self {
            ElementType::Uint8
            | ElementType::Int8
            | ElementType::Bool
            | ElementType::Float8E4M3Fn
            | ElementType::Float8E4M3Fnuz
            | ElementType::Float8E5M2
            | ElementType::Float8E5M2Fnuz => Some(1),
            ElementType::Uint16
            | ElementType::Int16
            | ElementType::Float16
            | ElementType::Bfloat16 => Some(2),
            ElementType::Float32 | ElementType::Int32 | ElementType::Uint32 => Some(4),
            ElementType::Float64
            | ElementType::Int64
            | ElementType::Uint64
            | ElementType::Complex64 => Some(8),
            ElementType::Complex128 => Some(16),
            ElementType::String | ElementType::Uint4 | ElementType::Int4 => None,
        }
    }

    pub fn name(self) -> &'static str {
        self.to_proto().as_str_name()
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementType {
    type Err = String;

    /// Accepts the schema names (`FLOAT`, `INT64`) and the short Rust-ish
    /// spellings (`f32`, `float32`, `i64`), case-insensitively.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let alias = match upper.as_str() {
            "F32" | "FLOAT32" => Some(ElementType::Float32),
            "F64" | "FLOAT64" => Some(ElementType::Float64),
            "F16" => Some(ElementType::Float16),
            "BF16" => Some(ElementType::Bfloat16),
            "I8" => Some(ElementType::Int8),
            "I16" => Some(ElementType::Int16),
            "I32" => Some(ElementType::Int32),
            "I64" => Some(ElementType::Int64),
            "U8" => Some(ElementType::Uint8),
            "U16" => Some(ElementType::Uint16),
            "U32" => Some(ElementType::Uint32),
            "U64" => Some(ElementType::Uint64),
            _ => None,
        };
        if let Some(ty) = alias {
            return Ok(ty);
        }

        ElementType::ALL
            .into_iter()
            .find(|ty| ty.name() == upper)
            .ok_or_else(|| format!("unknown element type: {s}"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape(pub SmallVec<[usize; 6]>);

impl Shape {
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().copied().collect())
    }
    pub fn rank(&self) -> usize {
        self.0.len()
    }
    /// Element count; a zero-sized axis makes the tensor empty.
    pub fn numel(&self) -> usize {
        self.0.iter().product::<usize>()
    }
}

/// A dense, little-endian CPU tensor handed to and returned from backends.
#[derive(Clone, Debug)]
pub struct Tensor {
    pub dtype: ElementType,
    pub shape: Shape,
    pub data: Bytes,
}

impl Tensor {
    pub fn from_cpu_bytes(dtype: ElementType, shape: Shape, data: Bytes) -> Result<Self> {
        if let Some(size) = dtype.byte_size() {
            let expected = shape.numel() * size;
            ensure!(
                data.len() == expected,
                "{dtype} tensor of shape {:?} needs {expected} bytes, got {}",
                shape.0.as_slice(),
                data.len()
            );
        }
        Ok(Self { dtype, shape, data })
    }

    pub fn from_f32(shape: Shape, values: &[f32]) -> Result<Self> {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_cpu_bytes(ElementType::Float32, shape, Bytes::from(data))
    }

    pub fn to_f32(&self) -> Result<Vec<f32>> {
        ensure!(
            self.dtype == ElementType::Float32,
            "expected FLOAT tensor, got {}",
            self.dtype
        );
        Ok(self
            .data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}
