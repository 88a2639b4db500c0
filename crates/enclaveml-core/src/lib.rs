//! Authoring, validating and persisting minimal ONNX computation graphs.
//!
//! The usual flow is [`build_identity_graph`] → [`serialize`] →
//! [`save_to_path`]; [`load_from_path`] reads a container back.

pub mod artifact;
mod atomic;
pub mod backend;
pub mod builder;
pub mod convert;
pub mod error;
pub mod graph;
pub mod model;
pub mod tensor;

pub use artifact::*;
pub use backend::*;
pub use builder::*;
pub use convert::decode;
pub use error::{Error, Result};
pub use graph::*;
pub use model::*;
pub use tensor::*;
