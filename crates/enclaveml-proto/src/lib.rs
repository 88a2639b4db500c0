//! Generated ONNX schema messages.
//!
//! Only the subset of `onnx.proto` needed to author and read back graph
//! containers is compiled; field numbers match upstream so files stay
//! loadable by any conformant reader. Unknown fields are skipped on decode.

pub mod onnx {
    include!(concat!(env!("OUT_DIR"), "/onnx.rs"));
}
