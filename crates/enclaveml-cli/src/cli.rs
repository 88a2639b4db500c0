use std::path::PathBuf;

use clap::{Parser, Subcommand};
use enclaveml_core::DEFAULT_PRODUCER;

#[derive(Parser, Debug)]
#[command(name = "enclaveml", version, about = "Build, inspect and run enclave ML models")]
pub struct Cli {
    /// Log filter (RUST_LOG syntax); logs go to stderr
    #[arg(long, global = true, default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the identity model and save it as an ONNX container
    CreateModel {
        /// Destination path; parent directories are created
        #[arg(default_value = "model/simple_model.onnx")]
        path: PathBuf,

        /// Container IR version (3..=10)
        #[arg(long)]
        ir_version: i64,

        /// Default-domain opset version
        #[arg(long)]
        opset_version: i64,

        #[arg(long, default_value = DEFAULT_PRODUCER)]
        producer_name: String,

        #[arg(long, default_value = "input_tensor")]
        input_name: String,

        #[arg(long, default_value = "output_tensor")]
        output_name: String,

        /// Size of the fixed feature axis
        #[arg(long, default_value_t = 2)]
        feature_dim: u64,

        /// Element type (FLOAT, INT64, f32, ...)
        #[arg(long, default_value = "FLOAT")]
        element_type: String,
    },

    /// Tokenize stdin line by line, printing comma-separated token ids
    Tokenize {
        /// Directory containing tokenizer.json
        tokenizer_dir: PathBuf,
    },

    /// Print the header, inputs and outputs of a saved container
    Inspect {
        path: PathBuf,
    },

    /// Run a container with ONNX Runtime and check output equals input
    Verify {
        path: PathBuf,

        /// Rows fed through the dynamic batch axis
        #[arg(long, default_value_t = 4)]
        batch: usize,

        /// Device for inference (cpu or cuda:N)
        #[arg(long, default_value = "cpu")]
        device: String,
    },

    /// Check an exported model directory (model.onnx + tokenizer files)
    CheckExport {
        dir: PathBuf,
    },
}
