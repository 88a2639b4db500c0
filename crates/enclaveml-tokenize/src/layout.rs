use std::path::{Path, PathBuf};

use anyhow::Result;
use enclaveml_core::{load_from_path, Error, SerializedModel, EXPORTED_MODEL_FILE};

use crate::{BatchTokenizer, TOKENIZER_FILE};

/// Tokenizer-side files an exporter may write next to `tokenizer.json`.
pub const OPTIONAL_ARTIFACTS: [&str; 5] = [
    "tokenizer_config.json",
    "special_tokens_map.json",
    "vocab.txt",
    "config.json",
    "ort_config.json",
];

/// A directory holding an exported model container and its tokenizer.
#[derive(Clone, Debug)]
pub struct ExportLayout {
    pub dir: PathBuf,
    pub model: PathBuf,
    pub tokenizer: PathBuf,
    pub extras: Vec<PathBuf>,
}

impl ExportLayout {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::lookup("export directory", dir).into());
        }

        let model = dir.join(EXPORTED_MODEL_FILE);
        if !model.is_file() {
            return Err(Error::lookup("model container", &model).into());
        }

        let tokenizer = dir.join(TOKENIZER_FILE);
        if !tokenizer.is_file() {
            return Err(Error::lookup("tokenizer", &tokenizer).into());
        }

        let extras = OPTIONAL_ARTIFACTS
            .iter()
            .map(|name| dir.join(name))
            .filter(|path| path.is_file())
            .collect();

        Ok(Self {
            dir: dir.to_path_buf(),
            model,
            tokenizer,
            extras,
        })
    }

    pub fn load_model(&self) -> Result<SerializedModel> {
        Ok(load_from_path(&self.model)?)
    }

    pub fn load_tokenizer(&self) -> Result<BatchTokenizer> {
        BatchTokenizer::from_file(&self.tokenizer)
    }
}
