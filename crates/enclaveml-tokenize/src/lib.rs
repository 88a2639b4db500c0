//! Batch tokenization of newline-delimited text, and the on-disk layout a
//! pretrained exporter leaves behind.

pub mod layout;

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use enclaveml_core::Error;
use tokenizers::Tokenizer;
use tracing::{debug, info};

pub use layout::ExportLayout;

pub const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct BatchTokenizer {
    tokenizer: Tokenizer,
    source: PathBuf,
}

impl BatchTokenizer {
    /// Loads `tokenizer.json` from a tokenizer artifact directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::lookup("tokenizer directory", dir).into());
        }
        Self::from_file(dir.join(TOKENIZER_FILE))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::lookup("tokenizer", path).into());
        }

        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("cannot load tokenizer from '{}': {e}", path.display()))?;
        info!(path = %path.display(), vocab = tokenizer.get_vocab_size(true), "loaded tokenizer");

        Ok(Self {
            tokenizer,
            source: path.to_path_buf(),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Token ids for one record, special tokens included.
    pub fn encode_line(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Writes one comma-separated id line per non-blank input line, in order.
    /// Blank lines produce nothing. Returns the number of lines written.
    pub fn run<R: BufRead, W: Write>(&self, input: R, mut output: W) -> Result<usize> {
        let mut written = 0;
        for (lineno, line) in input.lines().enumerate() {
            let line = line.with_context(|| format!("failed to read input line {}", lineno + 1))?;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            let ids = self.encode_line(text)?;
            writeln!(output, "{}", join_ids(&ids)).context("failed to write token ids")?;
            written += 1;
        }
        output.flush().context("failed to flush token output")?;
        debug!(lines = written, "tokenized batch");
        Ok(written)
    }
}

pub fn join_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_comma_joined() {
        assert_eq!(join_ids(&[101, 2023, 102]), "101,2023,102");
        assert_eq!(join_ids(&[7]), "7");
        assert_eq!(join_ids(&[]), "");
    }

    #[test]
    fn missing_directory_is_a_lookup_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = BatchTokenizer::from_dir(tmp.path().join("absent"))
            .err()
            .expect("missing dir must fail");
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Lookup { what: "tokenizer directory", .. })
        ));
    }

    #[test]
    fn missing_tokenizer_file_is_a_lookup_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = BatchTokenizer::from_dir(tmp.path())
            .err()
            .expect("missing tokenizer.json must fail");
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Lookup { what: "tokenizer", .. })
        ));
    }
}
