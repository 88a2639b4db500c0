use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Rejected before any I/O happens.
    #[error("invalid {field}: {reason}")]
    Configuration { field: String, reason: String },

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{what} not found at {}", path.display())]
    Lookup { what: &'static str, path: PathBuf },

    #[error("malformed model container: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn lookup(what: &'static str, path: impl AsRef<Path>) -> Self {
        Error::Lookup {
            what,
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }
}

impl From<prost::DecodeError> for Error {
    fn from(e: prost::DecodeError) -> Self {
        Error::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("feature_dim", "must be positive");
        assert_eq!(err.to_string(), "invalid feature_dim: must be positive");
        assert!(err.is_configuration());

        let err = Error::io(
            "/tmp/model.onnx",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/model.onnx"));
        assert!(err.to_string().contains("denied"));
        assert!(!err.is_configuration());

        let err = Error::lookup("tokenizer", "/models/sst2/tokenizer.json");
        assert!(err.to_string().starts_with("tokenizer not found"));

        let err = Error::Decode("truncated".to_string());
        assert!(err.to_string().contains("malformed model container"));
    }

    #[test]
    fn test_from_decode_error() {
        use prost::Message;

        // Field 7 (graph) announces five bytes that never arrive.
        let decoded = enclaveml_proto::onnx::ModelProto::decode(&[0x3a, 0x05][..]);
        let err: Error = decoded.expect_err("truncated input must fail").into();
        assert!(matches!(err, Error::Decode(_)));
    }
}
