use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::model::Signature;

/// Options forwarded to an extractor for every compiled object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Optional architecture hint (e.g., x86_64, arm64, armv7). Overrides the object header.
    pub arch: Option<String>,
    /// Functions smaller than this many bytes are treated as stubs.
    pub min_function_size: u64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { arch: None, min_function_size: 1 }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The object has no disassemblable code. Expected for data-only objects.
    #[error("No executable content in {0}")]
    NoExecutableContent(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("Unsupported object format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },
}

impl ExtractError {
    pub fn is_no_executable_content(&self) -> bool {
        matches!(self, ExtractError::NoExecutableContent(_))
    }
}

/// Turns one compiled object into a [`Signature`].
pub trait Extractor: Send + Sync {
    fn extract(&self, path: &Path, options: &ExtractOptions) -> Result<Signature, ExtractError>;
    fn name(&self) -> &'static str;
}

/// Hex-encoded SHA-256 of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{:x}", digest)
}
