//! Snapshot persistence for signature databases and standalone signatures.
//!
//! A snapshot is a JSON envelope carrying a kind tag, a format version, and a
//! creation timestamp around the payload. Loading rejects anything whose tag
//! or version does not match what the caller asked for.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Latest snapshot format this crate writes and reads.
pub const CURRENT_FORMAT_VERSION: u32 = 1;

/// What a snapshot claims to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotKind {
    SignatureDatabase,
    Signature,
}

impl SnapshotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotKind::SignatureDatabase => "signature-database",
            SnapshotKind::Signature => "signature",
        }
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error on snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// The snapshot deserialized, but holds something other than what was asked for.
    #[error("Snapshot holds a {found}, expected a {expected}")]
    WrongKind { expected: &'static str, found: String },

    #[error("Unsupported snapshot format version {found}; this build reads version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The stored symbol-name index disagrees with the stored libraries.
    #[error("Snapshot symbol index is out of date with its libraries ({stored} stored, {computed} computed)")]
    IndexMismatch { stored: usize, computed: usize },
}

/// Header fields, read first so a payload of the wrong kind never reaches the
/// payload deserializer.
#[derive(Debug, Deserialize)]
struct EnvelopeHeader {
    kind: String,
    format_version: u32,
}

#[derive(Debug, Serialize)]
struct EnvelopeOut<'a, T> {
    kind: SnapshotKind,
    format_version: u32,
    created_at: String,
    payload: &'a T,
}

#[derive(Debug, Deserialize)]
struct EnvelopeIn<T> {
    payload: T,
}

pub(crate) fn write_snapshot<T: Serialize, W: Write>(
    kind: SnapshotKind,
    value: &T,
    writer: W,
) -> Result<(), SnapshotError> {
    let envelope = EnvelopeOut {
        kind,
        format_version: CURRENT_FORMAT_VERSION,
        created_at: Utc::now().to_rfc3339(),
        payload: value,
    };
    serde_json::to_writer(writer, &envelope)?;
    Ok(())
}

pub(crate) fn write_snapshot_path<T: Serialize>(
    kind: SnapshotKind,
    value: &T,
    path: &Path,
) -> Result<(), SnapshotError> {
    let file = File::create(path)
        .map_err(|source| SnapshotError::Io { path: path.to_path_buf(), source })?;
    let mut writer = BufWriter::new(file);
    write_snapshot(kind, value, &mut writer)?;
    writer.flush().map_err(|source| SnapshotError::Io { path: path.to_path_buf(), source })
}

pub(crate) fn read_snapshot_bytes<T: DeserializeOwned>(
    kind: SnapshotKind,
    bytes: &[u8],
) -> Result<T, SnapshotError> {
    let header: EnvelopeHeader = serde_json::from_slice(bytes)?;
    if header.kind != kind.as_str() {
        return Err(SnapshotError::WrongKind { expected: kind.as_str(), found: header.kind });
    }
    if header.format_version != CURRENT_FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: header.format_version,
            supported: CURRENT_FORMAT_VERSION,
        });
    }
    let envelope: EnvelopeIn<T> = serde_json::from_slice(bytes)?;
    Ok(envelope.payload)
}

pub(crate) fn read_snapshot<T: DeserializeOwned, R: Read>(
    kind: SnapshotKind,
    mut reader: R,
) -> Result<T, SnapshotError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|source| SnapshotError::Io { path: PathBuf::from("<stream>"), source })?;
    read_snapshot_bytes(kind, &bytes)
}

pub(crate) fn read_snapshot_path<T: DeserializeOwned>(
    kind: SnapshotKind,
    path: &Path,
) -> Result<T, SnapshotError> {
    let file =
        File::open(path).map_err(|source| SnapshotError::Io { path: path.to_path_buf(), source })?;
    read_snapshot(kind, BufReader::new(file)).map_err(|err| match err {
        SnapshotError::Io { source, .. } => SnapshotError::Io { path: path.to_path_buf(), source },
        other => other,
    })
}
