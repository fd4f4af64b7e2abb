//! The signature database: per-library signature sets plus a derived index of
//! every symbol name they define.
//!
//! A database is built once from a finished library mapping and never
//! mutated afterwards; adding libraries means building a new one. This makes
//! it safe to share across threads for concurrent match requests.
//!
//! This module also owns:
//! - `BuildConfig`: how a corpus directory is turned into a database.
//! - `default_db_path`: where a snapshot goes when no path is given.
//! - `persist`: the self-validating snapshot format.

use std::collections::BTreeSet;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::corpus::{CorpusBuilder, CorpusDiagnostics, LibrarySets};
use crate::matching::{
    consolidate, postprocess, MatchError, MatchOutcome, Matcher, ScoreReporter,
};
use crate::model::Signature;
use crate::services::extract::Extractor;

pub mod config;
pub mod index;
pub mod layout;
pub mod persist;

pub use config::{load_build_config, BuildConfig};
pub use index::{DigestIndex, FunctionRef};
pub use layout::{default_db_path, DB_EXTENSION};
use persist::SnapshotKind;
pub use persist::SnapshotError;

/// Error type for database construction.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The corpus root is missing or is not a directory.
    #[error("Must provide a directory to build a database, got {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to read corpus directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Where a match request's target signature comes from.
#[derive(Debug, Clone)]
pub enum MatchTarget {
    Signature(Signature),
    /// Path to a signature snapshot written by [`Signature::dump_path`].
    Path(PathBuf),
}

impl From<Signature> for MatchTarget {
    fn from(signature: Signature) -> Self {
        MatchTarget::Signature(signature)
    }
}

impl From<PathBuf> for MatchTarget {
    fn from(path: PathBuf) -> Self {
        MatchTarget::Path(path)
    }
}

impl From<&Path> for MatchTarget {
    fn from(path: &Path) -> Self {
        MatchTarget::Path(path.to_path_buf())
    }
}

impl MatchTarget {
    fn into_signature(self) -> Result<Signature, MatchError> {
        match self {
            MatchTarget::Signature(signature) => Ok(signature),
            MatchTarget::Path(path) => Ok(Signature::load_path(&path)?),
        }
    }
}

/// What `build` produced, for callers that want more than the snapshot on disk.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub database: SignatureDatabase,
    pub diagnostics: CorpusDiagnostics,
    pub db_path: PathBuf,
}

/// Per-library signature sets and the indexes derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DatabaseRepr")]
pub struct SignatureDatabase {
    libraries: LibrarySets,
    symbol_names: BTreeSet<String>,
    #[serde(skip)]
    digests: DigestIndex,
}

/// Stored fields. The digest index is rebuilt rather than stored; the stored
/// symbol names are kept as-is so loading can check them.
#[derive(Deserialize)]
struct DatabaseRepr {
    libraries: LibrarySets,
    symbol_names: BTreeSet<String>,
}

impl From<DatabaseRepr> for SignatureDatabase {
    fn from(repr: DatabaseRepr) -> Self {
        let digests = DigestIndex::build(&repr.libraries);
        Self { libraries: repr.libraries, symbol_names: repr.symbol_names, digests }
    }
}

/// Union of every viable symbol name across every signature in every library.
fn collect_symbol_names(libraries: &LibrarySets) -> BTreeSet<String> {
    libraries
        .values()
        .flatten()
        .flat_map(|signature| signature.viable_symbols().iter().map(|s| s.name.clone()))
        .collect()
}

impl SignatureDatabase {
    /// Construct from a finished library mapping, deriving the symbol and digest indexes.
    pub fn new(libraries: LibrarySets) -> Self {
        let symbol_names = collect_symbol_names(&libraries);
        let digests = DigestIndex::build(&libraries);
        Self { libraries, symbol_names, digests }
    }

    pub fn libraries(&self) -> &LibrarySets {
        &self.libraries
    }

    pub fn library(&self, name: &str) -> Option<&BTreeSet<Signature>> {
        self.libraries.get(name)
    }

    /// Every symbol name the database could ever propose. Used for scoring only.
    pub fn symbol_names(&self) -> &BTreeSet<String> {
        &self.symbol_names
    }

    /// Digest lookup over every non-empty function, built once per database.
    pub fn digest_index(&self) -> &DigestIndex {
        &self.digests
    }

    pub fn signature_count(&self) -> usize {
        self.libraries.values().map(BTreeSet::len).sum()
    }

    /// Walk `root`, extract every object, and persist the result.
    ///
    /// Each immediate subdirectory of `root` is a library. The snapshot goes
    /// to `db_path` or, if `None`, to [`default_db_path`].
    pub fn build(
        root: &Path,
        db_path: Option<&Path>,
        extractor: &dyn Extractor,
        config: &BuildConfig,
    ) -> Result<BuildReport, BuildError> {
        if !root.is_dir() {
            return Err(BuildError::NotADirectory(root.to_path_buf()));
        }

        let corpus = CorpusBuilder::new(extractor, config)
            .build_root(root)
            .map_err(|source| BuildError::Io { path: root.to_path_buf(), source })?;

        info!(
            libraries = corpus.libraries.len(),
            extracted = corpus.diagnostics.extracted,
            skipped = corpus.diagnostics.skipped.len(),
            failed = corpus.diagnostics.failures.len(),
            "Making signature database"
        );
        let database = SignatureDatabase::new(corpus.libraries);

        let db_path = db_path.map(Path::to_path_buf).unwrap_or_else(|| default_db_path(root));
        database.dump_path(&db_path)?;
        info!(path = %db_path.display(), "Done");

        Ok(BuildReport { database, diagnostics: corpus.diagnostics, db_path })
    }

    /// Identify functions in `target` by matching it against this database.
    ///
    /// When `reporter` is given, it observes the consolidated plain and
    /// refined candidate maps before post-processing; it has no effect on the
    /// result. Matcher failures are logged and returned as-is.
    pub fn match_target(
        &self,
        target: impl Into<MatchTarget>,
        matcher: &dyn Matcher,
        reporter: Option<&dyn ScoreReporter>,
    ) -> Result<MatchOutcome, MatchError> {
        let target = target.into().into_signature()?;
        let pair = matcher.candidates(&target, self).map_err(|err| {
            error!(matcher = matcher.name(), error = %err, "Error computing matches");
            err
        })?;

        let refined = consolidate(pair.refined);
        let plain = consolidate(pair.plain);
        if let Some(reporter) = reporter {
            reporter.report("unrefined", &target, &plain, self);
            reporter.report("final", &target, &refined, self);
        }

        Ok(postprocess(&target, &refined))
    }

    /// Match several independent targets in parallel. Results keep input order.
    pub fn match_many(
        &self,
        targets: Vec<Signature>,
        matcher: &dyn Matcher,
    ) -> Vec<Result<MatchOutcome, MatchError>> {
        targets.into_par_iter().map(|target| self.match_target(target, matcher, None)).collect()
    }

    pub fn dump<W: Write>(&self, writer: W) -> Result<(), SnapshotError> {
        persist::write_snapshot(SnapshotKind::SignatureDatabase, self, writer)
    }

    pub fn dumps(&self) -> Result<Vec<u8>, SnapshotError> {
        let mut buf = Vec::new();
        self.dump(&mut buf)?;
        Ok(buf)
    }

    pub fn dump_path(&self, path: &Path) -> Result<(), SnapshotError> {
        persist::write_snapshot_path(SnapshotKind::SignatureDatabase, self, path)
    }

    pub fn load<R: Read>(reader: R) -> Result<Self, SnapshotError> {
        persist::read_snapshot(SnapshotKind::SignatureDatabase, reader).and_then(Self::validated)
    }

    pub fn loads(data: &[u8]) -> Result<Self, SnapshotError> {
        persist::read_snapshot_bytes(SnapshotKind::SignatureDatabase, data).and_then(Self::validated)
    }

    pub fn load_path(path: &Path) -> Result<Self, SnapshotError> {
        persist::read_snapshot_path(SnapshotKind::SignatureDatabase, path).and_then(Self::validated)
    }

    /// Reject snapshots whose stored index disagrees with their libraries.
    fn validated(db: SignatureDatabase) -> Result<Self, SnapshotError> {
        let computed = collect_symbol_names(&db.libraries);
        if computed != db.symbol_names {
            return Err(SnapshotError::IndexMismatch {
                stored: db.symbol_names.len(),
                computed: computed.len(),
            });
        }
        Ok(db)
    }
}
