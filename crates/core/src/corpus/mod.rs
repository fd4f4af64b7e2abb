//! Corpus construction: walk a directory of libraries and extract a signature
//! from every compiled object found under each one.
//!
//! Every immediate subdirectory of the root is one library. Below that, any
//! nesting depth is accepted. Extraction is best-effort: a file with no
//! executable content is skipped with a warning, any other failure is logged
//! and recorded, and neither aborts the walk. Skips and failures are returned
//! as [`CorpusDiagnostics`] next to the library sets.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::db::BuildConfig;
use crate::model::Signature;
use crate::services::extract::{ExtractError, Extractor};

/// Library name to the set of signatures it contributed.
pub type LibrarySets = BTreeMap<String, BTreeSet<Signature>>;

/// An extraction that failed for a reason other than missing executable content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionFailure {
    pub library: String,
    pub path: PathBuf,
    pub reason: String,
}

/// Per-file outcomes of a corpus walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpusDiagnostics {
    /// Number of objects that produced a signature.
    pub extracted: usize,
    /// Objects skipped because they had no executable content.
    pub skipped: Vec<PathBuf>,
    pub failures: Vec<ExtractionFailure>,
}

impl CorpusDiagnostics {
    fn merge(&mut self, other: CorpusDiagnostics) {
        self.extracted += other.extracted;
        self.skipped.extend(other.skipped);
        self.failures.extend(other.failures);
    }
}

/// Result of walking a corpus root.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub libraries: LibrarySets,
    pub diagnostics: CorpusDiagnostics,
}

/// Walks library directories and drives an [`Extractor`] over their objects.
pub struct CorpusBuilder<'a> {
    extractor: &'a dyn Extractor,
    config: &'a BuildConfig,
}

impl<'a> CorpusBuilder<'a> {
    pub fn new(extractor: &'a dyn Extractor, config: &'a BuildConfig) -> Self {
        Self { extractor, config }
    }

    /// Treat every immediate subdirectory of `root` as a library and build each.
    ///
    /// Non-directory entries at the top level are ignored. A symlink to a
    /// directory is a library like any other.
    pub fn build_root(&self, root: &Path) -> std::io::Result<Corpus> {
        let mut library_dirs = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            // Follows symlinks, so a linked library directory still counts.
            if entry.path().is_dir() {
                library_dirs.push((entry.file_name().to_string_lossy().to_string(), entry.path()));
            }
        }
        library_dirs.sort();

        let mut corpus = Corpus::default();
        for (library, dir) in library_dirs {
            info!(library = %library, path = %dir.display(), "Building signatures for library");
            let (signatures, diagnostics) = self.build_library(&library, &dir);
            corpus.libraries.insert(library, signatures);
            corpus.diagnostics.merge(diagnostics);
        }
        Ok(corpus)
    }

    /// Recursively collect the object files under `dir`, sorted for stable ordering.
    pub fn collect_objects(&self, dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable directory entry");
                    None
                }
            })
            // Linked objects are extracted; linked directories are not descended.
            .filter(|e| e.file_type().is_file() || (e.path_is_symlink() && e.path().is_file()))
            .filter(|e| e.file_name().to_str().is_some_and(|n| self.config.is_object_file(n)))
            .map(|e| e.into_path())
            .collect();
        files.sort();
        files
    }

    /// Extract every object under one library directory.
    ///
    /// The returned set does not depend on whether extraction ran in parallel.
    pub fn build_library(
        &self,
        library: &str,
        dir: &Path,
    ) -> (BTreeSet<Signature>, CorpusDiagnostics) {
        let files = self.collect_objects(dir);
        let extract = |path: &PathBuf| {
            info!(path = %path.display(), "Making signature");
            (path.clone(), self.extractor.extract(path, &self.config.extract))
        };
        let results: Vec<(PathBuf, Result<Signature, ExtractError>)> = if self.config.parallel {
            files.par_iter().map(extract).collect()
        } else {
            files.iter().map(extract).collect()
        };

        results.into_iter().fold(
            (BTreeSet::new(), CorpusDiagnostics::default()),
            |(mut signatures, mut diagnostics), (path, result)| {
                match result {
                    Ok(signature) => {
                        signatures.insert(signature);
                        diagnostics.extracted += 1;
                    }
                    Err(err) if err.is_no_executable_content() => {
                        warn!(path = %path.display(), "No executable data, skipping");
                        diagnostics.skipped.push(path);
                    }
                    Err(err) => {
                        error!(library, path = %path.display(), error = %err, "Could not make signature");
                        diagnostics.failures.push(ExtractionFailure {
                            library: library.to_string(),
                            path,
                            reason: err.to_string(),
                        });
                    }
                }
                (signatures, diagnostics)
            },
        )
    }
}
