use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use sigmatch_core::db::{load_build_config, BuildConfig, SignatureDatabase};
use sigmatch_core::services::backends::ObjectExtractor;
use tracing::debug;

use crate::canonicalize_or_current;

#[derive(Debug, Serialize)]
struct BuildSummary<'a> {
    db_path: String,
    libraries: usize,
    signatures: usize,
    symbols: usize,
    extracted: usize,
    skipped: usize,
    failures: &'a [sigmatch_core::corpus::ExtractionFailure],
}

/// Build a signature database from a corpus directory and persist it.
pub fn build_command(
    root: &str,
    out: Option<&str>,
    config: Option<&str>,
    sequential: bool,
    json: bool,
) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let mut build_config = match config {
        Some(path) => load_build_config(&canonicalize_or_current(path)?)?,
        None => BuildConfig::default(),
    };
    if sequential {
        build_config.parallel = false;
    }
    debug!(config = ?build_config, root = %root_path.display(), "Build configuration");
    let out_path: Option<PathBuf> = out.map(canonicalize_or_current).transpose()?;

    let report =
        SignatureDatabase::build(&root_path, out_path.as_deref(), &ObjectExtractor, &build_config)
            .with_context(|| format!("Failed to build database from {}", root_path.display()))?;

    let db = &report.database;
    let diagnostics = &report.diagnostics;
    if json {
        let summary = BuildSummary {
            db_path: report.db_path.display().to_string(),
            libraries: db.libraries().len(),
            signatures: db.signature_count(),
            symbols: db.symbol_names().len(),
            extracted: diagnostics.extracted,
            skipped: diagnostics.skipped.len(),
            failures: &diagnostics.failures,
        };
        let serialized =
            serde_json::to_string_pretty(&summary).context("Failed to serialize build summary")?;
        println!("{}", serialized);
        return Ok(());
    }

    println!("Built signature database:");
    println!("  Path: {}", report.db_path.display());
    println!("  Libraries: {}", db.libraries().len());
    println!("  Signatures: {}", db.signature_count());
    println!("  Symbols: {}", db.symbol_names().len());
    println!("  Extracted: {}", diagnostics.extracted);
    println!("  Skipped: {}", diagnostics.skipped.len());
    println!("  Failed: {}", diagnostics.failures.len());
    for failure in &diagnostics.failures {
        println!("    - [{}] {}: {}", failure.library, failure.path.display(), failure.reason);
    }

    Ok(())
}
