use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use sigmatch_core::db::{MatchTarget, SignatureDatabase};
use sigmatch_core::matching::{FingerprintMatcher, MatchSummary, ScoreReporter, TracingReporter};
use sigmatch_core::services::backends::ObjectExtractor;
use sigmatch_core::services::extract::{ExtractOptions, Extractor};
use tracing::debug;

use crate::canonicalize_or_current;

#[derive(Debug, Serialize)]
struct MatchedSymbol<'a> {
    address: String,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct MatchReport<'a> {
    target: String,
    summary: MatchSummary,
    /// In address order.
    mapping: Vec<MatchedSymbol<'a>>,
}

/// Match a target signature (or a binary, extracted on the fly) against a database.
pub fn match_command(
    db: &str,
    target: Option<&str>,
    binary: Option<&str>,
    score: bool,
    json: bool,
) -> Result<()> {
    let db_path = canonicalize_or_current(db)?;
    let database = SignatureDatabase::load_path(&db_path)
        .with_context(|| format!("Failed to load signature database {}", db_path.display()))?;

    let (label, match_target) = match (target, binary) {
        (Some(sig), None) => {
            let path = canonicalize_or_current(sig)?;
            (path.display().to_string(), MatchTarget::Path(path))
        }
        (None, Some(bin)) => {
            let path = canonicalize_or_current(bin)?;
            let signature = ObjectExtractor
                .extract(&path, &ExtractOptions::default())
                .with_context(|| format!("Failed to extract signature from {}", path.display()))?;
            (path.display().to_string(), MatchTarget::Signature(signature))
        }
        _ => return Err(anyhow!("Specify exactly one of --target or --binary")),
    };

    debug!(
        input = %label,
        libraries = database.libraries().len(),
        signatures = database.signature_count(),
        "Matching"
    );
    let reporter = TracingReporter;
    let reporter: Option<&dyn ScoreReporter> = if score { Some(&reporter) } else { None };
    let outcome = database
        .match_target(match_target, &FingerprintMatcher, reporter)
        .with_context(|| format!("Failed to match {label}"))?;

    if json {
        let report = MatchReport {
            target: label,
            summary: outcome.summary,
            mapping: outcome
                .mapping
                .iter()
                .map(|(addr, name)| MatchedSymbol { address: format!("0x{addr:X}"), name })
                .collect(),
        };
        let serialized =
            serde_json::to_string_pretty(&report).context("Failed to serialize match report")?;
        println!("{}", serialized);
        return Ok(());
    }

    let summary = outcome.summary;
    println!("Matched {label}:");
    println!(
        "  collisions={} junk={} guesses={} matched={}",
        summary.collisions, summary.junk, summary.guesses, summary.matched
    );
    for (addr, name) in &outcome.mapping {
        println!("  0x{addr:X} {name}");
    }

    Ok(())
}
