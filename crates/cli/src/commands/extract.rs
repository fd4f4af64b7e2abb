use anyhow::{Context, Result};
use sigmatch_core::services::backends::ObjectExtractor;
use sigmatch_core::services::extract::{ExtractOptions, Extractor};

use crate::canonicalize_or_current;

/// Extract a target binary's signature and write it as a snapshot.
pub fn extract_command(path: &str, out: &str, arch: Option<String>) -> Result<()> {
    let input = canonicalize_or_current(path)?;
    let out_path = canonicalize_or_current(out)?;
    let options = ExtractOptions { arch, ..ExtractOptions::default() };

    let signature = ObjectExtractor
        .extract(&input, &options)
        .with_context(|| format!("Failed to extract signature from {}", input.display()))?;
    signature
        .dump_path(&out_path)
        .with_context(|| format!("Failed to write signature to {}", out_path.display()))?;

    println!("Extracted signature:");
    println!("  Name: {}", signature.name);
    println!("  Arch: {}", signature.arch.as_deref().unwrap_or("-"));
    println!("  Functions: {}", signature.function_count());
    println!("  Viable: {}", signature.viable_functions().len());
    println!("  Out: {}", out_path.display());

    Ok(())
}
