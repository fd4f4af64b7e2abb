use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::services::extract::ExtractOptions;

/// Settings for building a signature database from a directory tree.
///
/// Can be loaded from a JSON or YAML file next to the corpus; every field is
/// optional on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// File name suffixes treated as compiled objects.
    pub extensions: Vec<String>,
    /// Extract objects on the rayon pool instead of one at a time.
    pub parallel: bool,
    /// Options forwarded to the extractor for every object.
    pub extract: ExtractOptions,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            extensions: vec![".o".to_string(), ".obj".to_string()],
            parallel: true,
            extract: ExtractOptions::default(),
        }
    }
}

impl BuildConfig {
    /// True if `file_name` ends in one of the configured object extensions.
    pub fn is_object_file(&self, file_name: &str) -> bool {
        self.extensions.iter().any(|ext| file_name.ends_with(ext.as_str()))
    }
}

/// Load a build config from disk, choosing the parser from the file extension
/// (`.yaml`/`.yml` or `.json`).
pub fn load_build_config(path: &Path) -> Result<BuildConfig> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read build config at {}", path.display()))?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match ext {
        "yaml" | "yml" => serde_yaml::from_str(&body).context("Failed to parse build config YAML"),
        "json" => serde_json::from_str(&body).context("Failed to parse build config JSON"),
        other => Err(anyhow!("Unsupported build config format '{}'. Use yaml, yml, or json", other)),
    }
}
