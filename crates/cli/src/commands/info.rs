use anyhow::{Context, Result};
use serde::Serialize;
use sigmatch_core::db::SignatureDatabase;

use crate::canonicalize_or_current;

#[derive(Debug, Serialize)]
pub struct LibraryInfo {
    pub name: String,
    pub signatures: usize,
    pub functions: usize,
}

#[derive(Debug, Serialize)]
pub struct DatabaseInfo {
    pub db_path: String,
    pub symbols: usize,
    pub libraries: Vec<LibraryInfo>,
}

/// Summarize a persisted database.
pub fn database_info(db: &SignatureDatabase, db_path: String) -> DatabaseInfo {
    let libraries = db
        .libraries()
        .iter()
        .map(|(name, signatures)| LibraryInfo {
            name: name.clone(),
            signatures: signatures.len(),
            functions: signatures.iter().map(|s| s.function_count()).sum(),
        })
        .collect();
    DatabaseInfo { db_path, symbols: db.symbol_names().len(), libraries }
}

/// Show the libraries and symbol counts of a persisted database.
pub fn info_command(db: &str, json: bool) -> Result<()> {
    let db_path = canonicalize_or_current(db)?;
    let database = SignatureDatabase::load_path(&db_path)
        .with_context(|| format!("Failed to load signature database {}", db_path.display()))?;
    let info = database_info(&database, db_path.display().to_string());

    if json {
        let serialized =
            serde_json::to_string_pretty(&info).context("Failed to serialize database info")?;
        println!("{}", serialized);
        return Ok(());
    }

    println!("Signature database: {}", info.db_path);
    println!("Symbols: {}", info.symbols);
    println!("Libraries ({}):", info.libraries.len());
    if info.libraries.is_empty() {
        println!("  (none)");
        return Ok(());
    }
    for lib in &info.libraries {
        println!("  - {} [signatures: {}] functions={}", lib.name, lib.signatures, lib.functions);
    }

    Ok(())
}
