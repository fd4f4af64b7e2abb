//! Core data model for signatures extracted from compiled objects.
//!
//! A [`Signature`] is the structural fingerprint of one compiled unit: the
//! named symbols it defines, the set of addresses that are real (non-stub)
//! function bodies, and a lookup from address to [`FunctionDescriptor`].
//! Signatures are immutable once built and are compared by value, so a set of
//! them collapses identical objects contributed twice by the same library.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::db::persist::{self, SnapshotError, SnapshotKind};

/// A named function symbol defined by a compiled unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub address: u64,
}

impl Symbol {
    pub fn new(name: impl Into<String>, address: u64) -> Self {
        Self { name: name.into(), address }
    }
}

/// One function body inside a signature's address space.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub address: u64,
    pub name: String,
    pub size: u64,
    /// SHA-256 of the raw function bytes.
    pub digest: String,
    /// SHA-256 of the disassembled mnemonic sequence, when a disassembler was available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic_digest: Option<String>,
    /// False for stubs and placeholders (PLT entries, undersized bodies).
    pub viable: bool,
}

impl FunctionDescriptor {
    pub fn new(address: u64, name: impl Into<String>, size: u64, digest: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
            size,
            digest: digest.into(),
            mnemonic_digest: None,
            viable: true,
        }
    }

    /// Builder-style helper to attach a mnemonic digest.
    pub fn with_mnemonic_digest(mut self, digest: Option<String>) -> Self {
        self.mnemonic_digest = digest;
        self
    }

    /// Builder-style helper to mark the function as a stub.
    pub fn with_viable(mut self, viable: bool) -> Self {
        self.viable = viable;
        self
    }

    /// Key used for structural comparison: the mnemonic digest when present,
    /// otherwise the raw-bytes digest.
    pub fn structural_key(&self) -> &str {
        self.mnemonic_digest.as_deref().unwrap_or(&self.digest)
    }
}

/// Structural fingerprint of one compiled unit.
///
/// Deserializing rebuilds the viable sets from the function table; stored
/// copies of them are ignored.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "SignatureRepr")]
pub struct Signature {
    /// Display name, usually the object file name.
    pub name: String,
    /// Architecture string (e.g., "x86_64", "arm").
    pub arch: Option<String>,
    /// SHA-256 of the whole object file.
    pub source_digest: String,
    viable_symbols: BTreeSet<Symbol>,
    viable_functions: BTreeSet<u64>,
    functions: BTreeMap<u64, FunctionDescriptor>,
}

/// On-disk fields a signature is rebuilt from.
#[derive(Deserialize)]
struct SignatureRepr {
    name: String,
    arch: Option<String>,
    source_digest: String,
    functions: BTreeMap<u64, FunctionDescriptor>,
}

impl From<SignatureRepr> for Signature {
    fn from(repr: SignatureRepr) -> Self {
        Signature::new(repr.name, repr.arch, repr.source_digest, repr.functions.into_values())
    }
}

impl Signature {
    /// Assemble a signature from its function table.
    ///
    /// `viable_functions` and `viable_symbols` are derived from the
    /// descriptors' `viable` flags, so they can never disagree with the lookup.
    pub fn new(
        name: impl Into<String>,
        arch: Option<String>,
        source_digest: impl Into<String>,
        functions: impl IntoIterator<Item = FunctionDescriptor>,
    ) -> Self {
        let functions: BTreeMap<u64, FunctionDescriptor> =
            functions.into_iter().map(|f| (f.address, f)).collect();
        let viable_functions =
            functions.values().filter(|f| f.viable).map(|f| f.address).collect();
        let viable_symbols = functions
            .values()
            .filter(|f| f.viable && !f.name.is_empty())
            .map(|f| Symbol::new(f.name.clone(), f.address))
            .collect();
        Self {
            name: name.into(),
            arch,
            source_digest: source_digest.into(),
            viable_symbols,
            viable_functions,
            functions,
        }
    }

    pub fn viable_symbols(&self) -> &BTreeSet<Symbol> {
        &self.viable_symbols
    }

    pub fn viable_functions(&self) -> &BTreeSet<u64> {
        &self.viable_functions
    }

    pub fn is_viable(&self, address: u64) -> bool {
        self.viable_functions.contains(&address)
    }

    /// Address to function descriptor lookup.
    pub fn function(&self, address: u64) -> Option<&FunctionDescriptor> {
        self.functions.get(&address)
    }

    /// All functions, stubs included, ordered by address.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.values()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Write this signature as a standalone snapshot.
    pub fn dump<W: Write>(&self, writer: W) -> Result<(), SnapshotError> {
        persist::write_snapshot(SnapshotKind::Signature, self, writer)
    }

    pub fn dump_path(&self, path: &Path) -> Result<(), SnapshotError> {
        persist::write_snapshot_path(SnapshotKind::Signature, self, path)
    }

    pub fn load<R: Read>(reader: R) -> Result<Self, SnapshotError> {
        persist::read_snapshot(SnapshotKind::Signature, reader)
    }

    pub fn load_path(path: &Path) -> Result<Self, SnapshotError> {
        persist::read_snapshot_path(SnapshotKind::Signature, path)
    }
}
