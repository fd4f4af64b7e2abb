//! Digest lookup over every function in a database.
//!
//! Built once when the database is constructed or loaded and never updated.
//! Entries are positions, not references, so the index can live inside the
//! database it describes.

use std::collections::HashMap;

use crate::corpus::LibrarySets;

/// Where a function lives: the library's position in the database's library
/// map, the signature's position in that library's set, and its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionRef {
    pub library: usize,
    pub signature: usize,
    pub address: u64,
    pub size: u64,
}

/// Mnemonic and raw-bytes digest to the functions that carry it.
///
/// Zero-size functions are not indexed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestIndex {
    by_mnemonic: HashMap<String, Vec<FunctionRef>>,
    by_bytes: HashMap<String, Vec<FunctionRef>>,
}

impl DigestIndex {
    pub fn build(libraries: &LibrarySets) -> Self {
        let mut index = DigestIndex::default();
        for (library, signatures) in libraries.values().enumerate() {
            for (signature, sig) in signatures.iter().enumerate() {
                for function in sig.functions().filter(|f| f.size > 0) {
                    let entry = FunctionRef {
                        library,
                        signature,
                        address: function.address,
                        size: function.size,
                    };
                    if let Some(mn) = &function.mnemonic_digest {
                        index.by_mnemonic.entry(mn.clone()).or_default().push(entry);
                    }
                    index.by_bytes.entry(function.digest.clone()).or_default().push(entry);
                }
            }
        }
        index
    }

    pub fn by_mnemonic(&self, digest: &str) -> &[FunctionRef] {
        self.by_mnemonic.get(digest).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn by_bytes(&self, digest: &str) -> &[FunctionRef] {
        self.by_bytes.get(digest).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of indexed functions.
    pub fn len(&self) -> usize {
        self.by_bytes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_bytes.is_empty()
    }
}
