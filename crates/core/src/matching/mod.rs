//! Matching pipeline: candidate maps, consolidation, and post-processing.
//!
//! A [`Matcher`] turns a target signature plus the database into two raw
//! candidate maps (`plain` and `refined`). Both are consolidated, then the
//! refined map is post-processed into the final address to name mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::persist::SnapshotError;
use crate::db::SignatureDatabase;
use crate::model::Signature;

pub mod consolidate;
pub mod fingerprint;
pub mod postprocess;
pub mod score;

pub use consolidate::consolidate;
pub use fingerprint::FingerprintMatcher;
pub use postprocess::{postprocess, FinalMapping, MatchOutcome, MatchSummary};
pub use score::{score_candidates, ScoreReport, ScoreReporter, TracingReporter};

/// What a candidate says about a target address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchEvidence {
    /// Name-only correlation without a paired address. Lower confidence.
    NameGuess(String),
    /// Structural match paired with an address in the candidate signature's address space.
    StructuralMatch(u64),
}

/// One piece of evidence for a target address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'db> {
    pub library: &'db str,
    pub signature: &'db Signature,
    pub evidence: MatchEvidence,
}

impl<'db> Candidate<'db> {
    pub fn new(library: &'db str, signature: &'db Signature, evidence: MatchEvidence) -> Self {
        Self { library, signature, evidence }
    }

    /// The symbol name this candidate proposes.
    ///
    /// `None` when a structural match points at an address the signature
    /// does not know.
    pub fn symbol_name(&self) -> Option<&str> {
        match &self.evidence {
            MatchEvidence::NameGuess(name) => Some(name.as_str()),
            MatchEvidence::StructuralMatch(address) => {
                self.signature.function(*address).map(|f| f.name.as_str())
            }
        }
    }
}

/// Target address to ordered evidence list.
pub type CandidateMap<'db> = BTreeMap<u64, Vec<Candidate<'db>>>;

/// The two maps every match request produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatePair<'db> {
    /// Before refinement; diagnostics only.
    pub plain: CandidateMap<'db>,
    /// After refinement; feeds the final mapping.
    pub refined: CandidateMap<'db>,
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Matcher '{matcher}' failed: {reason}")]
    Matcher { matcher: String, reason: String },
    #[error("Failed to load match target: {0}")]
    Target(#[from] SnapshotError),
}

/// Compares a target signature against the database.
pub trait Matcher: Send + Sync {
    fn candidates<'db>(
        &self,
        target: &Signature,
        db: &'db SignatureDatabase,
    ) -> Result<CandidatePair<'db>, MatchError>;

    fn name(&self) -> &'static str;
}
