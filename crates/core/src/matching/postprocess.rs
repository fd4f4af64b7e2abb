use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{CandidateMap, MatchEvidence};
use crate::model::Signature;

/// Target address to identified symbol name.
pub type FinalMapping = BTreeMap<u64, String>;

/// How each candidate address was classified.
///
/// `collisions + junk + matched` always equals the number of addresses in the
/// input map; `guesses` counts the subset of `matched` that came from name-only
/// evidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub collisions: usize,
    pub junk: usize,
    pub guesses: usize,
    pub matched: usize,
}

impl MatchSummary {
    pub fn total(&self) -> usize {
        self.collisions + self.junk + self.matched
    }
}

/// Final product of one match request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub mapping: FinalMapping,
    pub summary: MatchSummary,
}

/// Turn a consolidated candidate map into the final mapping.
///
/// An address is identified only when exactly one candidate survives and the
/// target considers it a real function. Structural matches whose paired
/// address the candidate signature cannot resolve are counted as junk.
pub fn postprocess(target: &Signature, candidates: &CandidateMap<'_>) -> MatchOutcome {
    let mut mapping = FinalMapping::new();
    let mut summary = MatchSummary::default();

    for (&address, evidence) in candidates {
        if evidence.len() > 1 {
            summary.collisions += 1;
            continue;
        }
        // Empty lists carry no proposal at all; treat as noise.
        let Some(candidate) = evidence.first() else {
            summary.junk += 1;
            continue;
        };
        if !target.is_viable(address) {
            summary.junk += 1;
            continue;
        }
        let name = match &candidate.evidence {
            MatchEvidence::NameGuess(name) => {
                summary.guesses += 1;
                name.clone()
            }
            MatchEvidence::StructuralMatch(paired) => {
                match candidate.signature.function(*paired) {
                    Some(function) => function.name.clone(),
                    None => {
                        warn!(
                            address = %format!("0x{address:X}"),
                            paired = %format!("0x{paired:X}"),
                            signature = %candidate.signature.name,
                            "Structural match points outside its signature"
                        );
                        summary.junk += 1;
                        continue;
                    }
                }
            }
        };
        mapping.insert(address, name);
        summary.matched += 1;
    }

    warn!("Detected {} collisions", summary.collisions);
    warn!("Ignored {} junk function matches", summary.junk);
    warn!("Made {} guesses", summary.guesses);
    warn!("Matched {} symbols", summary.matched);

    MatchOutcome { mapping, summary }
}
