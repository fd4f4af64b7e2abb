use serde::Serialize;
use tracing::info;

use super::CandidateMap;
use crate::db::SignatureDatabase;
use crate::model::Signature;

/// Candidate quality measured against the target's own symbol names.
///
/// Only meaningful for targets that still carry symbols.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreReport {
    /// Addresses with candidates.
    pub total: usize,
    /// Single candidate whose name equals the target's name.
    pub correct: usize,
    /// Single candidate whose name differs.
    pub incorrect: usize,
    /// More than one candidate.
    pub ambiguous: usize,
    /// Among `ambiguous`, lists that contain the right name.
    pub ambiguous_with_correct: usize,
    /// Target functions whose name is not in the database at all.
    pub unknown: usize,
}

/// Observes candidate maps during a match. Never alters the result.
pub trait ScoreReporter: Send + Sync {
    fn report(&self, label: &str, target: &Signature, candidates: &CandidateMap<'_>, db: &SignatureDatabase);
}

/// Score a candidate map against the target's own function names.
pub fn score_candidates(
    target: &Signature,
    candidates: &CandidateMap<'_>,
    db: &SignatureDatabase,
) -> ScoreReport {
    let mut report = ScoreReport {
        unknown: target
            .viable_symbols()
            .iter()
            .filter(|s| !db.symbol_names().contains(&s.name))
            .count(),
        ..ScoreReport::default()
    };

    for (address, evidence) in candidates {
        report.total += 1;
        let expected = target.function(*address).map(|f| f.name.as_str());
        match evidence.as_slice() {
            [] => {}
            [only] => {
                if only.symbol_name().is_some() && only.symbol_name() == expected {
                    report.correct += 1;
                } else {
                    report.incorrect += 1;
                }
            }
            many => {
                report.ambiguous += 1;
                if many.iter().any(|c| c.symbol_name().is_some() && c.symbol_name() == expected) {
                    report.ambiguous_with_correct += 1;
                }
            }
        }
    }
    report
}

/// Logs a [`ScoreReport`] through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ScoreReporter for TracingReporter {
    fn report(&self, label: &str, target: &Signature, candidates: &CandidateMap<'_>, db: &SignatureDatabase) {
        let r = score_candidates(target, candidates, db);
        info!(
            label,
            signature = %target.name,
            total = r.total,
            correct = r.correct,
            incorrect = r.incorrect,
            ambiguous = r.ambiguous,
            ambiguous_with_correct = r.ambiguous_with_correct,
            unknown = r.unknown,
            "Candidate score"
        );
    }
}
