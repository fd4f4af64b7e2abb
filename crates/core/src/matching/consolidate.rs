use super::CandidateMap;

/// Collapse evidence lists whose entries all propose the same symbol name.
///
/// Lists of length zero or one pass through. A list where every entry
/// resolves to the same name becomes its first entry; a list with any
/// disagreement (or any unresolvable entry) is left untouched for
/// post-processing to reject. The key set never changes.
pub fn consolidate(candidates: CandidateMap<'_>) -> CandidateMap<'_> {
    candidates
        .into_iter()
        .map(|(address, mut evidence)| {
            if evidence.len() > 1 && all_agree(&evidence) {
                evidence.truncate(1);
            }
            (address, evidence)
        })
        .collect()
}

fn all_agree(evidence: &[super::Candidate<'_>]) -> bool {
    let Some(first) = evidence.first().and_then(|c| c.symbol_name()) else {
        return false;
    };
    evidence.iter().all(|c| c.symbol_name() == Some(first))
}
