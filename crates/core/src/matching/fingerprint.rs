use std::collections::{BTreeMap, HashMap};

use super::{Candidate, CandidateMap, CandidatePair, MatchError, MatchEvidence, Matcher};
use crate::db::{DigestIndex, FunctionRef, SignatureDatabase};
use crate::model::{FunctionDescriptor, Signature};

/// Reference matcher comparing per-function digests.
///
/// `plain` pairs each target function with every database function of the
/// same size whose mnemonic digest or raw-bytes digest is equal. `refined`
/// narrows ambiguous lists, first to byte-identical candidates and then to the
/// library that explains the most target functions. Narrowing never empties a
/// list. Lookups go through the database's prebuilt [`DigestIndex`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FingerprintMatcher;

#[derive(Clone, Copy)]
struct Entry<'db> {
    library: &'db str,
    signature: &'db Signature,
    function: &'db FunctionDescriptor,
}

/// Resolves [`FunctionRef`] positions back into the database they index.
struct Resolver<'db> {
    libraries: Vec<(&'db str, Vec<&'db Signature>)>,
}

impl<'db> Resolver<'db> {
    fn new(db: &'db SignatureDatabase) -> Self {
        let libraries: Vec<(&'db str, Vec<&'db Signature>)> = db
            .libraries()
            .iter()
            .map(|(name, signatures)| (name.as_str(), signatures.iter().collect()))
            .collect();
        Self { libraries }
    }

    fn resolve(&self, r: &FunctionRef) -> Option<Entry<'db>> {
        let (library, signatures) = self.libraries.get(r.library)?;
        let signature: &'db Signature = *signatures.get(r.signature)?;
        let function = signature.function(r.address)?;
        Some(Entry { library: *library, signature, function })
    }
}

/// Same-size database functions sharing the target's mnemonic or byte digest.
fn lookup(index: &DigestIndex, target: &FunctionDescriptor) -> Vec<FunctionRef> {
    let by_mnemonic: &[FunctionRef] = match target.mnemonic_digest.as_deref() {
        Some(mn) => index.by_mnemonic(mn),
        None => &[],
    };
    let mut hits: Vec<FunctionRef> = Vec::new();
    for r in by_mnemonic.iter().chain(index.by_bytes(&target.digest)) {
        if r.size == target.size && !hits.contains(r) {
            hits.push(*r);
        }
    }
    hits
}

fn to_candidate<'db>(e: &Entry<'db>) -> Candidate<'db> {
    Candidate::new(e.library, e.signature, MatchEvidence::StructuralMatch(e.function.address))
}

/// Keep the entries satisfying `keep`, unless that would leave nothing.
fn narrow<'db>(entries: Vec<Entry<'db>>, keep: impl Fn(&Entry<'db>) -> bool) -> Vec<Entry<'db>> {
    if entries.len() <= 1 {
        return entries;
    }
    let kept: Vec<Entry<'db>> = entries.iter().copied().filter(|e| keep(e)).collect();
    if kept.is_empty() {
        entries
    } else {
        kept
    }
}

impl Matcher for FingerprintMatcher {
    fn candidates<'db>(
        &self,
        target: &Signature,
        db: &'db SignatureDatabase,
    ) -> Result<CandidatePair<'db>, MatchError> {
        let index = db.digest_index();
        let resolver = Resolver::new(db);

        let mut raw: BTreeMap<u64, (Vec<Entry<'db>>, &FunctionDescriptor)> = BTreeMap::new();
        for function in target.functions().filter(|f| f.size > 0) {
            let hits: Vec<Entry<'db>> =
                lookup(index, function).iter().filter_map(|r| resolver.resolve(r)).collect();
            if !hits.is_empty() {
                raw.insert(function.address, (hits, function));
            }
        }

        // How many target functions each library has at least one candidate for.
        let mut affinity: HashMap<&str, usize> = HashMap::new();
        for (hits, _) in raw.values() {
            let mut libs: Vec<&str> = hits.iter().map(|h| h.library).collect();
            libs.sort_unstable();
            libs.dedup();
            for lib in libs {
                *affinity.entry(lib).or_default() += 1;
            }
        }

        let mut plain = CandidateMap::new();
        let mut refined = CandidateMap::new();
        for (address, (hits, function)) in raw {
            plain.insert(address, hits.iter().map(to_candidate).collect());

            let exact = narrow(hits, |e| e.function.digest == function.digest);
            let best = exact
                .iter()
                .map(|e| affinity.get(e.library).copied().unwrap_or_default())
                .max()
                .unwrap_or_default();
            let preferred =
                narrow(exact, |e| affinity.get(e.library).copied().unwrap_or_default() == best);
            refined.insert(address, preferred.iter().map(to_candidate).collect());
        }

        Ok(CandidatePair { plain, refined })
    }

    fn name(&self) -> &'static str {
        "fingerprint"
    }
}
