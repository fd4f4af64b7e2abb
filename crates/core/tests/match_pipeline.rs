mod common;

use std::sync::Mutex;

use common::{target_object, write_file, write_matching_corpus};
use sigmatch_core::corpus::CorpusBuilder;
use sigmatch_core::db::{BuildConfig, SignatureDatabase};
use sigmatch_core::matching::{
    score_candidates, CandidateMap, CandidatePair, FingerprintMatcher, MatchError, MatchSummary,
    Matcher, ScoreReport, ScoreReporter,
};
use sigmatch_core::model::Signature;
use sigmatch_core::services::backends::ObjectExtractor;
use sigmatch_core::services::extract::{ExtractOptions, Extractor};
use tempfile::{tempdir, TempDir};

struct Fixture {
    _tmp: TempDir,
    db: SignatureDatabase,
    target: Signature,
}

fn fixture() -> Fixture {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path().join("corpus");
    write_matching_corpus(&root);
    let config = BuildConfig::default();
    let corpus = CorpusBuilder::new(&ObjectExtractor, &config).build_root(&root).expect("walk");
    let db = SignatureDatabase::new(corpus.libraries);

    let target_path = tmp.path().join("target.o");
    write_file(&target_path, &target_object());
    let target = ObjectExtractor.extract(&target_path, &ExtractOptions::default()).expect("target");
    Fixture { _tmp: tmp, db, target }
}

fn address_of(target: &Signature, name: &str) -> u64 {
    target.functions().find(|f| f.name == name).map(|f| f.address).expect("target function")
}

#[test]
fn fingerprint_matching_identifies_unique_functions() {
    let fx = fixture();
    let outcome = fx.db.match_target(fx.target.clone(), &FingerprintMatcher, None).expect("match");

    let t_add = address_of(&fx.target, "t_add");
    let t_memcpy = address_of(&fx.target, "t_memcpy");
    let t_zero = address_of(&fx.target, "t_zero");
    let t_unknown = address_of(&fx.target, "t_unknown");

    assert_eq!(outcome.mapping.get(&t_add).map(String::as_str), Some("add"));
    assert_eq!(outcome.mapping.get(&t_memcpy).map(String::as_str), Some("memcpy"));
    // zero_a vs zero_b: same code, different names, equal library affinity.
    assert!(!outcome.mapping.contains_key(&t_zero));
    assert!(!outcome.mapping.contains_key(&t_unknown));
    assert_eq!(outcome.summary, MatchSummary { collisions: 1, junk: 0, guesses: 0, matched: 2 });
    assert!(outcome.mapping.keys().all(|a| fx.target.viable_functions().contains(a)));
}

#[test]
fn stub_targets_are_classified_as_junk() {
    let fx = fixture();
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("target.o");
    write_file(&path, &target_object());
    // add (4 bytes) becomes a stub in the target; memcpy (9 bytes) stays viable.
    let options = ExtractOptions { arch: None, min_function_size: 5 };
    let target = ObjectExtractor.extract(&path, &options).expect("target");

    let outcome = fx.db.match_target(target.clone(), &FingerprintMatcher, None).expect("match");
    assert!(!outcome.mapping.contains_key(&address_of(&target, "t_add")));
    assert_eq!(outcome.summary, MatchSummary { collisions: 1, junk: 1, guesses: 0, matched: 1 });
}

#[test]
fn match_accepts_a_signature_snapshot_path() {
    let fx = fixture();
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("target.sig");
    fx.target.dump_path(&path).expect("dump target");

    let from_path = fx.db.match_target(path.as_path(), &FingerprintMatcher, None).expect("by path");
    let in_memory = fx.db.match_target(fx.target.clone(), &FingerprintMatcher, None).expect("in memory");
    assert_eq!(from_path, in_memory);

    let missing = tmp.path().join("missing.sig");
    let err = fx.db.match_target(missing, &FingerprintMatcher, None).expect_err("missing target");
    assert!(matches!(err, MatchError::Target(_)));
}

#[derive(Default)]
struct RecordingReporter {
    seen: Mutex<Vec<(String, ScoreReport)>>,
}

impl ScoreReporter for RecordingReporter {
    fn report(&self, label: &str, target: &Signature, candidates: &CandidateMap<'_>, db: &SignatureDatabase) {
        let score = score_candidates(target, candidates, db);
        self.seen.lock().expect("reporter lock").push((label.to_string(), score));
    }
}

#[test]
fn scoring_observes_both_maps_without_changing_the_result() {
    let fx = fixture();
    let reporter = RecordingReporter::default();

    let scored = fx.db.match_target(fx.target.clone(), &FingerprintMatcher, Some(&reporter)).expect("scored");
    let plain = fx.db.match_target(fx.target.clone(), &FingerprintMatcher, None).expect("plain");
    assert_eq!(scored, plain);

    let seen = reporter.seen.lock().expect("reporter lock");
    let labels: Vec<&str> = seen.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(labels, vec!["unrefined", "final"]);
    // Target names are t_*, none of which the corpus knows.
    assert!(seen.iter().all(|(_, s)| s.correct == 0 && s.unknown == 4));
    assert_eq!(seen[0].1.total, 3);
}

struct FailingMatcher;

impl Matcher for FailingMatcher {
    fn candidates<'db>(
        &self,
        _target: &Signature,
        _db: &'db SignatureDatabase,
    ) -> Result<CandidatePair<'db>, MatchError> {
        Err(MatchError::Matcher { matcher: self.name().into(), reason: "graph explosion".into() })
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

#[test]
fn matcher_failures_propagate_to_the_caller() {
    let fx = fixture();
    match fx.db.match_target(fx.target.clone(), &FailingMatcher, None) {
        Err(MatchError::Matcher { matcher, reason }) => {
            assert_eq!(matcher, "failing");
            assert_eq!(reason, "graph explosion");
        }
        Err(other) => panic!("expected Matcher error, got {other}"),
        Ok(_) => panic!("expected Matcher error, got Ok(_)"),
    }
}

#[test]
fn batch_matching_keeps_input_order() {
    let fx = fixture();
    let empty = Signature::new("empty", None, "e", Vec::new());
    let results = fx.db.match_many(vec![fx.target.clone(), empty, fx.target.clone()], &FingerprintMatcher);

    assert_eq!(results.len(), 3);
    let first = results[0].as_ref().expect("first");
    let second = results[1].as_ref().expect("second");
    let third = results[2].as_ref().expect("third");
    assert_eq!(first.summary.matched, 2);
    assert!(second.mapping.is_empty());
    assert_eq!(second.summary, MatchSummary::default());
    assert_eq!(first, third);
}
