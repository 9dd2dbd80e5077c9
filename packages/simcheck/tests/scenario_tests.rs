//! End-to-end screening scenarios
//!
//! Full-pipeline checks over realistic submission pairs: renamed copies must
//! screen as severe, genuinely different solutions as clean, and degraded
//! pairs must still produce rows.

use simcheck::config::{SemanticFallback, SimilarityConfig};
use simcheck::errors::Result;
use simcheck::pipeline::SemanticAnalyzer;
use simcheck::shared::models::pairwise_comparison_count;
use simcheck::{Language, PairEngine, Severity, Submission};

struct MirrorSemantic;

impl SemanticAnalyzer for MirrorSemantic {
    fn compute_similarity(&self, code1: &str, code2: &str) -> Result<f64> {
        // Structure-blind stand-in: near-full similarity for identical
        // token multisets, proportional otherwise
        let t1: Vec<&str> = code1.split_whitespace().collect();
        let t2: Vec<&str> = code2.split_whitespace().collect();
        if t1.is_empty() || t2.is_empty() {
            return Ok(0.0);
        }
        let shared = t1.iter().filter(|t| t2.contains(t)).count();
        Ok(shared as f64 / t1.len().max(t2.len()) as f64 * 100.0)
    }
}

const FIB_RECURSIVE: &str = "\
def fib(n):
    if n <= 1:
        return n
    return fib(n - 1) + fib(n - 2)
";

const FIB_RECURSIVE_RENAMED: &str = "\
def compute(value):
    if value <= 1:
        return value
    return compute(value - 1) + compute(value - 2)
";

const FIB_ITERATIVE: &str = "\
def fib(n):
    a, b = 0, 1
    for _ in range(n):
        a, b = b, a + b
    return a
";

const CSV_PARSER: &str = "\
import csv

def load_rows(path):
    with open(path) as handle:
        reader = csv.reader(handle)
        return [row for row in reader if row]
";

fn py(id: &str, code: &str) -> Submission {
    Submission::new(id, code, Language::Python)
}

fn engine() -> PairEngine {
    PairEngine::new(SimilarityConfig::default())
        .unwrap()
        .with_semantic(Box::new(MirrorSemantic))
}

#[test]
fn renamed_copy_screens_as_severe() {
    let result = engine().compare_pair(
        &py("original", FIB_RECURSIVE),
        &py("renamed", FIB_RECURSIVE_RENAMED),
    );
    assert!(
        result.final_score >= 90.0,
        "renamed copy scored {}",
        result.final_score
    );
    assert_eq!(result.severity, Severity::Severe);
    // Tree methods are rename-blind
    let breakdown = result.structural_breakdown.unwrap();
    assert!((breakdown.feature_ast.unwrap() - 100.0).abs() < 1e-9);
    assert!((breakdown.node_type.unwrap() - 100.0).abs() < 1e-9);
    assert!((breakdown.gst.unwrap() - 100.0).abs() < 1e-9);
}

#[test]
fn different_solutions_screen_as_clean() {
    let result = engine().compare_pair(&py("recursive", FIB_RECURSIVE), &py("csv", CSV_PARSER));
    assert!(
        result.final_score < 60.0,
        "unrelated code scored {}",
        result.final_score
    );
    assert_eq!(result.severity, Severity::Clean);
}

#[test]
fn same_problem_different_approach_stays_below_severe() {
    let result = engine().compare_pair(
        &py("recursive", FIB_RECURSIVE),
        &py("iterative", FIB_ITERATIVE),
    );
    assert!(result.final_score < 90.0);
    assert_ne!(result.severity, Severity::Severe);
}

#[test]
fn batch_yields_every_pair_sorted() {
    let subs = vec![
        py("s1", FIB_RECURSIVE),
        py("s2", FIB_RECURSIVE_RENAMED),
        py("s3", FIB_ITERATIVE),
        py("s4", CSV_PARSER),
        py("s5", "def broken(:\n    syntax error here\n"),
    ];
    let results = engine().analyze_batch(&subs);
    assert_eq!(results.len(), pairwise_comparison_count(subs.len()));

    for window in results.windows(2) {
        assert!(window[0].result.final_score >= window[1].result.final_score);
    }

    // The renamed pair is the top hit
    let top = &results[0];
    let top_ids = [top.id1.as_str(), top.id2.as_str()];
    assert!(top_ids.contains(&"s1") && top_ids.contains(&"s2"));

    // The unparseable submission still has all of its rows
    let broken_rows = results
        .iter()
        .filter(|r| r.id1 == "s5" || r.id2 == "s5")
        .count();
    assert_eq!(broken_rows, subs.len() - 1);
}

#[test]
fn adjustment_log_is_part_of_the_result() {
    let result = engine().compare_pair(&py("a", FIB_RECURSIVE), &py("b", FIB_RECURSIVE));
    // Identical code: structural and semantic agree at 100, so exactly the
    // agreement boost fires
    assert_eq!(result.adjustments.len(), 1);
    assert!((result.adjustments[0].delta - 5.0).abs() < 1e-9);
    assert!(result.final_score >= result.raw_score);
}

#[test]
fn serialized_rows_carry_the_contract_fields() {
    let subs = vec![py("s1", FIB_RECURSIVE), py("s2", FIB_RECURSIVE_RENAMED)];
    let results = engine().analyze_batch(&subs);
    let json = serde_json::to_value(&results[0]).unwrap();
    assert_eq!(json["id1"], "s1");
    assert_eq!(json["id2"], "s2");
    assert!(json["final_score"].is_number());
    assert!(json["raw_score"].is_number());
    assert_eq!(json["structural_method"], "hybrid");
    assert_eq!(json["severity"], "severe");
    assert!(json["adjustments"].is_array());
}

#[test]
fn gst_only_configuration_detects_copy_paste() {
    let yaml = "structural:\n  name: gst\n";
    let config = SimilarityConfig::from_yaml_str(yaml).unwrap();
    let engine = PairEngine::new(config)
        .unwrap()
        .with_semantic(Box::new(MirrorSemantic));
    let result = engine.compare_pair(&py("a", FIB_RECURSIVE), &py("b", FIB_RECURSIVE));
    assert_eq!(result.structural_method, "gst");
    assert_eq!(result.breakdown.structural, 100.0);
}

#[test]
fn pinned_fallback_applies_without_semantic_collaborator() {
    let mut config = SimilarityConfig::default();
    config.semantic.fallback = SemanticFallback::Pinned(50.0);
    let engine = PairEngine::new(config).unwrap();
    let result = engine.compare_pair(&py("a", FIB_RECURSIVE), &py("b", FIB_RECURSIVE));
    assert_eq!(result.breakdown.semantic, 50.0);
}
