//! End-to-end duplicate detection over parsed Go and Rust sources.

use twinscan_rs::core::config::{DetectorConfig, SchedulerConfig};
use twinscan_rs::detectors::clone_detection::{ComparisonScheduler, SimilarityDetector};
use twinscan_rs::lang::common::LanguageAdapter;
use twinscan_rs::lang::go::GoAdapter;
use twinscan_rs::lang::registry::extract_from_sources;
use twinscan_rs::FunctionDescriptor;

const INVENTORY_GO: &str = r#"package inventory

func sumInts(values []int) int {
	total := 0
	for _, v := range values {
		total += v
	}
	return total
}

func addAll(numbers []int) int {
	acc := 0
	for _, n := range numbers {
		acc += n
	}
	return acc
}

func sumIntsLogged(values []int) int {
	total := 0
	for _, v := range values {
		total += v
	}
	log.Printf("sum computed: %d", total)
	return total
}

func sortNames(names []string, desc bool) {
	for i := 0; i < len(names); i++ {
		for j := i + 1; j < len(names); j++ {
			swap := names[i] > names[j]
			if desc {
				swap = !swap
			}
			if swap {
				names[i], names[j] = names[j], names[i]
			}
		}
	}
}
"#;

fn parse_go(source: &str) -> Vec<FunctionDescriptor> {
    let mut adapter = GoAdapter::new().expect("go adapter");
    adapter
        .extract_functions(source, "inventory.go")
        .expect("inventory parses")
}

fn find<'a>(functions: &'a [FunctionDescriptor], name: &str) -> &'a FunctionDescriptor {
    functions
        .iter()
        .find(|f| f.name() == name)
        .unwrap_or_else(|| panic!("function {name} not extracted"))
}

fn detector() -> SimilarityDetector {
    SimilarityDetector::new(DetectorConfig::default()).expect("default config is valid")
}

#[test]
fn renamed_identifiers_are_exact_duplicates() {
    let functions = parse_go(INVENTORY_GO);
    let score = detector().score(find(&functions, "sumInts"), find(&functions, "addAll"));
    assert_eq!(score, 1.0);
}

#[test]
fn extra_logging_statement_is_a_near_duplicate() {
    let functions = parse_go(INVENTORY_GO);
    let score = detector().score(find(&functions, "sumInts"), find(&functions, "sumIntsLogged"));
    assert!(
        (0.7..1.0).contains(&score),
        "expected near-duplicate score, got {score}"
    );
}

#[test]
fn unrelated_functions_score_low() {
    let functions = parse_go(INVENTORY_GO);
    let score = detector().score(find(&functions, "sumInts"), find(&functions, "sortNames"));
    assert!(score < 0.3, "expected unrelated score, got {score}");
}

#[test]
fn scores_are_symmetric_across_calls() {
    let functions = parse_go(INVENTORY_GO);
    let detector = detector();
    for a in &functions {
        for b in &functions {
            assert_eq!(detector.score(a, b), detector.score(b, a), "{a} vs {b}");
        }
    }
}

#[test]
fn scheduler_reports_duplicates_across_files() {
    let rust_source = "fn total(values: &[i64]) -> i64 {\n    let mut sum = 0;\n    for v in values {\n        sum += v;\n    }\n    sum\n}\n";
    let functions = extract_from_sources(&[
        ("inventory.go", INVENTORY_GO),
        ("totals.rs", rust_source),
        ("notes.txt", "not code"),
    ]);
    assert_eq!(functions.len(), 5);

    let scheduler = ComparisonScheduler::new(
        detector(),
        SchedulerConfig::default().with_workers(3),
    )
    .expect("scheduler");

    let mut calls = Vec::new();
    let outcome = scheduler.find_similar(&functions, |done, total| calls.push((done, total)));

    assert!(outcome.is_complete());
    assert_eq!(outcome.stats.total_comparisons, 10);
    assert_eq!(calls.last(), Some(&(10, 10)));

    let exact: Vec<_> = outcome
        .matches
        .iter()
        .filter(|m| m.score == 1.0)
        .map(|m| (m.left.name.as_str(), m.right.name.as_str()))
        .collect();
    assert_eq!(exact, vec![("sumInts", "addAll")]);
    assert!(outcome
        .matches
        .windows(2)
        .all(|pair| pair[0].score >= pair[1].score));
}

#[test]
fn fewer_than_two_functions_never_report_progress() {
    let scheduler =
        ComparisonScheduler::new(detector(), SchedulerConfig::default()).expect("scheduler");
    let functions = parse_go(INVENTORY_GO);

    for input in [&functions[..0], &functions[..1]] {
        let mut calls = 0;
        let outcome = scheduler.find_similar(input, |_, _| calls += 1);
        assert_eq!(calls, 0);
        assert!(outcome.matches.is_empty());
        assert!(outcome.is_complete());
    }
}
