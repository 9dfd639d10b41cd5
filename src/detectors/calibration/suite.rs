//! Labeled validation suite for weight calibration.
//!
//! Every case holds two Go function sources and the similarity a good weight
//! vector should assign to them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of edit separating the two sides of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCategory {
    /// Byte-identical functions
    Identical,
    /// Only identifiers differ
    Renamed,
    /// Only formatting and comments differ
    Reformatted,
    /// One side has an extra statement
    StatementAdded,
    /// Same behavior, restructured code
    Refactored,
    /// Independent statements swapped
    Reordered,
    /// Different behavior entirely
    Unrelated,
    /// Same body, different parameter or return types
    SignatureChanged,
}

impl ValidationCategory {
    /// Stable lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationCategory::Identical => "identical",
            ValidationCategory::Renamed => "renamed",
            ValidationCategory::Reformatted => "reformatted",
            ValidationCategory::StatementAdded => "statement_added",
            ValidationCategory::Refactored => "refactored",
            ValidationCategory::Reordered => "reordered",
            ValidationCategory::Unrelated => "unrelated",
            ValidationCategory::SignatureChanged => "signature_changed",
        }
    }
}

impl fmt::Display for ValidationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A labeled pair of function sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCase {
    /// Case name used in logs and reports
    pub name: String,
    /// Edit category
    pub category: ValidationCategory,
    /// First function (Go source of one function)
    pub source_a: String,
    /// Second function
    pub source_b: String,
    /// Expected similarity in [0, 1]
    pub expected: f64,
}

impl ValidationCase {
    /// Create a case
    pub fn new(
        name: impl Into<String>,
        category: ValidationCategory,
        source_a: impl Into<String>,
        source_b: impl Into<String>,
        expected: f64,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            source_a: source_a.into(),
            source_b: source_b.into(),
            expected,
        }
    }
}

/// Fixed set of validation cases
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSuite {
    cases: Vec<ValidationCase>,
}

impl ValidationSuite {
    /// Suite over caller-provided cases
    pub fn new(cases: Vec<ValidationCase>) -> Self {
        Self { cases }
    }

    /// Cases in insertion order
    pub fn cases(&self) -> &[ValidationCase] {
        &self.cases
    }

    /// Number of cases
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether the suite has no cases
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Distinct categories present, in declaration order
    pub fn categories(&self) -> Vec<ValidationCategory> {
        let mut categories: Vec<_> = self.cases.iter().map(|c| c.category).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Built-in suite of Go function pairs covering every category.
    pub fn builtin() -> Self {
        use ValidationCategory::{
            Identical, Refactored, Reformatted, Renamed, Reordered, SignatureChanged,
            StatementAdded, Unrelated,
        };

        let cases = vec![
            ValidationCase::new("identical_sum", Identical, SUM_INTS, SUM_INTS, 1.0),
            ValidationCase::new("identical_lookup", Identical, LOOKUP, LOOKUP, 1.0),
            ValidationCase::new("renamed_sum", Renamed, SUM_INTS, SUM_INTS_RENAMED, 1.0),
            ValidationCase::new("renamed_filter", Renamed, FILTER_POSITIVE, FILTER_POSITIVE_RENAMED, 1.0),
            ValidationCase::new("reformatted_lookup", Reformatted, LOOKUP, LOOKUP_REFORMATTED, 1.0),
            ValidationCase::new("logging_added", StatementAdded, SUM_INTS, SUM_INTS_LOGGED, 0.85),
            ValidationCase::new("guard_added", StatementAdded, FILTER_POSITIVE, FILTER_POSITIVE_GUARDED, 0.8),
            ValidationCase::new("index_loop", Refactored, SUM_INTS, SUM_INTS_INDEXED, 0.75),
            ValidationCase::new("swapped_setup", Reordered, BUILD_GREETING, BUILD_GREETING_REORDERED, 0.85),
            ValidationCase::new("sum_vs_sort", Unrelated, SUM_INTS, SORT_NAMES, 0.1),
            ValidationCase::new("lookup_vs_greeting", Unrelated, LOOKUP, BUILD_GREETING, 0.1),
            ValidationCase::new("filter_vs_sort", Unrelated, FILTER_POSITIVE, SORT_NAMES, 0.15),
            ValidationCase::new("sum_int64", SignatureChanged, SUM_INTS, SUM_INTS_WIDE, 0.6),
            ValidationCase::new("lookup_with_default", SignatureChanged, LOOKUP, LOOKUP_WITH_DEFAULT, 0.55),
        ];

        Self { cases }
    }
}

const SUM_INTS: &str = r#"func sumInts(values []int) int {
	total := 0
	for _, v := range values {
		total += v
	}
	return total
}"#;

const SUM_INTS_RENAMED: &str = r#"func addAll(numbers []int) int {
	acc := 0
	for _, n := range numbers {
		acc += n
	}
	return acc
}"#;

const SUM_INTS_LOGGED: &str = r#"func sumInts(values []int) int {
	total := 0
	for _, v := range values {
		total += v
	}
	log.Printf("sum computed: %d", total)
	return total
}"#;

const SUM_INTS_INDEXED: &str = r#"func sumInts(values []int) int {
	total := 0
	for i := 0; i < len(values); i++ {
		total = total + values[i]
	}
	return total
}"#;

const SUM_INTS_WIDE: &str = r#"func sumInts(values []int64, start int64) (int64, error) {
	total := start
	for _, v := range values {
		total += v
	}
	return total, nil
}"#;

const FILTER_POSITIVE: &str = r#"func filterPositive(items []int) []int {
	out := make([]int, 0, len(items))
	for _, item := range items {
		if item > 0 {
			out = append(out, item)
		}
	}
	return out
}"#;

const FILTER_POSITIVE_RENAMED: &str = r#"func keepAbove(xs []int) []int {
	kept := make([]int, 0, len(xs))
	for _, x := range xs {
		if x > 0 {
			kept = append(kept, x)
		}
	}
	return kept
}"#;

const FILTER_POSITIVE_GUARDED: &str = r#"func filterPositive(items []int) []int {
	if len(items) == 0 {
		return nil
	}
	out := make([]int, 0, len(items))
	for _, item := range items {
		if item > 0 {
			out = append(out, item)
		}
	}
	return out
}"#;

const LOOKUP: &str = r#"func lookup(table map[string]int, key string) int {
	if value, ok := table[key]; ok {
		return value
	}
	return -1
}"#;

const LOOKUP_REFORMATTED: &str = r#"func lookup(table map[string]int, key string) int {
	// fast path
	if value, ok := table[key]; ok { return value }

	return -1 // missing
}"#;

const LOOKUP_WITH_DEFAULT: &str = r#"func lookup(table map[string]int, key string, fallback int) (int, bool) {
	if value, ok := table[key]; ok {
		return value, true
	}
	return fallback, false
}"#;

const BUILD_GREETING: &str = r#"func buildGreeting(name string, excited bool) string {
	prefix := "Hello, "
	suffix := "."
	if excited {
		suffix = "!"
	}
	return prefix + name + suffix
}"#;

const BUILD_GREETING_REORDERED: &str = r#"func buildGreeting(name string, excited bool) string {
	suffix := "."
	prefix := "Hello, "
	if excited {
		suffix = "!"
	}
	return prefix + name + suffix
}"#;

const SORT_NAMES: &str = r#"func sortNames(names []string, desc bool) {
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
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_suite_covers_every_category() {
        let suite = ValidationSuite::builtin();
        assert!(suite.len() >= 12);
        assert_eq!(suite.categories().len(), 8);
        assert!(suite
            .cases()
            .iter()
            .all(|c| (0.0..=1.0).contains(&c.expected)));
    }

    #[test]
    fn category_names_are_stable() {
        assert_eq!(ValidationCategory::StatementAdded.to_string(), "statement_added");
        let json = serde_json::to_string(&ValidationCategory::SignatureChanged).unwrap();
        assert_eq!(json, "\"signature_changed\"");
    }

    #[test]
    fn custom_suite_keeps_cases() {
        let suite = ValidationSuite::new(vec![ValidationCase::new(
            "one",
            ValidationCategory::Identical,
            "func a() {}",
            "func a() {}",
            1.0,
        )]);
        assert_eq!(suite.len(), 1);
        assert!(!suite.is_empty());
        assert!(ValidationSuite::default().is_empty());
    }
}
