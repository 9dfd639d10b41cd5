use super::*;
use crate::detectors::clone_detection::EMPTY_STRUCTURAL_HASH;

const STORE_SOURCE: &str = r#"package store

// Sum adds values.
func Sum(values []int) int {
	total := 0
	for _, v := range values {
		total += v
	}
	return total
}

func (s *Store) Save(key string, value []byte) error {
	if key == "" {
		return errors.New("empty key")
	}
	s.items[key] = value
	return nil
}

func asmAdd(a, b int) int
"#;

fn extract(source: &str) -> Vec<FunctionDescriptor> {
    let mut adapter = GoAdapter::new().expect("go adapter");
    adapter.extract_functions(source, "store.go").expect("go source parses")
}

#[test]
fn test_extracts_functions_and_methods() {
    let functions = extract(STORE_SOURCE);
    let names: Vec<_> = functions.iter().map(FunctionDescriptor::name).collect();
    assert_eq!(names, vec!["Sum", "Save", "asmAdd"]);

    let sum = &functions[0];
    assert_eq!(sum.file_path(), "store.go");
    assert_eq!(sum.start_line(), 4);
    assert_eq!(sum.end_line(), 10);
    assert_eq!(sum.line_count(), 7);
}

#[test]
fn test_signatures_ignore_names_and_receiver() {
    let functions = extract(STORE_SOURCE);

    let sum = functions[0].signature();
    assert_eq!(sum.params, vec!["[]int".to_string()]);
    assert_eq!(sum.returns, vec!["int".to_string()]);

    let save = functions[1].signature();
    assert_eq!(save.params, vec!["string".to_string(), "[]byte".to_string()]);
    assert_eq!(save.returns, vec!["error".to_string()]);

    let asm = functions[2].signature();
    assert_eq!(asm.params, vec!["int".to_string(), "int".to_string()]);
}

#[test]
fn test_skeleton_counts_statements_and_control_flow() {
    let functions = extract(STORE_SOURCE);

    let sum = functions[0].normalized_form().skeleton();
    assert_eq!(sum.loops, 1);
    assert_eq!(sum.branches, 0);
    assert_eq!(sum.statements, 4);
    assert_eq!(sum.max_depth, 1);

    let save = functions[1].normalized_form().skeleton();
    assert_eq!(save.branches, 1);
    assert_eq!(save.statements, 4);
}

#[test]
fn test_bodyless_declaration_uses_sentinel_hash() {
    let functions = extract(STORE_SOURCE);
    assert!(functions[2].has_empty_body());
    assert_eq!(functions[2].structural_hash(), EMPTY_STRUCTURAL_HASH);
}

#[test]
fn test_renamed_functions_share_hash() {
    let source = r#"package p

func total(values []int) int {
	sum := 0
	for _, v := range values {
		sum += v
	}
	return sum
}

func accumulate(items []int) int {
	// running total
	acc := 0
	for _, item := range items {
		acc += item
	}
	return acc
}
"#;
    let functions = extract(source);
    assert_eq!(functions.len(), 2);
    assert_eq!(functions[0].structural_hash(), functions[1].structural_hash());
}

#[test]
fn test_literal_values_do_not_change_hash_but_kinds_do() {
    let source = r#"package p

func a() string { return "x" }

func b() string { return "something else" }

func c() string { return 42 }
"#;
    let functions = extract(source);
    assert_eq!(functions[0].structural_hash(), functions[1].structural_hash());
    assert_ne!(functions[0].structural_hash(), functions[2].structural_hash());
}

#[test]
fn test_syntax_errors_do_not_abort_extraction() {
    let source = "package p\n\nfunc ok() int { return 1 }\n\nfunc broken( {\n";
    let functions = extract(source);
    assert!(functions.iter().any(|f| f.name() == "ok"));
}

#[test]
fn test_language_key() {
    let adapter = GoAdapter::new().unwrap();
    assert_eq!(adapter.language(), "go");
}
