//! Rust language adapter with tree-sitter integration.

use tree_sitter::Parser;

use super::common::{extract_with_grammar, GrammarSpec, LanguageAdapter};
use super::registry::create_parser_for_language;
use crate::core::errors::Result;
use crate::core::function::{FunctionDescriptor, LiteralKind, NodeRole};

const RUST_GRAMMAR: GrammarSpec = GrammarSpec {
    language: "rs",
    function_kinds: &["function_item", "function_signature_item"],
    transparent_kinds: &[],
    root_field_role: rust_root_field_role,
    classify: rust_node_role,
};

fn rust_root_field_role(field: &str) -> Option<NodeRole> {
    match field {
        "name" => Some(NodeRole::Name),
        "parameters" => Some(NodeRole::ParameterList),
        "return_type" => Some(NodeRole::ReturnType),
        "body" => Some(NodeRole::Block),
        _ => None,
    }
}

fn rust_node_role(kind: &str) -> NodeRole {
    match kind {
        "identifier" | "self" => NodeRole::Identifier,
        "field_identifier" | "shorthand_field_identifier" => NodeRole::Field,
        "type_identifier" | "primitive_type" | "scoped_type_identifier" => NodeRole::Type,
        "parameters" => NodeRole::ParameterList,
        "parameter" | "self_parameter" | "variadic_parameter" => NodeRole::Parameter,
        "block" => NodeRole::Block,
        "if_expression" => NodeRole::Branch,
        "for_expression" | "while_expression" | "loop_expression" => NodeRole::Loop,
        "match_expression" => NodeRole::Switch,
        "line_comment" | "block_comment" => NodeRole::Comment,
        "string_literal" | "raw_string_literal" => NodeRole::Literal(LiteralKind::Str),
        "integer_literal" => NodeRole::Literal(LiteralKind::Int),
        "float_literal" => NodeRole::Literal(LiteralKind::Float),
        "boolean_literal" => NodeRole::Literal(LiteralKind::Bool),
        "char_literal" => NodeRole::Literal(LiteralKind::Char),
        other if other.ends_with("_type") => NodeRole::Type,
        _ => NodeRole::Other,
    }
}

/// Rust-specific parsing into function descriptors
pub struct RustAdapter {
    /// Tree-sitter parser for Rust
    parser: Parser,
}

impl RustAdapter {
    /// Create a new Rust adapter
    pub fn new() -> Result<Self> {
        let parser = create_parser_for_language("rs")?;
        Ok(Self { parser })
    }
}

impl LanguageAdapter for RustAdapter {
    fn language(&self) -> &str {
        RUST_GRAMMAR.language
    }

    fn extract_functions(&mut self, source: &str, file_path: &str) -> Result<Vec<FunctionDescriptor>> {
        extract_with_grammar(&mut self.parser, &RUST_GRAMMAR, source, file_path)
    }
}
