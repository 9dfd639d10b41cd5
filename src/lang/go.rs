//! Go language adapter with tree-sitter integration.

use tree_sitter::Parser;

use super::common::{extract_with_grammar, GrammarSpec, LanguageAdapter};
use super::registry::create_parser_for_language;
use crate::core::errors::Result;
use crate::core::function::{FunctionDescriptor, LiteralKind, NodeRole};

const GO_GRAMMAR: GrammarSpec = GrammarSpec {
    language: "go",
    function_kinds: &["function_declaration", "method_declaration"],
    transparent_kinds: &["statement_list"],
    root_field_role: go_root_field_role,
    classify: go_node_role,
};

fn go_root_field_role(field: &str) -> Option<NodeRole> {
    match field {
        "name" => Some(NodeRole::Name),
        "parameters" => Some(NodeRole::ParameterList),
        "result" => Some(NodeRole::ReturnType),
        "receiver" => Some(NodeRole::Other),
        "body" => Some(NodeRole::Block),
        _ => None,
    }
}

fn go_node_role(kind: &str) -> NodeRole {
    match kind {
        "identifier" => NodeRole::Identifier,
        "field_identifier" => NodeRole::Field,
        "type_identifier" => NodeRole::Type,
        "parameter_list" => NodeRole::ParameterList,
        "parameter_declaration" | "variadic_parameter_declaration" => NodeRole::Parameter,
        "block" => NodeRole::Block,
        "if_statement" => NodeRole::Branch,
        "for_statement" => NodeRole::Loop,
        "expression_switch_statement" | "type_switch_statement" | "select_statement" => {
            NodeRole::Switch
        }
        "comment" => NodeRole::Comment,
        "interpreted_string_literal" | "raw_string_literal" => NodeRole::Literal(LiteralKind::Str),
        "int_literal" => NodeRole::Literal(LiteralKind::Int),
        "float_literal" | "imaginary_literal" => NodeRole::Literal(LiteralKind::Float),
        "rune_literal" => NodeRole::Literal(LiteralKind::Char),
        "true" | "false" => NodeRole::Literal(LiteralKind::Bool),
        "nil" => NodeRole::Literal(LiteralKind::Nil),
        other if other.ends_with("_type") => NodeRole::Type,
        _ => NodeRole::Other,
    }
}

/// Go-specific parsing into function descriptors
pub struct GoAdapter {
    /// Tree-sitter parser for Go
    parser: Parser,
}

impl GoAdapter {
    /// Create a new Go adapter
    pub fn new() -> Result<Self> {
        let parser = create_parser_for_language("go")?;
        Ok(Self { parser })
    }
}

impl LanguageAdapter for GoAdapter {
    fn language(&self) -> &str {
        GO_GRAMMAR.language
    }

    fn extract_functions(&mut self, source: &str, file_path: &str) -> Result<Vec<FunctionDescriptor>> {
        extract_with_grammar(&mut self.parser, &GO_GRAMMAR, source, file_path)
    }
}

#[cfg(test)]
#[path = "go_tests.rs"]
mod tests;
