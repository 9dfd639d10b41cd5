//! Common parsing abstractions shared by the tree-sitter adapters.
//!
//! Each adapter describes its grammar with a [`GrammarSpec`]; the shared
//! builder turns the tree-sitter CST into language-neutral [`SyntaxNode`]
//! trees and wraps every function in a [`FunctionDescriptor`].

use tree_sitter::{Node, Parser};
use tracing::{debug, warn};

use crate::core::errors::{Result, TwinscanError};
use crate::core::function::{FunctionDescriptor, NodeRole, SyntaxNode};

/// Anonymous tokens that carry no structure of their own
const STRUCTURAL_PUNCTUATION: &[&str] = &["(", ")", "{", "}", "[", "]", ",", ";", ":", "."];

/// Language adapter producing function descriptors from source text
pub trait LanguageAdapter: Send + Sync {
    /// Canonical language key (e.g. "go")
    fn language(&self) -> &str;

    /// Extract every function with a syntax tree from one source file
    fn extract_functions(&mut self, source: &str, file_path: &str) -> Result<Vec<FunctionDescriptor>>;
}

/// Grammar description consumed by the shared builder
#[derive(Debug, Clone, Copy)]
pub struct GrammarSpec {
    /// Canonical language key
    pub language: &'static str,
    /// Node kinds that start a function
    pub function_kinds: &'static [&'static str],
    /// Node kinds whose children are spliced into the parent
    pub transparent_kinds: &'static [&'static str],
    /// Role of a direct child of a function node, by field name
    pub root_field_role: fn(&str) -> Option<NodeRole>,
    /// Role of any other node, by kind
    pub classify: fn(&str) -> NodeRole,
}

impl GrammarSpec {
    fn is_function(&self, kind: &str) -> bool {
        self.function_kinds.contains(&kind)
    }

    fn is_transparent(&self, kind: &str) -> bool {
        self.transparent_kinds.contains(&kind)
    }
}

/// Whether an anonymous token is kept as an operator leaf.
pub fn is_operator_token(kind: &str) -> bool {
    !kind.is_empty()
        && kind.chars().all(|c| c.is_ascii_punctuation())
        && !STRUCTURAL_PUNCTUATION.contains(&kind)
}

/// Parse `source` and build a descriptor for every function it declares.
pub fn extract_with_grammar(
    parser: &mut Parser,
    grammar: &GrammarSpec,
    source: &str,
    file_path: &str,
) -> Result<Vec<FunctionDescriptor>> {
    let tree = parser.parse(source, None).ok_or_else(|| {
        TwinscanError::parse_with_location(
            grammar.language,
            "parser produced no tree",
            file_path,
            None,
        )
    })?;

    let root = tree.root_node();
    if root.has_error() {
        warn!(
            "{} source {} contains syntax errors; extracting what parsed",
            grammar.language, file_path
        );
    }

    let mut functions = Vec::new();
    collect_functions(root, grammar, source, file_path, &mut functions)?;

    debug!(
        "Extracted {} {} functions from {}",
        functions.len(),
        grammar.language,
        file_path
    );
    Ok(functions)
}

fn collect_functions(
    node: Node,
    grammar: &GrammarSpec,
    source: &str,
    file_path: &str,
    out: &mut Vec<FunctionDescriptor>,
) -> Result<()> {
    if grammar.is_function(node.kind()) {
        out.push(build_function(node, grammar, source, file_path)?);
        // Nested functions stay part of their enclosing body.
        return Ok(());
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_functions(child, grammar, source, file_path, out)?;
    }
    Ok(())
}

fn build_function(
    node: Node,
    grammar: &GrammarSpec,
    source: &str,
    file_path: &str,
) -> Result<FunctionDescriptor> {
    let mut root = SyntaxNode::new(node.kind(), NodeRole::Function);

    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            let field_role = cursor.field_name().and_then(grammar.root_field_role);
            match field_role {
                Some(role) => root.children.push(build_with_role(child, role, grammar, source)?),
                None => push_child(child, grammar, source, &mut root.children)?,
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    let name = root
        .child_with_role(NodeRole::Name)
        .map(SyntaxNode::text_or_leaves)
        .unwrap_or_else(|| "<anonymous>".to_string());

    Ok(FunctionDescriptor::new(
        name,
        file_path,
        node.start_position().row + 1,
        node.end_position().row + 1,
        root,
    ))
}

fn push_child(node: Node, grammar: &GrammarSpec, source: &str, out: &mut Vec<SyntaxNode>) -> Result<()> {
    if node.is_named() {
        if grammar.is_transparent(node.kind()) {
            out.extend(build_children(node, grammar, source)?);
        } else {
            out.push(build_node(node, grammar, source)?);
        }
    } else if is_operator_token(node.kind()) {
        out.push(SyntaxNode::leaf(node.kind(), NodeRole::Operator, node.kind()));
    }
    Ok(())
}

fn build_children(node: Node, grammar: &GrammarSpec, source: &str) -> Result<Vec<SyntaxNode>> {
    let mut children = Vec::with_capacity(node.child_count());
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        push_child(child, grammar, source, &mut children)?;
    }
    Ok(children)
}

fn build_node(node: Node, grammar: &GrammarSpec, source: &str) -> Result<SyntaxNode> {
    build_with_role(node, (grammar.classify)(node.kind()), grammar, source)
}

fn build_with_role(node: Node, role: NodeRole, grammar: &GrammarSpec, source: &str) -> Result<SyntaxNode> {
    let collapse = match role {
        NodeRole::Name
        | NodeRole::Identifier
        | NodeRole::Field
        | NodeRole::Type
        | NodeRole::Literal(_)
        | NodeRole::Comment
        | NodeRole::Operator => true,
        NodeRole::ReturnType => !has_parameter_children(node, grammar),
        _ => node.child_count() == 0,
    };

    if collapse {
        return Ok(SyntaxNode::leaf(node.kind(), role, node_text(&node, source)?));
    }

    let mut syntax = SyntaxNode::new(node.kind(), role);
    syntax.children = build_children(node, grammar, source)?;
    Ok(syntax)
}

fn has_parameter_children(node: Node, grammar: &GrammarSpec) -> bool {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .any(|child| (grammar.classify)(child.kind()) == NodeRole::Parameter);
    found
}

/// Source text of a node with whitespace runs collapsed
pub fn node_text(node: &Node, source: &str) -> Result<String> {
    Ok(node
        .utf8_text(source.as_bytes())?
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" "))
}
