//! Parsed function descriptors and their language-neutral syntax trees.
//!
//! A [`FunctionDescriptor`] owns its raw [`SyntaxNode`] tree exclusively.
//! Derived data (normalized form, structural hash, signature) is computed on
//! first access and memoized in a write-once cell, so concurrent readers
//! never observe a partially written value.

use std::fmt;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, TwinscanError};
use crate::detectors::clone_detection::normalization::{
    extract_signature, FunctionSignature, NormalizedForm, Normalizer,
};

/// Literal categories retained by normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiteralKind {
    /// String or raw string
    Str,
    /// Integer
    Int,
    /// Floating point or imaginary
    Float,
    /// `true` / `false`
    Bool,
    /// Rune or char
    Char,
    /// `nil` or unit-like null value
    Nil,
}

impl LiteralKind {
    /// Placeholder label used in canonical forms
    pub fn placeholder(self) -> &'static str {
        match self {
            LiteralKind::Str => "#str",
            LiteralKind::Int => "#int",
            LiteralKind::Float => "#float",
            LiteralKind::Bool => "#bool",
            LiteralKind::Char => "#char",
            LiteralKind::Nil => "#nil",
        }
    }
}

/// Language-neutral role of a syntax node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    /// Function declaration root
    Function,
    /// The function's own name
    Name,
    /// Variable, parameter, or callee identifier
    Identifier,
    /// Field or method selector name
    Field,
    /// Type expression (collapsed to its text)
    Type,
    /// Literal value
    Literal(LiteralKind),
    /// One parameter declaration
    Parameter,
    /// Parameter list of the function
    ParameterList,
    /// Declared return type(s)
    ReturnType,
    /// Statement block
    Block,
    /// Conditional branch (`if`)
    Branch,
    /// Loop construct
    Loop,
    /// Multi-way branch (`switch`, `match`, `select`)
    Switch,
    /// Comment (stripped by normalization)
    Comment,
    /// Operator token
    Operator,
    /// Any other construct
    Other,
}

/// Raw syntax tree node produced by a language adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxNode {
    /// Grammar node kind (e.g. `for_statement`)
    pub kind: String,

    /// Language-neutral role
    pub role: NodeRole,

    /// Source text for leaves and collapsed type nodes
    pub text: Option<String>,

    /// Child nodes in source order
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    /// Create an interior node without text.
    pub fn new(kind: impl Into<String>, role: NodeRole) -> Self {
        Self {
            kind: kind.into(),
            role,
            text: None,
            children: Vec::new(),
        }
    }

    /// Create a leaf node carrying source text.
    pub fn leaf(kind: impl Into<String>, role: NodeRole, text: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            role,
            text: Some(text.into()),
            children: Vec::new(),
        }
    }

    /// Append a child, builder style.
    pub fn with_child(mut self, child: SyntaxNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children, builder style.
    pub fn with_children(mut self, children: impl IntoIterator<Item = SyntaxNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Total number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SyntaxNode::node_count).sum::<usize>()
    }

    /// First direct child with the given role
    pub fn child_with_role(&self, role: NodeRole) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.role == role)
    }

    /// Source text of this node, or the concatenated text of its leaves
    pub fn text_or_leaves(&self) -> String {
        if let Some(text) = &self.text {
            return text.clone();
        }
        let mut parts = Vec::new();
        self.collect_leaf_text(&mut parts);
        parts.join(" ")
    }

    fn collect_leaf_text<'a>(&'a self, parts: &mut Vec<&'a str>) {
        if let Some(text) = &self.text {
            parts.push(text);
            return;
        }
        for child in &self.children {
            child.collect_leaf_text(parts);
        }
    }

    /// Whether the function body is missing or contains only comments
    pub fn has_empty_body(&self) -> bool {
        match self.child_with_role(NodeRole::Block) {
            Some(body) => body.children.iter().all(|c| c.role == NodeRole::Comment),
            None => true,
        }
    }
}

/// Parsed function with lazily derived structural data
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    name: String,
    file_path: String,
    start_line: usize,
    end_line: usize,
    syntax_tree: SyntaxNode,

    normalized: OnceCell<NormalizedForm>,
    signature: OnceCell<FunctionSignature>,
}

impl FunctionDescriptor {
    /// Create a descriptor from parser output.
    pub fn new(
        name: impl Into<String>,
        file_path: impl Into<String>,
        start_line: usize,
        end_line: usize,
        syntax_tree: SyntaxNode,
    ) -> Self {
        Self {
            name: name.into(),
            file_path: file_path.into(),
            start_line,
            end_line,
            syntax_tree,
            normalized: OnceCell::new(),
            signature: OnceCell::new(),
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source file path
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// First line (1-based)
    pub fn start_line(&self) -> usize {
        self.start_line
    }

    /// Last line (1-based, inclusive)
    pub fn end_line(&self) -> usize {
        self.end_line
    }

    /// Raw syntax tree
    pub fn syntax_tree(&self) -> &SyntaxNode {
        &self.syntax_tree
    }

    /// Number of source lines spanned by the function
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Stable identity string `file:name:start-end`
    pub fn identity(&self) -> String {
        format!(
            "{}:{}:{}-{}",
            self.file_path, self.name, self.start_line, self.end_line
        )
    }

    /// Check that the descriptor can take part in a comparison.
    pub fn validate(&self) -> Result<()> {
        if self.end_line < self.start_line {
            return Err(TwinscanError::comparison(format!(
                "function '{}' has an inverted line range {}-{}",
                self.name, self.start_line, self.end_line
            )));
        }
        Ok(())
    }

    /// Canonical form, computed once
    pub fn normalized_form(&self) -> &NormalizedForm {
        self.normalized
            .get_or_init(|| Normalizer::new().normalize(&self.syntax_tree))
    }

    /// Content hash of the canonical form
    pub fn structural_hash(&self) -> &str {
        self.normalized_form().structural_hash()
    }

    /// Parameter and return type lists, computed once
    pub fn signature(&self) -> &FunctionSignature {
        self.signature
            .get_or_init(|| extract_signature(&self.syntax_tree))
    }

    /// Whether the body is missing or trivially empty
    pub fn has_empty_body(&self) -> bool {
        self.syntax_tree.has_empty_body()
    }
}

impl fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}:{}-{})",
            self.name, self.file_path, self.start_line, self.end_line
        )
    }
}

/// Serializable reference to a descriptor inside one batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionRef {
    /// Position of the descriptor in the input slice
    pub index: usize,
    /// Function name
    pub name: String,
    /// Source file path
    pub file_path: String,
    /// First line (1-based)
    pub start_line: usize,
    /// Last line (1-based)
    pub end_line: usize,
}

impl FunctionRef {
    /// Capture a reference to `descriptor` at `index`.
    pub fn from_descriptor(index: usize, descriptor: &FunctionDescriptor) -> Self {
        Self {
            index,
            name: descriptor.name.clone(),
            file_path: descriptor.file_path.clone(),
            start_line: descriptor.start_line,
            end_line: descriptor.end_line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_function(name: &str, with_body: bool) -> SyntaxNode {
        let mut root = SyntaxNode::new("function_declaration", NodeRole::Function)
            .with_child(SyntaxNode::leaf("identifier", NodeRole::Name, name))
            .with_child(SyntaxNode::new("parameter_list", NodeRole::ParameterList));
        if with_body {
            root = root.with_child(
                SyntaxNode::new("block", NodeRole::Block).with_child(
                    SyntaxNode::new("return_statement", NodeRole::Other)
                        .with_child(SyntaxNode::leaf("int_literal", NodeRole::Literal(LiteralKind::Int), "1")),
                ),
            );
        }
        root
    }

    #[test]
    fn descriptor_identity_and_line_count() {
        let descriptor = FunctionDescriptor::new("one", "a.go", 10, 12, tiny_function("one", true));
        assert_eq!(descriptor.identity(), "a.go:one:10-12");
        assert_eq!(descriptor.line_count(), 3);
        assert!(descriptor.validate().is_ok());
        assert!(!descriptor.has_empty_body());
    }

    #[test]
    fn inverted_line_range_is_rejected() {
        let descriptor = FunctionDescriptor::new("bad", "a.go", 9, 3, tiny_function("bad", true));
        let err = descriptor.validate().unwrap_err();
        assert!(matches!(err, TwinscanError::Comparison { .. }));
    }

    #[test]
    fn derived_fields_are_memoized() {
        let descriptor = FunctionDescriptor::new("one", "a.go", 1, 3, tiny_function("one", true));
        let first = descriptor.structural_hash() as *const str;
        let second = descriptor.structural_hash() as *const str;
        assert_eq!(first, second);

        let sig_a = descriptor.signature() as *const FunctionSignature;
        let sig_b = descriptor.signature() as *const FunctionSignature;
        assert_eq!(sig_a, sig_b);
    }

    #[test]
    fn missing_body_is_empty() {
        let node = tiny_function("decl", false);
        assert!(node.has_empty_body());

        let commented = tiny_function("c", false).with_child(
            SyntaxNode::new("block", NodeRole::Block)
                .with_child(SyntaxNode::leaf("comment", NodeRole::Comment, "// todo")),
        );
        assert!(commented.has_empty_body());
    }

    #[test]
    fn text_or_leaves_joins_leaf_text() {
        let node = SyntaxNode::new("qualified_type", NodeRole::Other)
            .with_child(SyntaxNode::leaf("package_identifier", NodeRole::Other, "http"))
            .with_child(SyntaxNode::leaf("type_identifier", NodeRole::Type, "Request"));
        assert_eq!(node.text_or_leaves(), "http Request");
        assert_eq!(node.node_count(), 3);
    }
}
