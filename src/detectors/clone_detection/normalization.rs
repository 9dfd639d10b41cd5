//! Language-agnostic normalization and structural hashing.
//!
//! Canonicalization walks a [`SyntaxNode`] tree once and:
//! - replaces parameter identifiers by `$p{k}` (declaration order), other
//!   identifiers by `$l{k}` (first-occurrence order), and the function's own
//!   name by `$fn`
//! - keeps field selectors (`.name`) and type text (`T:...`) verbatim
//! - replaces literals by typed placeholders (`#str`, `#int`, ...)
//! - drops comments and keeps the control-flow skeleton intact
//!
//! The fully indexed form feeds the structural hash. Comparison views use
//! "coarse" labels with placeholder indices removed, so that inserting one
//! statement does not renumber every later local.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use ahash::AHasher;
use serde::{Deserialize, Serialize};

use crate::core::function::{NodeRole, SyntaxNode};

/// Reserved hash for functions without a body
pub const EMPTY_STRUCTURAL_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Label used for the function's own name
const FUNCTION_NAME_PLACEHOLDER: &str = "$fn";

/// Node of a canonical (normalized) tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalNode {
    label: String,
    kind_hash: u64,
    size: usize,
    children: Vec<CanonicalNode>,
}

impl CanonicalNode {
    fn new(label: String, children: Vec<CanonicalNode>) -> Self {
        let kind_hash = hash_label(coarse_label(&label));
        let size = 1 + children.iter().map(|c| c.size).sum::<usize>();
        Self {
            label,
            kind_hash,
            size,
            children,
        }
    }

    /// Fully indexed label (e.g. `$l3`)
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Label with placeholder indices removed (e.g. `$l`)
    pub fn coarse_label(&self) -> &str {
        coarse_label(&self.label)
    }

    /// Hash of the coarse label, used as the tree-edit node kind
    pub fn kind_hash(&self) -> u64 {
        self.kind_hash
    }

    /// Number of nodes in this subtree
    pub fn size(&self) -> usize {
        self.size
    }

    /// Child nodes
    pub fn children(&self) -> &[CanonicalNode] {
        &self.children
    }

    fn serialize_into(&self, out: &mut String) {
        out.push_str(&self.label.len().to_string());
        out.push(':');
        out.push_str(&self.label);
        if !self.children.is_empty() {
            out.push('(');
            for child in &self.children {
                child.serialize_into(out);
            }
            out.push(')');
        }
    }

    fn collect_tokens(&self, tokens: &mut Vec<String>) {
        tokens.push(self.coarse_label().to_string());
        for child in &self.children {
            child.collect_tokens(tokens);
        }
    }
}

/// Strip the numeric suffix of `$p{k}` / `$l{k}` placeholders.
pub fn coarse_label(label: &str) -> &str {
    if label.len() > 2
        && (label.starts_with("$p") || label.starts_with("$l"))
        && label[2..].bytes().all(|b| b.is_ascii_digit())
    {
        &label[..2]
    } else {
        label
    }
}

fn hash_label(label: &str) -> u64 {
    let mut hasher = AHasher::default();
    label.hash(&mut hasher);
    hasher.finish()
}

/// Control-flow skeleton counts of a function body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSkeleton {
    /// `if`-style branches
    pub branches: usize,
    /// Loops
    pub loops: usize,
    /// `switch`/`match`/`select` constructs
    pub switches: usize,
    /// Statements across all blocks
    pub statements: usize,
    /// Deepest nesting of control constructs
    pub max_depth: usize,
}

impl ControlSkeleton {
    /// Feature vector used by the structural factor
    pub fn features(&self) -> [usize; 5] {
        [
            self.branches,
            self.loops,
            self.switches,
            self.statements,
            self.max_depth,
        ]
    }
}

/// Canonical representation of a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedForm {
    root: Option<CanonicalNode>,
    skeleton: ControlSkeleton,
    tokens: Vec<String>,
    serialized: String,
    hash: String,
}

impl NormalizedForm {
    fn empty() -> Self {
        Self {
            root: None,
            skeleton: ControlSkeleton::default(),
            tokens: Vec::new(),
            serialized: String::new(),
            hash: EMPTY_STRUCTURAL_HASH.to_string(),
        }
    }

    /// Canonical tree, `None` for an empty body
    pub fn root(&self) -> Option<&CanonicalNode> {
        self.root.as_ref()
    }

    /// Control-flow skeleton
    pub fn skeleton(&self) -> &ControlSkeleton {
        &self.skeleton
    }

    /// Pre-order stream of coarse labels
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Serialized canonical tree
    pub fn serialized(&self) -> &str {
        &self.serialized
    }

    /// Structural hash of the serialized form
    pub fn structural_hash(&self) -> &str {
        &self.hash
    }

    /// Number of canonical nodes
    pub fn node_count(&self) -> usize {
        self.root.as_ref().map_or(0, CanonicalNode::size)
    }

    /// Whether this form is the empty-body sentinel
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

/// Parameter and return type lists of a function
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSignature {
    /// Parameter types in declaration order
    pub params: Vec<String>,
    /// Return types in declaration order
    pub returns: Vec<String>,
}

impl FunctionSignature {
    /// Total number of types in the signature
    pub fn len(&self) -> usize {
        self.params.len() + self.returns.len()
    }

    /// Whether the signature declares no types at all
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.returns.is_empty()
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.params.join(", "))?;
        if !self.returns.is_empty() {
            write!(f, " -> ({})", self.returns.join(", "))?;
        }
        Ok(())
    }
}

/// Canonicalizes syntax trees
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    /// Create a new normalizer
    pub fn new() -> Self {
        Self
    }

    /// Canonicalize a function syntax tree.
    pub fn normalize(&self, tree: &SyntaxNode) -> NormalizedForm {
        if tree.has_empty_body() {
            return NormalizedForm::empty();
        }

        let mut state = NormalizationState::new(function_name(tree));
        let root = state.canonicalize(tree, false, 0);

        let mut serialized = String::with_capacity(root.size * 8);
        root.serialize_into(&mut serialized);

        let mut tokens = Vec::with_capacity(root.size);
        root.collect_tokens(&mut tokens);

        let hash = hash_serialized(&serialized);
        NormalizedForm {
            root: Some(root),
            skeleton: state.skeleton,
            tokens,
            serialized,
            hash,
        }
    }

    /// Structural hash of a normalized form.
    pub fn hash(&self, form: &NormalizedForm) -> String {
        if form.is_empty() {
            EMPTY_STRUCTURAL_HASH.to_string()
        } else {
            hash_serialized(&form.serialized)
        }
    }

    /// Signature string (parameter and return types only).
    pub fn signature(&self, tree: &SyntaxNode) -> String {
        extract_signature(tree).to_string()
    }
}

fn hash_serialized(serialized: &str) -> String {
    blake3::hash(serialized.as_bytes()).to_hex().to_string()
}

fn function_name(tree: &SyntaxNode) -> Option<String> {
    tree.child_with_role(NodeRole::Name)
        .map(SyntaxNode::text_or_leaves)
}

struct NormalizationState {
    function_name: Option<String>,
    params: HashMap<String, usize>,
    locals: HashMap<String, usize>,
    skeleton: ControlSkeleton,
}

impl NormalizationState {
    fn new(function_name: Option<String>) -> Self {
        Self {
            function_name,
            params: HashMap::new(),
            locals: HashMap::new(),
            skeleton: ControlSkeleton::default(),
        }
    }

    fn canonicalize(&mut self, node: &SyntaxNode, in_parameter: bool, depth: usize) -> CanonicalNode {
        match node.role {
            NodeRole::Name => CanonicalNode::new(FUNCTION_NAME_PLACEHOLDER.to_string(), Vec::new()),
            NodeRole::Identifier => {
                let label = self.identifier_label(&node.text_or_leaves(), in_parameter);
                CanonicalNode::new(label, Vec::new())
            }
            NodeRole::Field => {
                CanonicalNode::new(format!(".{}", node.text_or_leaves()), Vec::new())
            }
            NodeRole::Type => CanonicalNode::new(format!("T:{}", node.text_or_leaves()), Vec::new()),
            NodeRole::ReturnType => {
                CanonicalNode::new(format!("R:{}", node.text_or_leaves()), Vec::new())
            }
            NodeRole::Literal(kind) => CanonicalNode::new(kind.placeholder().to_string(), Vec::new()),
            NodeRole::Operator => CanonicalNode::new(node.text_or_leaves(), Vec::new()),
            NodeRole::Branch | NodeRole::Loop | NodeRole::Switch => {
                match node.role {
                    NodeRole::Branch => self.skeleton.branches += 1,
                    NodeRole::Loop => self.skeleton.loops += 1,
                    _ => self.skeleton.switches += 1,
                }
                let depth = depth + 1;
                self.skeleton.max_depth = self.skeleton.max_depth.max(depth);
                let children = self.canonicalize_children(node, in_parameter, depth);
                CanonicalNode::new(node.kind.clone(), children)
            }
            NodeRole::Block => {
                self.skeleton.statements += node
                    .children
                    .iter()
                    .filter(|c| c.role != NodeRole::Comment)
                    .count();
                let children = self.canonicalize_children(node, in_parameter, depth);
                CanonicalNode::new(node.kind.clone(), children)
            }
            NodeRole::Parameter => {
                let children = self.canonicalize_children(node, true, depth);
                CanonicalNode::new(node.kind.clone(), children)
            }
            _ => {
                let children = self.canonicalize_children(node, in_parameter, depth);
                CanonicalNode::new(node.kind.clone(), children)
            }
        }
    }

    fn canonicalize_children(
        &mut self,
        node: &SyntaxNode,
        in_parameter: bool,
        depth: usize,
    ) -> Vec<CanonicalNode> {
        node.children
            .iter()
            .filter(|c| c.role != NodeRole::Comment)
            .map(|c| self.canonicalize(c, in_parameter, depth))
            .collect()
    }

    fn identifier_label(&mut self, name: &str, in_parameter: bool) -> String {
        if in_parameter {
            let next = self.params.len();
            let index = *self.params.entry(name.to_string()).or_insert(next);
            return format!("$p{index}");
        }
        if self.function_name.as_deref() == Some(name) {
            return FUNCTION_NAME_PLACEHOLDER.to_string();
        }
        if let Some(index) = self.params.get(name) {
            return format!("$p{index}");
        }
        let next = self.locals.len();
        let index = *self.locals.entry(name.to_string()).or_insert(next);
        format!("$l{index}")
    }
}

/// Extract parameter and return type lists; argument names are ignored.
pub fn extract_signature(tree: &SyntaxNode) -> FunctionSignature {
    let mut signature = FunctionSignature::default();

    for child in &tree.children {
        match child.role {
            NodeRole::ParameterList => collect_parameter_types(child, &mut signature.params),
            NodeRole::ReturnType => {
                if child.children.iter().any(|c| c.role == NodeRole::Parameter) {
                    collect_parameter_types(child, &mut signature.returns);
                } else {
                    signature.returns.push(child.text_or_leaves());
                }
            }
            _ => {}
        }
    }

    signature
}

fn collect_parameter_types(list: &SyntaxNode, out: &mut Vec<String>) {
    for parameter in list.children.iter().filter(|c| c.role == NodeRole::Parameter) {
        let ty = first_type(parameter).unwrap_or_else(|| "_".to_string());
        let names = parameter
            .children
            .iter()
            .filter(|c| c.role == NodeRole::Identifier)
            .count()
            .max(1);
        out.extend(std::iter::repeat(ty).take(names));
    }
}

fn first_type(node: &SyntaxNode) -> Option<String> {
    if node.role == NodeRole::Type {
        return Some(node.text_or_leaves());
    }
    node.children.iter().find_map(first_type)
}
