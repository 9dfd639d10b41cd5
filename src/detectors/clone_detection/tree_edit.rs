//! Normalized tree edit distance over canonical trees.

use tree_edit_distance::{diff, Node as TedNode, Tree as TedTree};

use super::normalization::CanonicalNode;

/// [`TedNode`] implementation for [`CanonicalNode`].
impl TedNode for CanonicalNode {
    type Kind = u64;

    /// Hash of the coarse label, so renumbered placeholders still match.
    fn kind(&self) -> Self::Kind {
        self.kind_hash()
    }

    type Weight = u64;

    fn weight(&self) -> Self::Weight {
        1
    }
}

/// [`TedTree`] implementation for [`CanonicalNode`].
impl TedTree for CanonicalNode {
    type Children<'c>
        = std::slice::Iter<'c, CanonicalNode>
    where
        Self: 'c;

    fn children(&self) -> Self::Children<'_> {
        self.children().iter()
    }
}

/// Raw edit cost between two canonical trees
pub fn edit_cost(a: &CanonicalNode, b: &CanonicalNode) -> u64 {
    let (_, cost) = diff(a, b);
    cost
}

/// Similarity in [0, 1] derived from the edit cost.
///
/// The cost is normalized by the size of the larger tree. Two empty bodies
/// are identical; an empty body against a populated one scores zero.
pub fn tree_edit_similarity(a: Option<&CanonicalNode>, b: Option<&CanonicalNode>) -> f64 {
    match (a, b) {
        (None, None) => 1.0,
        (None, Some(_)) | (Some(_), None) => 0.0,
        (Some(a), Some(b)) => {
            let largest = a.size().max(b.size()).max(1);
            let cost = edit_cost(a, b);
            (1.0 - cost as f64 / largest as f64).clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::function::{LiteralKind, NodeRole, SyntaxNode};
    use crate::detectors::clone_detection::normalization::Normalizer;

    fn body(statements: usize) -> SyntaxNode {
        let block = (0..statements).fold(SyntaxNode::new("block", NodeRole::Block), |block, i| {
            block.with_child(
                SyntaxNode::new("assignment_statement", NodeRole::Other)
                    .with_child(SyntaxNode::leaf("identifier", NodeRole::Identifier, format!("v{i}")))
                    .with_child(SyntaxNode::leaf(
                        "int_literal",
                        NodeRole::Literal(LiteralKind::Int),
                        i.to_string(),
                    )),
            )
        });
        SyntaxNode::new("function_declaration", NodeRole::Function)
            .with_child(SyntaxNode::leaf("identifier", NodeRole::Name, "f"))
            .with_child(block)
    }

    #[test]
    fn identical_trees_have_zero_cost() {
        let form = Normalizer::new().normalize(&body(3));
        let root = form.root().unwrap();
        assert_eq!(edit_cost(root, root), 0);
        assert_eq!(tree_edit_similarity(Some(root), Some(root)), 1.0);
    }

    #[test]
    fn inserted_statement_costs_its_subtree() {
        let normalizer = Normalizer::new();
        let small = normalizer.normalize(&body(3));
        let large = normalizer.normalize(&body(4));

        // Each statement is three canonical nodes.
        assert_eq!(edit_cost(small.root().unwrap(), large.root().unwrap()), 3);

        let similarity = tree_edit_similarity(small.root(), large.root());
        assert!(similarity > 0.7 && similarity < 1.0, "got {similarity}");
    }

    #[test]
    fn empty_bodies_are_handled() {
        let form = Normalizer::new().normalize(&body(2));
        assert_eq!(tree_edit_similarity(None, None), 1.0);
        assert_eq!(tree_edit_similarity(None, form.root()), 0.0);
        assert_eq!(tree_edit_similarity(form.root(), None), 0.0);
    }
}
