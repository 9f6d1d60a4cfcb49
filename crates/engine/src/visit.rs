//! Visitor-driven rewriting of compiled expression trees.
//!
//! A visitor never mutates a node it did not allocate: it returns a
//! replacement id and the *owner* of the child slot performs the swap
//! ([`ExprArena::replace_child`]). Subtrees referenced from elsewhere in the
//! tree therefore keep their meaning.

use crate::ast::{ExprArena, ExprId};

pub trait ExprVisitor {
    /// Offers one node to the visitor. Returning `Some(id)` asks the owner
    /// to substitute the subtree rooted at `id` for this node; returning
    /// `None` keeps the node.
    fn visit(&mut self, arena: &mut ExprArena, id: ExprId) -> Option<ExprId>;
}

/// Applies `visitor` over the tree rooted at `root`, depth-first, children
/// before parents. Returns the (possibly new) root id.
pub fn rewrite(arena: &mut ExprArena, root: ExprId, visitor: &mut dyn ExprVisitor) -> ExprId {
    for child in arena.child_ids(root) {
        let new_child = rewrite(arena, child, visitor);
        if new_child != child {
            arena.replace_child(root, child, new_child);
        }
    }
    match visitor.visit(arena, root) {
        Some(replacement) => replacement,
        None => root,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, ExprKind};
    use crate::types::AtomicValue;

    /// Folds integer additions with two literal operands.
    struct FoldAdd;

    impl ExprVisitor for FoldAdd {
        fn visit(&mut self, arena: &mut ExprArena, id: ExprId) -> Option<ExprId> {
            let ExprKind::Binary {
                op: BinaryOp::Add,
                left,
                right,
            } = &arena.node(id).kind
            else {
                return None;
            };
            let (left, right) = (*left, *right);
            let (
                ExprKind::Literal(AtomicValue::Integer(a)),
                ExprKind::Literal(AtomicValue::Integer(b)),
            ) = (&arena.node(left).kind, &arena.node(right).kind)
            else {
                return None;
            };
            let folded = *a + *b;
            Some(arena.push(ExprKind::Literal(AtomicValue::Integer(folded))))
        }
    }

    #[test]
    fn folds_nested_additions_bottom_up() {
        let mut arena = ExprArena::new();
        let one = arena.push(ExprKind::Literal(AtomicValue::Integer(1)));
        let two = arena.push(ExprKind::Literal(AtomicValue::Integer(2)));
        let three = arena.push(ExprKind::Literal(AtomicValue::Integer(3)));
        let inner = arena.push(ExprKind::Binary {
            op: BinaryOp::Add,
            left: one,
            right: two,
        });
        let outer = arena.push(ExprKind::Binary {
            op: BinaryOp::Add,
            left: inner,
            right: three,
        });

        let new_root = rewrite(&mut arena, outer, &mut FoldAdd);
        assert_ne!(new_root, outer);
        assert_eq!(
            arena.node(new_root).kind,
            ExprKind::Literal(AtomicValue::Integer(6))
        );
    }

    #[test]
    fn untouched_tree_keeps_its_root() {
        let mut arena = ExprArena::new();
        let lit = arena.push(ExprKind::Literal(AtomicValue::Boolean(true)));
        assert_eq!(rewrite(&mut arena, lit, &mut FoldAdd), lit);
    }
}
