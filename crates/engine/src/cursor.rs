//! The lazy node-sequence iteration protocol.
//!
//! A cursor produces node handles on demand, declares whether its output is
//! document-ordered, and supports `clone_cursor` (an independent cursor at
//! the same position, for predicate re-entry) and `detach` (release cached
//! state). Cursors are single-pass: once exhausted or detached they stay
//! exhausted; re-reading requires a clone taken earlier.

use std::collections::HashSet;
use std::sync::Arc;

use sylva_tree::TreeNode;

use crate::ast::{ExprArena, ExprId};
use crate::context::EvalContext;
use crate::error::EngineError;
use crate::eval::evaluate;
use crate::types::Item;

pub trait NodeCursor<'a, N: TreeNode<'a>> {
    /// Advances the cursor. `None` means exhausted, permanently.
    fn next(&mut self, ctx: &mut EvalContext<'_, N>) -> Result<Option<N>, EngineError>;

    /// Whether consumers may rely on document order (deduplicated, sorted by
    /// the tree's intrinsic order).
    fn is_document_order(&self) -> bool;

    /// An independent cursor over the same nodes, at the same position.
    fn clone_cursor(&self) -> Box<dyn NodeCursor<'a, N> + 'a>;

    /// Releases cached state. The cursor reports exhaustion afterwards.
    fn detach(&mut self);
}

/// A cursor over an already-computed node list.
#[derive(Debug, Clone)]
pub struct MaterializedCursor<N> {
    nodes: Vec<N>,
    pos: usize,
    ordered: bool,
}

impl<'a, N: TreeNode<'a>> MaterializedCursor<N> {
    pub fn new(nodes: Vec<N>, ordered: bool) -> Self {
        Self {
            nodes,
            pos: 0,
            ordered,
        }
    }

    /// Dedups and sorts the nodes into document order first.
    pub fn document_ordered(mut nodes: Vec<N>) -> Self {
        nodes.sort();
        nodes.dedup();
        Self::new(nodes, true)
    }
}

impl<'a, N: TreeNode<'a> + 'a> NodeCursor<'a, N> for MaterializedCursor<N> {
    fn next(&mut self, _ctx: &mut EvalContext<'_, N>) -> Result<Option<N>, EngineError> {
        let node = self.nodes.get(self.pos).copied();
        if node.is_some() {
            self.pos += 1;
        }
        Ok(node)
    }

    fn is_document_order(&self) -> bool {
        self.ordered
    }

    fn clone_cursor(&self) -> Box<dyn NodeCursor<'a, N> + 'a> {
        Box::new(self.clone())
    }

    fn detach(&mut self) {
        self.nodes.clear();
        self.pos = 0;
    }
}

/// Wraps a sub-expression whose evaluation yields a node-bearing value.
///
/// The sub-evaluation happens out of band relative to cursor advancement: by
/// the time `next` is first called, an arbitrary number of variable frames
/// may sit above the frame that lexically encloses the filter expression.
/// The cursor therefore records that frame pointer at construction and
/// rewinds the variable stack around the one-shot evaluation, so global and
/// local references inside the filter resolve against the right frame.
pub struct FilterCursor<N> {
    arena: Arc<ExprArena>,
    expr: ExprId,
    home_frame: usize,
    ordered: bool,
    cached: Option<Vec<N>>,
    pos: usize,
    detached: bool,
}

impl<'a, N: TreeNode<'a> + 'a> FilterCursor<N> {
    pub fn new(arena: Arc<ExprArena>, expr: ExprId, home_frame: usize, ordered: bool) -> Self {
        Self {
            arena,
            expr,
            home_frame,
            ordered,
            cached: None,
            pos: 0,
            detached: false,
        }
    }

    fn materialize(&mut self, ctx: &mut EvalContext<'_, N>) -> Result<(), EngineError> {
        let prev = ctx.vars().rewind(self.home_frame);
        let result = evaluate(&self.arena, self.expr, ctx);
        ctx.vars().rewind(prev);
        let value = result?;

        let mut nodes = Vec::with_capacity(value.len());
        for item in value.items() {
            match item {
                Item::Node(n) => nodes.push(*n),
                other => {
                    return Err(EngineError::type_error(
                        "a node sequence",
                        other.type_name(),
                    ));
                }
            }
        }
        self.cached = Some(nodes);
        Ok(())
    }
}

impl<N: Clone> Clone for FilterCursor<N> {
    fn clone(&self) -> Self {
        Self {
            arena: Arc::clone(&self.arena),
            expr: self.expr,
            home_frame: self.home_frame,
            ordered: self.ordered,
            cached: self.cached.clone(),
            pos: self.pos,
            detached: self.detached,
        }
    }
}

impl<'a, N: TreeNode<'a> + 'a> NodeCursor<'a, N> for FilterCursor<N> {
    fn next(&mut self, ctx: &mut EvalContext<'_, N>) -> Result<Option<N>, EngineError> {
        if self.detached {
            return Ok(None);
        }
        if self.cached.is_none() {
            self.materialize(ctx)?;
        }
        let nodes = self.cached.as_ref().expect("materialized above");
        let node = nodes.get(self.pos).copied();
        if node.is_some() {
            self.pos += 1;
        }
        Ok(node)
    }

    fn is_document_order(&self) -> bool {
        self.ordered
    }

    fn clone_cursor(&self) -> Box<dyn NodeCursor<'a, N> + 'a> {
        Box::new(self.clone())
    }

    fn detach(&mut self) {
        self.cached = None;
        self.detached = true;
    }
}

/// Pairwise left-to-right set intersection of node lists, by node identity.
/// The result is deduplicated and in document order regardless of the input
/// order. An empty source list yields an empty intersection.
pub fn intersect_node_lists<'a, N: TreeNode<'a>>(mut lists: Vec<Vec<N>>) -> Vec<N> {
    if lists.is_empty() {
        return Vec::new();
    }
    let mut acc = lists.remove(0);
    for list in lists {
        let keys: HashSet<N> = list.into_iter().collect();
        acc.retain(|n| keys.contains(n));
    }
    acc.sort();
    acc.dedup();
    acc
}

/// Intersects N source cursors. Sources are not assumed to be ordered or
/// deduplicated relative to each other, so every source is materialized in
/// full before the first node is produced; the trade is memory for a
/// correct document-order guarantee.
pub struct IntersectCursor<'a, N: TreeNode<'a>> {
    sources: Vec<Box<dyn NodeCursor<'a, N> + 'a>>,
    materialized: Option<Vec<N>>,
    pos: usize,
    detached: bool,
}

impl<'a, N: TreeNode<'a> + 'a> IntersectCursor<'a, N> {
    pub fn new(sources: Vec<Box<dyn NodeCursor<'a, N> + 'a>>) -> Self {
        Self {
            sources,
            materialized: None,
            pos: 0,
            detached: false,
        }
    }

    fn materialize(&mut self, ctx: &mut EvalContext<'_, N>) -> Result<(), EngineError> {
        let mut lists: Vec<Vec<N>> = Vec::with_capacity(self.sources.len());
        for source in &mut self.sources {
            let mut list = Vec::new();
            while let Some(node) = source.next(ctx)? {
                list.push(node);
            }
            list.sort();
            list.dedup();
            lists.push(list);
        }
        log::trace!(
            "intersect: materialized {} sources ({} nodes total)",
            lists.len(),
            lists.iter().map(Vec::len).sum::<usize>()
        );
        self.materialized = Some(intersect_node_lists(lists));
        Ok(())
    }
}

impl<'a, N: TreeNode<'a> + 'a> NodeCursor<'a, N> for IntersectCursor<'a, N> {
    fn next(&mut self, ctx: &mut EvalContext<'_, N>) -> Result<Option<N>, EngineError> {
        if self.detached {
            return Ok(None);
        }
        if self.materialized.is_none() {
            self.materialize(ctx)?;
        }
        let nodes = self.materialized.as_ref().expect("materialized above");
        let node = nodes.get(self.pos).copied();
        if node.is_some() {
            self.pos += 1;
        }
        Ok(node)
    }

    fn is_document_order(&self) -> bool {
        true
    }

    fn clone_cursor(&self) -> Box<dyn NodeCursor<'a, N> + 'a> {
        Box::new(IntersectCursor {
            sources: self.sources.iter().map(|s| s.clone_cursor()).collect(),
            materialized: self.materialized.clone(),
            pos: self.pos,
            detached: self.detached,
        })
    }

    fn detach(&mut self) {
        for source in &mut self.sources {
            source.detach();
        }
        self.materialized = None;
        self.detached = true;
    }
}

/// Drains a cursor into a node vector.
pub fn drain<'a, N: TreeNode<'a> + 'a>(
    cursor: &mut dyn NodeCursor<'a, N>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Vec<N>, EngineError> {
    let mut nodes = Vec::new();
    while let Some(node) = cursor.next(ctx)? {
        nodes.push(node);
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticContext;
    use sylva_tree::tests::{MockNode, build_tree};

    fn ctx_for<'s>(statics: &'s StaticContext) -> EvalContext<'s, MockNode<'static>> {
        EvalContext::new(statics, vec![])
    }

    #[test]
    fn materialized_cursor_is_single_pass() {
        let statics = StaticContext::new();
        let mut ctx = ctx_for(&statics);
        let tree = Box::leak(Box::new(build_tree()));

        let mut cursor = MaterializedCursor::new(vec![tree.node(1), tree.node(4)], false);
        assert_eq!(cursor.next(&mut ctx).unwrap(), Some(tree.node(1)));

        let mut resumed = cursor.clone_cursor();
        assert_eq!(cursor.next(&mut ctx).unwrap(), Some(tree.node(4)));
        assert_eq!(cursor.next(&mut ctx).unwrap(), None);
        assert_eq!(cursor.next(&mut ctx).unwrap(), None);

        // The clone picked up at the position it was taken.
        assert_eq!(resumed.next(&mut ctx).unwrap(), Some(tree.node(4)));
    }

    #[test]
    fn document_ordered_sorts_and_dedups() {
        let statics = StaticContext::new();
        let mut ctx = ctx_for(&statics);
        let tree = Box::leak(Box::new(build_tree()));

        let mut cursor = MaterializedCursor::document_ordered(vec![
            tree.node(8),
            tree.node(1),
            tree.node(8),
            tree.node(4),
        ]);
        assert!(cursor.is_document_order());
        let nodes = drain(&mut cursor, &mut ctx).unwrap();
        assert_eq!(
            nodes,
            vec![tree.node(1), tree.node(4), tree.node(8)]
        );
    }

    #[test]
    fn intersect_orders_and_dedups_independently_of_input() {
        let tree = build_tree();
        let a = vec![tree.node(8), tree.node(1), tree.node(4)];
        let b = vec![tree.node(4), tree.node(8), tree.node(7)];

        let ab = intersect_node_lists(vec![a.clone(), b.clone()]);
        let ba = intersect_node_lists(vec![b, a]);
        assert_eq!(ab, vec![tree.node(4), tree.node(8)]);
        assert_eq!(ab, ba);
    }

    #[test]
    fn intersect_cursor_streams_after_materializing() {
        let statics = StaticContext::new();
        let mut ctx = ctx_for(&statics);
        let tree = Box::leak(Box::new(build_tree()));

        let a = MaterializedCursor::new(vec![tree.node(8), tree.node(1)], false);
        let b = MaterializedCursor::new(vec![tree.node(1), tree.node(8), tree.node(7)], false);
        let mut cursor = IntersectCursor::new(vec![Box::new(a), Box::new(b)]);

        assert!(cursor.is_document_order());
        assert_eq!(cursor.next(&mut ctx).unwrap(), Some(tree.node(1)));
        assert_eq!(cursor.next(&mut ctx).unwrap(), Some(tree.node(8)));
        assert_eq!(cursor.next(&mut ctx).unwrap(), None);
    }

    #[test]
    fn detach_exhausts() {
        let statics = StaticContext::new();
        let mut ctx = ctx_for(&statics);
        let tree = Box::leak(Box::new(build_tree()));

        let a = MaterializedCursor::new(vec![tree.node(1)], false);
        let b = MaterializedCursor::new(vec![tree.node(1)], false);
        let mut cursor = IntersectCursor::new(vec![Box::new(a), Box::new(b)]);
        cursor.detach();
        assert_eq!(cursor.next(&mut ctx).unwrap(), None);
    }
}
