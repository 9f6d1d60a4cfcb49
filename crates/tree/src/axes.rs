//! Pure functions for collecting nodes along each navigation axis.

use crate::node::TreeNode;
use std::collections::HashSet;

/// The navigation axes supported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Child,
    Parent,
    SelfAxis,
    Descendant,
    DescendantOrSelf,
    Ancestor,
    AncestorOrSelf,
    Attribute,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
}

impl Axis {
    /// Collects every node reachable from `node` along this axis, skipping
    /// nodes already present in `seen`.
    pub fn collect<'a, N: TreeNode<'a>>(
        &self,
        node: N,
        seen: &mut HashSet<N>,
        results: &mut Vec<N>,
    ) {
        match self {
            Axis::Child => collect_child_nodes(node, seen, results),
            Axis::Parent => collect_parent_nodes(node, seen, results),
            Axis::SelfAxis => collect_self_nodes(node, seen, results),
            Axis::Descendant => collect_descendant_nodes(node, seen, results),
            Axis::DescendantOrSelf => collect_descendant_or_self_nodes(node, seen, results),
            Axis::Ancestor => collect_ancestor_nodes(node, seen, results),
            Axis::AncestorOrSelf => {
                collect_self_nodes(node, seen, results);
                collect_ancestor_nodes(node, seen, results);
            }
            Axis::Attribute => collect_attribute_nodes(node, seen, results),
            Axis::FollowingSibling => collect_following_sibling_nodes(node, seen, results),
            Axis::PrecedingSibling => collect_preceding_sibling_nodes(node, seen, results),
            Axis::Following => collect_following_nodes(node, seen, results),
            Axis::Preceding => collect_preceding_nodes(node, seen, results),
        }
    }
}

fn add_node<'a, N: TreeNode<'a>>(node: N, seen: &mut HashSet<N>, results: &mut Vec<N>) {
    if seen.insert(node) {
        results.push(node);
    }
}

pub fn collect_self_nodes<'a, N: TreeNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    add_node(node, seen, results);
}

pub fn collect_child_nodes<'a, N: TreeNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    for child in node.children() {
        add_node(child, seen, results);
    }
}

pub fn collect_attribute_nodes<'a, N: TreeNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    for attr in node.attributes() {
        add_node(attr, seen, results);
    }
}

pub fn collect_descendant_nodes<'a, N: TreeNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    for child in node.children() {
        add_node(child, seen, results);
        collect_descendant_nodes(child, seen, results);
    }
}

pub fn collect_descendant_or_self_nodes<'a, N: TreeNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    add_node(node, seen, results);
    collect_descendant_nodes(node, seen, results);
}

pub fn collect_parent_nodes<'a, N: TreeNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    if let Some(parent) = node.parent() {
        add_node(parent, seen, results);
    }
}

pub fn collect_ancestor_nodes<'a, N: TreeNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    let mut current = node.parent();
    while let Some(p) = current {
        add_node(p, seen, results);
        current = p.parent();
    }
}

pub fn collect_following_sibling_nodes<'a, N: TreeNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    if let Some(parent) = node.parent() {
        let mut found_self = false;
        for sibling in parent.children() {
            if found_self {
                add_node(sibling, seen, results);
            }
            if sibling == node {
                found_self = true;
            }
        }
    }
}

pub fn collect_preceding_sibling_nodes<'a, N: TreeNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    if let Some(parent) = node.parent() {
        for sibling in parent.children() {
            if sibling == node {
                break;
            }
            add_node(sibling, seen, results);
        }
    }
}

pub fn collect_following_nodes<'a, N: TreeNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    let mut current = node;
    loop {
        if let Some(parent) = current.parent() {
            let mut found_self = false;
            for sibling in parent.children() {
                if found_self {
                    collect_descendant_or_self_nodes(sibling, seen, results);
                }
                if sibling == current {
                    found_self = true;
                }
            }
            current = parent;
        } else {
            break;
        }
    }
}

pub fn collect_preceding_nodes<'a, N: TreeNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    let mut current = node;
    loop {
        if let Some(parent) = current.parent() {
            let mut before: Vec<N> = Vec::new();
            for sibling in parent.children() {
                if sibling == current {
                    break;
                }
                before.push(sibling);
            }
            for sibling in before.into_iter().rev() {
                collect_descendant_or_self_nodes(sibling, seen, results);
            }
            current = parent;
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::tests::build_tree;

    fn ids<'a>(nodes: &[crate::node::tests::MockNode<'a>]) -> Vec<usize> {
        nodes.iter().map(|n| n.id).collect()
    }

    fn collect_ids(axis: Axis, from: usize) -> Vec<usize> {
        let tree = build_tree();
        let mut seen = HashSet::new();
        let mut results = Vec::new();
        axis.collect(tree.node(from), &mut seen, &mut results);
        ids(&results)
    }

    #[test]
    fn child_axis() {
        assert_eq!(collect_ids(Axis::Child, 0), vec![1, 4, 7, 8, 12]);
        assert_eq!(collect_ids(Axis::Child, 7), Vec::<usize>::new());
    }

    #[test]
    fn descendant_axis() {
        assert_eq!(
            collect_ids(Axis::Descendant, 0),
            vec![1, 3, 4, 6, 7, 8, 11, 12]
        );
        assert_eq!(collect_ids(Axis::DescendantOrSelf, 8), vec![8, 11]);
    }

    #[test]
    fn ancestor_axis() {
        assert_eq!(collect_ids(Axis::Ancestor, 11), vec![8, 0]);
        assert_eq!(collect_ids(Axis::AncestorOrSelf, 11), vec![11, 8, 0]);
    }

    #[test]
    fn sibling_axes() {
        assert_eq!(collect_ids(Axis::FollowingSibling, 4), vec![7, 8, 12]);
        assert_eq!(collect_ids(Axis::PrecedingSibling, 8), vec![1, 4, 7]);
    }

    #[test]
    fn following_and_preceding() {
        assert_eq!(collect_ids(Axis::Following, 4), vec![7, 8, 11, 12]);
        assert_eq!(collect_ids(Axis::Preceding, 7), vec![4, 6, 1, 3]);
    }

    #[test]
    fn attribute_axis() {
        assert_eq!(collect_ids(Axis::Attribute, 8), vec![9, 10]);
        assert_eq!(collect_ids(Axis::Attribute, 3), Vec::<usize>::new());
    }
}
