//! Defines the core abstraction for a navigable, read-only data tree.
use std::hash::Hash;

/// A qualified name, consisting of an optional prefix and a local part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QName<'a> {
    pub prefix: Option<&'a str>,
    pub local_part: &'a str,
}

/// The kind of a node in the tree, aligned with the XDM node taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// The typed value a tree may annotate a node with. Trees without type
/// annotations return `None` from [`TreeNode::typed_value`] and the engine
/// falls back to the node's string value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Double(f64),
}

/// The universal contract for a node handle into an externally-owned tree.
///
/// The evaluation engine is written exclusively against this trait; it never
/// parses or constructs tree data itself. A handle must be cheap to copy.
///
/// Two pieces of node identity are encoded in the supertraits:
/// - `Eq`/`Hash` compare node *identity* (two handles to the same node are
///   equal, handles to distinct nodes with equal content are not);
/// - `Ord` is the tree's intrinsic *document order*.
///
/// `'a` is the lifetime of the underlying tree storage.
pub trait TreeNode<'a>:
    std::fmt::Debug + Clone + Copy + PartialEq + Eq + Hash + PartialOrd + Ord
{
    /// The kind of the node (Element, Text, Attribute, etc.).
    fn node_type(&self) -> NodeType;

    /// The qualified name of the node. Returns `None` for node types that do
    /// not have names, such as text or root nodes. For a processing
    /// instruction, this is its target.
    fn name(&self) -> Option<QName<'a>>;

    /// The string value of the node.
    /// - For a text node, this is its content.
    /// - For an element, the concatenation of all descendant text content.
    /// - For an attribute, its value.
    /// - For a comment or processing instruction, its content.
    fn string_value(&self) -> String;

    /// The schema-typed value of the node, if the tree carries type
    /// annotations. The default is untyped.
    fn typed_value(&self) -> Option<ScalarValue> {
        None
    }

    /// An iterator over the attribute nodes of this node.
    /// Empty for non-element nodes.
    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// An iterator over the child nodes of this node, in document order.
    /// Empty for leaf nodes (like text or attributes).
    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// A reference to the parent node. Returns `None` for the root node or
    /// for attributes detached from an element.
    fn parent(&self) -> Option<Self>;

    /// The root of the tree this node belongs to.
    fn root(&self) -> Self {
        let mut current = *self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }
}

// Test utilities - publicly available for integration testing in downstream crates
pub mod tests {
    use super::*;
    use std::cmp::Ordering;
    use std::hash::Hasher;

    #[derive(Debug, Clone)]
    struct MockNodeData<'a> {
        node_type: NodeType,
        name: Option<QName<'a>>,
        value: String,
        typed: Option<ScalarValue>,
        children: Vec<usize>,
        attributes: Vec<usize>,
        parent: Option<usize>,
    }

    /// An in-memory tree whose node ids are assigned in document order, so
    /// that id comparison doubles as the document-order primitive.
    #[derive(Debug)]
    pub struct MockTree<'a> {
        nodes: Vec<MockNodeData<'a>>,
    }

    /// A handle into a [`MockTree`]. Copyable, identity is the node id.
    #[derive(Debug, Clone, Copy)]
    pub struct MockNode<'a> {
        pub id: usize,
        pub tree: &'a MockTree<'a>,
    }

    impl<'a> PartialEq for MockNode<'a> {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }
    impl<'a> Eq for MockNode<'a> {}

    impl<'a> PartialOrd for MockNode<'a> {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }
    impl<'a> Ord for MockNode<'a> {
        fn cmp(&self, other: &Self) -> Ordering {
            self.id.cmp(&other.id)
        }
    }

    impl<'a> Hash for MockNode<'a> {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }

    impl<'a> TreeNode<'a> for MockNode<'a> {
        fn node_type(&self) -> NodeType {
            self.tree.nodes[self.id].node_type
        }

        fn name(&self) -> Option<QName<'a>> {
            self.tree.nodes[self.id].name
        }

        fn string_value(&self) -> String {
            self.tree.nodes[self.id].value.clone()
        }

        fn typed_value(&self) -> Option<ScalarValue> {
            self.tree.nodes[self.id].typed.clone()
        }

        fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree;
            let ids = tree.nodes[self.id].attributes.clone();
            Box::new(ids.into_iter().map(move |id| MockNode { id, tree }))
        }

        fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree;
            let ids = tree.nodes[self.id].children.clone();
            Box::new(ids.into_iter().map(move |id| MockNode { id, tree }))
        }

        fn parent(&self) -> Option<Self> {
            self.tree.nodes[self.id].parent.map(|pid| MockNode {
                id: pid,
                tree: self.tree,
            })
        }
    }

    impl<'a> MockTree<'a> {
        pub fn node(&'a self, id: usize) -> MockNode<'a> {
            MockNode { id, tree: self }
        }

        pub fn root(&'a self) -> MockNode<'a> {
            self.node(0)
        }

        pub fn len(&self) -> usize {
            self.nodes.len()
        }

        pub fn is_empty(&self) -> bool {
            self.nodes.is_empty()
        }
    }

    /// Builds a small document for tests. Ids in document order:
    /// ```text
    /// <doc>                                <!-- 0 -->
    ///   <item n="1">alpha</item>           <!-- 1, attr 2, text 3 -->
    ///   <item n="2">beta</item>            <!-- 4, attr 5, text 6 -->
    ///   <note/>                            <!-- 7 -->
    ///   <item n="3" score="10">gamma</item><!-- 8, attrs 9&10, text 11 -->
    ///   <!-- trailing -->                  <!-- 12 -->
    /// </doc>
    /// ```
    pub fn build_tree<'a>() -> MockTree<'a> {
        let elem = |local: &'a str| {
            Some(QName {
                prefix: None,
                local_part: local,
            })
        };

        let nodes = vec![
            MockNodeData {
                node_type: NodeType::Root,
                name: None,
                value: "alphabetagamma".to_string(),
                typed: None,
                children: vec![1, 4, 7, 8, 12],
                attributes: vec![],
                parent: None,
            },
            MockNodeData {
                node_type: NodeType::Element,
                name: elem("item"),
                value: "alpha".to_string(),
                typed: None,
                children: vec![3],
                attributes: vec![2],
                parent: Some(0),
            },
            MockNodeData {
                node_type: NodeType::Attribute,
                name: elem("n"),
                value: "1".to_string(),
                typed: Some(ScalarValue::Integer(1)),
                children: vec![],
                attributes: vec![],
                parent: Some(1),
            },
            MockNodeData {
                node_type: NodeType::Text,
                name: None,
                value: "alpha".to_string(),
                typed: None,
                children: vec![],
                attributes: vec![],
                parent: Some(1),
            },
            MockNodeData {
                node_type: NodeType::Element,
                name: elem("item"),
                value: "beta".to_string(),
                typed: None,
                children: vec![6],
                attributes: vec![5],
                parent: Some(0),
            },
            MockNodeData {
                node_type: NodeType::Attribute,
                name: elem("n"),
                value: "2".to_string(),
                typed: Some(ScalarValue::Integer(2)),
                children: vec![],
                attributes: vec![],
                parent: Some(4),
            },
            MockNodeData {
                node_type: NodeType::Text,
                name: None,
                value: "beta".to_string(),
                typed: None,
                children: vec![],
                attributes: vec![],
                parent: Some(4),
            },
            MockNodeData {
                node_type: NodeType::Element,
                name: elem("note"),
                value: String::new(),
                typed: None,
                children: vec![],
                attributes: vec![],
                parent: Some(0),
            },
            MockNodeData {
                node_type: NodeType::Element,
                name: elem("item"),
                value: "gamma".to_string(),
                typed: None,
                children: vec![11],
                attributes: vec![9, 10],
                parent: Some(0),
            },
            MockNodeData {
                node_type: NodeType::Attribute,
                name: elem("n"),
                value: "3".to_string(),
                typed: Some(ScalarValue::Integer(3)),
                children: vec![],
                attributes: vec![],
                parent: Some(8),
            },
            MockNodeData {
                node_type: NodeType::Attribute,
                name: elem("score"),
                value: "10".to_string(),
                typed: Some(ScalarValue::Integer(10)),
                children: vec![],
                attributes: vec![],
                parent: Some(8),
            },
            MockNodeData {
                node_type: NodeType::Text,
                name: None,
                value: "gamma".to_string(),
                typed: None,
                children: vec![],
                attributes: vec![],
                parent: Some(8),
            },
            MockNodeData {
                node_type: NodeType::Comment,
                name: None,
                value: " trailing ".to_string(),
                typed: None,
                children: vec![],
                attributes: vec![],
                parent: Some(0),
            },
        ];

        MockTree { nodes }
    }

    #[test]
    fn identity_and_document_order() {
        let tree = build_tree();
        let a = tree.node(1);
        let b = tree.node(4);
        assert_ne!(a, b);
        assert_eq!(a, tree.node(1));
        assert!(a < b);
    }

    #[test]
    fn navigation() {
        let tree = build_tree();
        let root = tree.root();
        assert_eq!(root.node_type(), NodeType::Root);
        assert_eq!(root.children().count(), 5);

        let first = tree.node(1);
        assert_eq!(first.name().unwrap().local_part, "item");
        assert_eq!(first.parent(), Some(root));
        assert_eq!(first.attributes().count(), 1);
        assert_eq!(first.string_value(), "alpha");
        assert_eq!(tree.node(11).root(), root);
    }

    #[test]
    fn typed_values() {
        let tree = build_tree();
        assert_eq!(tree.node(2).typed_value(), Some(ScalarValue::Integer(1)));
        assert_eq!(tree.node(3).typed_value(), None);
    }
}
