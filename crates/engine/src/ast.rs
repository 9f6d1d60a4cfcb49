//! The compiled expression tree.
//!
//! Nodes live in an [`ExprArena`] and reference each other by [`ExprId`], so
//! a visitor can swap a subtree by updating the parent's child slot without
//! back-pointers and without touching subtrees that may be shared.

use std::fmt;

use sylva_tree::Axis;

use crate::error::SourceLocation;
use crate::types::AtomicValue;

/// An owned qualified name for functions and variables in the tree. Distinct
/// from `sylva_tree::QName`, which borrows from tree storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
        }
    }

    pub fn prefixed(prefix: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            local: local.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "{}:{}", p, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// A declared parameter of an inline function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Index of a node in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u32);

impl ExprId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Where a resolved variable reference reads from: an absolute index into
/// the fixed global range, or an offset above the current frame pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarSlot {
    Global(u32),
    Local(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Subtract,
    Multiply,
    Divide,
    IntegerDivide,
    Modulo,
    Range,
    StringConcat,
    Union,
    Intersect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Some,
    Every,
}

/// One `let`/`for`/quantifier binding. `slot` is assigned by fixup.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub value: ExprId,
    pub slot: Option<u32>,
}

impl Binding {
    pub fn new(name: impl Into<String>, value: ExprId) -> Self {
        Self {
            name: name.into(),
            value,
            slot: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupKey {
    Name(String),
    Integer(i64),
    Expr(ExprId),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindTest {
    AnyNode,
    Text,
    Comment,
    ProcessingInstruction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    Wildcard,
    Name(String),
    Kind(KindTest),
}

/// A step's axis plus node test.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStep {
    pub axis: Axis,
    pub test: NodeTest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStart {
    /// Climb to the tree root of the context node first.
    Root,
    /// Start from the context node itself.
    ContextNode,
}

/// A captured outer binding of an inline function: where the value is read
/// from at closure-creation time, and the frame slot it occupies when the
/// closure is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture {
    pub inner_slot: u32,
    pub source: VarSlot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(AtomicValue),
    ContextItem,
    VarRef {
        name: String,
        slot: Option<VarSlot>,
    },
    Let {
        bindings: Vec<Binding>,
        body: ExprId,
    },
    For {
        bindings: Vec<Binding>,
        body: ExprId,
    },
    Quantified {
        quantifier: Quantifier,
        bindings: Vec<Binding>,
        satisfies: ExprId,
    },
    If {
        condition: ExprId,
        then_branch: ExprId,
        else_branch: ExprId,
    },
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    SequenceCtor(Vec<ExprId>),
    MapCtor(Vec<(ExprId, ExprId)>),
    /// `[e1, e2, ...]`: one member per expression.
    ArrayCtor(Vec<ExprId>),
    /// `array { e }`: one member per item of the evaluated sequence.
    ArraySeqCtor(ExprId),
    Lookup {
        base: ExprId,
        key: LookupKey,
    },
    Call {
        name: QName,
        args: Vec<ExprId>,
    },
    DynamicCall {
        callee: ExprId,
        args: Vec<ExprId>,
    },
    NamedFunctionRef {
        name: QName,
        arity: usize,
    },
    InlineFunction {
        params: Vec<Param>,
        body: ExprId,
        /// Filled by fixup: outer bindings the body reads.
        captures: Vec<Capture>,
        /// Filled by fixup: slot count of the invocation frame.
        frame_size: u32,
    },
    Path {
        start: PathStart,
        steps: Vec<PathStep>,
    },
    Filter {
        base: ExprId,
        predicates: Vec<ExprId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: SourceLocation,
}

/// Owns every node of one compiled expression tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExprArena {
    nodes: Vec<Expr>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: ExprKind, loc: SourceLocation) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(Expr { kind, loc });
        id
    }

    /// Adds a node without a source location; convenient for synthesized
    /// subtrees and tests.
    pub fn push(&mut self, kind: ExprKind) -> ExprId {
        self.add(kind, SourceLocation::default())
    }

    pub fn node(&self, id: ExprId) -> &Expr {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The direct children of a node, in evaluation order.
    pub fn child_ids(&self, id: ExprId) -> Vec<ExprId> {
        match &self.node(id).kind {
            ExprKind::Literal(_)
            | ExprKind::ContextItem
            | ExprKind::VarRef { .. }
            | ExprKind::NamedFunctionRef { .. }
            | ExprKind::Path { .. } => vec![],
            ExprKind::Let { bindings, body }
            | ExprKind::For { bindings, body } => {
                let mut ids: Vec<ExprId> = bindings.iter().map(|b| b.value).collect();
                ids.push(*body);
                ids
            }
            ExprKind::Quantified { bindings, satisfies, .. } => {
                let mut ids: Vec<ExprId> = bindings.iter().map(|b| b.value).collect();
                ids.push(*satisfies);
                ids
            }
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => vec![*condition, *then_branch, *else_branch],
            ExprKind::Binary { left, right, .. } => vec![*left, *right],
            ExprKind::Unary { operand, .. } => vec![*operand],
            ExprKind::SequenceCtor(ids) | ExprKind::ArrayCtor(ids) => ids.clone(),
            ExprKind::MapCtor(entries) => entries
                .iter()
                .flat_map(|(k, v)| [*k, *v])
                .collect(),
            ExprKind::ArraySeqCtor(id) => vec![*id],
            ExprKind::Lookup { base, key } => {
                let mut ids = vec![*base];
                if let LookupKey::Expr(k) = key {
                    ids.push(*k);
                }
                ids
            }
            ExprKind::Call { args, .. } => args.clone(),
            ExprKind::DynamicCall { callee, args } => {
                let mut ids = vec![*callee];
                ids.extend(args.iter().copied());
                ids
            }
            ExprKind::InlineFunction { body, .. } => vec![*body],
            ExprKind::Filter { base, predicates } => {
                let mut ids = vec![*base];
                ids.extend(predicates.iter().copied());
                ids
            }
        }
    }

    /// Replaces every occurrence of `old` among the direct children of
    /// `parent` with `new`. Used by the visitor machinery: the parent owns
    /// the substitution, the child node itself is never rewritten in place.
    pub fn replace_child(&mut self, parent: ExprId, old: ExprId, new: ExprId) {
        let swap = |id: &mut ExprId| {
            if *id == old {
                *id = new;
            }
        };
        match &mut self.node_mut(parent).kind {
            ExprKind::Literal(_)
            | ExprKind::ContextItem
            | ExprKind::VarRef { .. }
            | ExprKind::NamedFunctionRef { .. }
            | ExprKind::Path { .. } => {}
            ExprKind::Let { bindings, body } | ExprKind::For { bindings, body } => {
                for b in bindings {
                    swap(&mut b.value);
                }
                swap(body);
            }
            ExprKind::Quantified { bindings, satisfies, .. } => {
                for b in bindings {
                    swap(&mut b.value);
                }
                swap(satisfies);
            }
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                swap(condition);
                swap(then_branch);
                swap(else_branch);
            }
            ExprKind::Binary { left, right, .. } => {
                swap(left);
                swap(right);
            }
            ExprKind::Unary { operand, .. } => swap(operand),
            ExprKind::SequenceCtor(ids) | ExprKind::ArrayCtor(ids) => {
                ids.iter_mut().for_each(swap);
            }
            ExprKind::MapCtor(entries) => {
                for (k, v) in entries {
                    swap(k);
                    swap(v);
                }
            }
            ExprKind::ArraySeqCtor(id) => swap(id),
            ExprKind::Lookup { base, key } => {
                swap(base);
                if let LookupKey::Expr(k) = key {
                    swap(k);
                }
            }
            ExprKind::Call { args, .. } => args.iter_mut().for_each(swap),
            ExprKind::DynamicCall { callee, args } => {
                swap(callee);
                args.iter_mut().for_each(swap);
            }
            ExprKind::InlineFunction { body, .. } => swap(body),
            ExprKind::Filter { base, predicates } => {
                swap(base);
                predicates.iter_mut().for_each(swap);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_allocation() {
        let mut arena = ExprArena::new();
        let one = arena.push(ExprKind::Literal(AtomicValue::Integer(1)));
        let two = arena.push(ExprKind::Literal(AtomicValue::Integer(2)));
        let sum = arena.push(ExprKind::Binary {
            op: BinaryOp::Add,
            left: one,
            right: two,
        });

        assert_eq!(arena.len(), 3);
        assert_eq!(arena.child_ids(sum), vec![one, two]);
        assert!(arena.child_ids(one).is_empty());
    }

    #[test]
    fn replace_child_updates_only_the_owner_slot() {
        let mut arena = ExprArena::new();
        let shared = arena.push(ExprKind::Literal(AtomicValue::Integer(1)));
        let a = arena.push(ExprKind::Unary {
            op: UnaryOp::Minus,
            operand: shared,
        });
        let b = arena.push(ExprKind::Unary {
            op: UnaryOp::Plus,
            operand: shared,
        });

        let replacement = arena.push(ExprKind::Literal(AtomicValue::Integer(9)));
        arena.replace_child(a, shared, replacement);

        assert_eq!(arena.child_ids(a), vec![replacement]);
        // The sibling still points at the shared subtree, untouched.
        assert_eq!(arena.child_ids(b), vec![shared]);
    }
}
