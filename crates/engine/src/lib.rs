//! XDM expression evaluation engine.
//!
//! Evaluates pre-compiled expression trees over a hierarchical data model:
//! atomic scalars, tree-node references, flattened sequences, maps, arrays
//! and function items. The tree itself is external; the engine navigates it
//! through the [`sylva_tree::TreeNode`] trait.
//!
//! # Key Types
//!
//! - [`ExprArena`] / [`CompiledExpression`]: the expression tree an external
//!   compiler builds, fixed up for slot-based variable resolution
//! - [`Value`]: an evaluation result (nodes, atomics, maps, arrays,
//!   functions)
//! - [`EvalContext`]: per-evaluation state (variable frames, scopes,
//!   collation, error listener)
//!
//! # Example
//!
//! ```ignore
//! use sylva_engine::{CompiledExpression, EvalContext, StaticContext, evaluate_expression};
//!
//! let compiled = CompiledExpression::prepare(arena, root, statics.globals())?;
//! let mut ctx = EvalContext::new(&statics, global_values);
//! let result = evaluate_expression(&compiled, &mut ctx)?;
//! ```

pub mod ast;
pub mod collation;
pub mod context;
pub mod cursor;
pub mod error;
pub mod eval;
pub mod fixup;
pub mod functions;
pub mod ops;
pub mod types;
pub mod visit;

pub use ast::{ExprArena, ExprId, ExprKind, QName, VarSlot};
pub use collation::Collation;
pub use context::{
    EvalContext, NamespaceResolver, SchemaType, SchemaTypeResolver, SimpleNamespaces,
    StaticContext, VarStack,
};
pub use cursor::{FilterCursor, IntersectCursor, MaterializedCursor, NodeCursor};
pub use error::{EngineError, ErrorKind, ErrorListener, Reaction, Severity, SourceLocation};
pub use eval::{evaluate, evaluate_expression, evaluate_with_listener, iterate};
pub use fixup::{CompiledExpression, resolve_variables};
pub use types::{AtomicValue, FunctionValue, Item, Value, ValueArray, ValueMap};
pub use visit::{ExprVisitor, rewrite};

pub use sylva_tree::{Axis, NodeType, ScalarValue, TreeNode};
