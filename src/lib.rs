//! Umbrella crate for the Sylva expression engine.
//!
//! Most users depend on [`sylva_engine`] directly; this crate re-exports
//! the engine and the tree interface under one roof for embedders that want
//! a single dependency line.

pub use sylva_engine as engine;
pub use sylva_tree as tree;

pub use sylva_engine::{
    AtomicValue, Collation, CompiledExpression, EngineError, ErrorKind, ErrorListener,
    EvalContext, ExprArena, ExprId, ExprKind, FunctionValue, Item, NodeCursor, QName, Severity,
    SourceLocation, StaticContext, Value, ValueArray, ValueMap, evaluate_expression,
    evaluate_with_listener,
};
pub use sylva_tree::{Axis, NodeType, ScalarValue, TreeNode};

/// Installs the default `env_logger` backend for the `log` facade the
/// engine emits through. Safe to call more than once; later calls are
/// ignored.
pub fn init_logging() {
    if env_logger::try_init().is_ok() {
        log::debug!("sylva logging initialised");
    }
}

