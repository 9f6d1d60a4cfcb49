//! Higher-order combinators over sequences, and the function-item
//! invocation protocol they share with dynamic calls.

use std::sync::Arc;

use sylva_tree::TreeNode;

use super::{Arity, arg_array, arg_function, check_arity};
use crate::ast::ExprArena;
use crate::context::EvalContext;
use crate::error::{EngineError, ErrorKind};
use crate::eval::evaluate;
use crate::types::{FunctionValue, Value};

/// Invokes a function item. Arity is checked before any binding happens;
/// a closure body runs in a fresh frame that is discarded on every exit
/// path, so no binding leaks into a later call.
pub fn invoke_function<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    func: &FunctionValue<N>,
    args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    if args.len() != func.arity() {
        return Err(EngineError::new(ErrorKind::FunctionArity {
            expected: func.arity(),
            actual: args.len(),
        }));
    }
    match func {
        FunctionValue::Named { name, .. } => super::call_function(arena, name, args, ctx),
        FunctionValue::Closure {
            body,
            frame_size,
            captured,
            arena: closure_arena,
            ..
        } => ctx.with_frame(*frame_size, |ctx| {
            for (offset, arg) in args.into_iter().enumerate() {
                ctx.vars().set_local(offset as u32, arg);
            }
            for (slot, value) in captured {
                ctx.vars().set_local(*slot, value.clone());
            }
            evaluate(closure_arena, *body, ctx)
        }),
    }
}

pub fn fn_for_each<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    mut args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:for-each", args.len(), Arity::Exact(2))?;
    let func = arg_function("fn:for-each", 2, &args)?.clone();
    let seq = args.remove(0);

    let mut results = Vec::new();
    for item in seq.into_items() {
        let mapped = invoke_function(arena, &func, vec![Value::from_item(item)], ctx)?;
        results.extend(mapped.into_items());
    }
    Ok(Value::from_items(results))
}

pub fn fn_filter<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    mut args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:filter", args.len(), Arity::Exact(2))?;
    let func = arg_function("fn:filter", 2, &args)?.clone();
    let seq = args.remove(0);

    let mut results = Vec::new();
    for item in seq.into_items() {
        let verdict =
            invoke_function(arena, &func, vec![Value::from_item(item.clone())], ctx)?;
        if verdict.effective_boolean_value()? {
            results.push(item);
        }
    }
    Ok(Value::from_items(results))
}

pub fn fn_fold_left<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    mut args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:fold-left", args.len(), Arity::Exact(3))?;
    let func = arg_function("fn:fold-left", 3, &args)?.clone();
    let zero = args.remove(1);
    let seq = args.remove(0);

    let mut acc = zero;
    for item in seq.into_items() {
        acc = invoke_function(arena, &func, vec![acc, Value::from_item(item)], ctx)?;
    }
    Ok(acc)
}

pub fn fn_fold_right<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    mut args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:fold-right", args.len(), Arity::Exact(3))?;
    let func = arg_function("fn:fold-right", 3, &args)?.clone();
    let zero = args.remove(1);
    let seq = args.remove(0);

    let mut acc = zero;
    for item in seq.into_items().into_iter().rev() {
        acc = invoke_function(arena, &func, vec![Value::from_item(item), acc], ctx)?;
    }
    Ok(acc)
}

pub fn fn_for_each_pair<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    mut args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:for-each-pair", args.len(), Arity::Exact(3))?;
    let func = arg_function("fn:for-each-pair", 3, &args)?.clone();
    let seq2 = args.remove(1);
    let seq1 = args.remove(0);

    let items1 = seq1.items();
    let items2 = seq2.items();
    let len = items1.len().min(items2.len());

    let mut results = Vec::new();
    for i in 0..len {
        let mapped = invoke_function(
            arena,
            &func,
            vec![
                Value::from_item(items1[i].clone()),
                Value::from_item(items2[i].clone()),
            ],
            ctx,
        )?;
        results.extend(mapped.into_items());
    }
    Ok(Value::from_items(results))
}

pub fn fn_apply<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:apply", args.len(), Arity::Exact(2))?;
    let func = arg_function("fn:apply", 1, &args)?.clone();
    let array = arg_array("fn:apply", 2, &args)?;

    let call_args: Vec<Value<N>> = array.members().to_vec();
    invoke_function(arena, &func, call_args, ctx)
}

pub fn fn_function_arity<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:function-arity", args.len(), Arity::Exact(1))?;
    let func = arg_function("fn:function-arity", 1, &args)?;
    Ok(Value::from_integer(func.arity() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, Param, VarSlot};
    use crate::types::Item;
    use crate::context::StaticContext;
    use crate::types::AtomicValue;
    use sylva_tree::tests::MockNode;

    type V = Value<MockNode<'static>>;

    /// Builds `function($acc, $x) { $acc + $x }` the way fixup would leave
    /// it: parameters at local slots 0 and 1, no captures.
    fn plus_closure() -> (Arc<ExprArena>, FunctionValue<MockNode<'static>>) {
        let mut arena = ExprArena::new();
        let acc = arena.push(ExprKind::VarRef {
            name: "acc".to_string(),
            slot: Some(VarSlot::Local(0)),
        });
        let x = arena.push(ExprKind::VarRef {
            name: "x".to_string(),
            slot: Some(VarSlot::Local(1)),
        });
        let body = arena.push(ExprKind::Binary {
            op: crate::ast::BinaryOp::Add,
            left: acc,
            right: x,
        });
        let arena = Arc::new(arena);
        let closure = FunctionValue::Closure {
            params: vec![Param::new("acc"), Param::new("x")],
            body,
            frame_size: 2,
            captured: vec![],
            arena: Arc::clone(&arena),
        };
        (arena, closure)
    }

    fn int_seq(values: &[i64]) -> V {
        Value::from_items(
            values
                .iter()
                .map(|i| Item::Atomic(AtomicValue::Integer(*i)))
                .collect(),
        )
    }

    #[test]
    fn fold_left_sums() {
        let statics = StaticContext::new();
        let mut ctx = EvalContext::new(&statics, vec![]);
        let (arena, closure) = plus_closure();

        let result = fn_fold_left(
            &arena,
            vec![int_seq(&[1, 2, 3]), V::from_integer(0), V::from_function(closure)],
            &mut ctx,
        )
        .unwrap();
        assert_eq!(result.to_double(), 6.0);
    }

    #[test]
    fn fold_right_seeds_at_the_right() {
        let statics = StaticContext::new();
        let mut ctx = EvalContext::new(&statics, vec![]);
        let (arena, closure) = plus_closure();

        // Folding an empty sequence returns the seed untouched.
        let result = fn_fold_right(
            &arena,
            vec![V::empty(), V::from_integer(10), V::from_function(closure.clone())],
            &mut ctx,
        )
        .unwrap();
        assert_eq!(result.to_double(), 10.0);

        let result = fn_fold_right(
            &arena,
            vec![int_seq(&[1, 2, 3]), V::from_integer(0), V::from_function(closure)],
            &mut ctx,
        )
        .unwrap();
        assert_eq!(result.to_double(), 6.0);
    }

    #[test]
    fn arity_is_checked_before_binding() {
        let statics = StaticContext::new();
        let mut ctx = EvalContext::new(&statics, vec![]);
        let (arena, closure) = plus_closure();

        let err =
            invoke_function(&arena, &closure, vec![V::from_integer(1)], &mut ctx).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::FunctionArity {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn non_function_argument_names_its_position() {
        let statics = StaticContext::new();
        let mut ctx = EvalContext::new(&statics, vec![]);
        let arena = Arc::new(ExprArena::new());

        let err = fn_filter(&arena, vec![int_seq(&[1]), V::from_integer(5)], &mut ctx)
            .unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::InvalidArgument { position: 2, .. }
        ));
    }
}
