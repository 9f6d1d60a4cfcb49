//! The `array:` function namespace.

use std::sync::Arc;

use sylva_tree::TreeNode;

use super::{Arity, arg_array, arg_function, arg_integer, check_arity, invoke_function};
use crate::ast::ExprArena;
use crate::context::EvalContext;
use crate::error::EngineError;
use crate::types::{Value, ValueArray};

pub fn array_size<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("array:size", args.len(), Arity::Exact(1))?;
    let array = arg_array("array:size", 1, &args)?;
    Ok(Value::from_integer(array.size() as i64))
}

/// Partial: an index outside `[1, size]` is an error.
pub fn array_get<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("array:get", args.len(), Arity::Exact(2))?;
    let array = arg_array("array:get", 1, &args)?;
    let index = arg_integer("array:get", 2, &args)?;
    array.get(index).cloned()
}

pub fn array_put<'a, N: TreeNode<'a> + 'a>(
    mut args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("array:put", args.len(), Arity::Exact(3))?;
    let array = arg_array("array:put", 1, &args)?.clone();
    let index = arg_integer("array:put", 2, &args)?;
    let value = args.remove(2);
    Ok(Value::from_array(array.put(index, value)?))
}

pub fn array_append<'a, N: TreeNode<'a> + 'a>(
    mut args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("array:append", args.len(), Arity::Exact(2))?;
    let array = arg_array("array:append", 1, &args)?.clone();
    let value = args.remove(1);
    Ok(Value::from_array(array.append(value)))
}

pub fn array_subarray<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("array:subarray", args.len(), Arity::Range(2, 3))?;
    let array = arg_array("array:subarray", 1, &args)?;
    let start = arg_integer("array:subarray", 2, &args)?;
    let length = if args.len() == 3 {
        arg_integer("array:subarray", 3, &args)?.max(0) as usize
    } else {
        array.size()
    };
    Ok(Value::from_array(array.subarray(start, length)?))
}

pub fn array_remove<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("array:remove", args.len(), Arity::Exact(2))?;
    let array = arg_array("array:remove", 1, &args)?;
    let index = arg_integer("array:remove", 2, &args)?;
    Ok(Value::from_array(array.remove(index)?))
}

pub fn array_insert_before<'a, N: TreeNode<'a> + 'a>(
    mut args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("array:insert-before", args.len(), Arity::Exact(3))?;
    let array = arg_array("array:insert-before", 1, &args)?.clone();
    let index = arg_integer("array:insert-before", 2, &args)?;
    let value = args.remove(2);
    Ok(Value::from_array(array.insert_before(index, value)?))
}

pub fn array_head<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("array:head", args.len(), Arity::Exact(1))?;
    let array = arg_array("array:head", 1, &args)?;
    array.get(1).cloned()
}

pub fn array_tail<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("array:tail", args.len(), Arity::Exact(1))?;
    let array = arg_array("array:tail", 1, &args)?;
    // tail of [x] is [], but tail of [] is the same range error as get(1)
    array.get(1)?;
    Ok(Value::from_array(
        array.tail().unwrap_or_default(),
    ))
}

pub fn array_reverse<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("array:reverse", args.len(), Arity::Exact(1))?;
    let array = arg_array("array:reverse", 1, &args)?;
    Ok(Value::from_array(array.reverse()))
}

pub fn array_join<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("array:join", args.len(), Arity::Exact(1))?;
    let mut arrays = Vec::new();
    for (position, item) in args[0].items().iter().enumerate() {
        match item.as_array() {
            Some(array) => arrays.push(array.clone()),
            None => {
                return Err(EngineError::argument(
                    "array:join",
                    1,
                    "a sequence of arrays",
                    format!("{} at item {}", item.type_name(), position + 1),
                ));
            }
        }
    }
    Ok(Value::from_array(ValueArray::join(&arrays)))
}

pub fn array_flatten<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("array:flatten", args.len(), Arity::Exact(1))?;
    let mut items = Vec::new();
    for item in args[0].items() {
        match item.as_array() {
            Some(array) => items.extend(array.flatten()),
            None => items.push(item.clone()),
        }
    }
    Ok(Value::from_items(items))
}

pub fn array_for_each<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("array:for-each", args.len(), Arity::Exact(2))?;
    let array = arg_array("array:for-each", 1, &args)?.clone();
    let func = arg_function("array:for-each", 2, &args)?.clone();

    let mut members = Vec::with_capacity(array.size());
    for member in array.iter() {
        members.push(invoke_function(arena, &func, vec![member.clone()], ctx)?);
    }
    Ok(Value::from_array(ValueArray::from_members(members)))
}

pub fn array_filter<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("array:filter", args.len(), Arity::Exact(2))?;
    let array = arg_array("array:filter", 1, &args)?.clone();
    let func = arg_function("array:filter", 2, &args)?.clone();

    let mut members = Vec::new();
    for member in array.iter() {
        let verdict = invoke_function(arena, &func, vec![member.clone()], ctx)?;
        if verdict.effective_boolean_value()? {
            members.push(member.clone());
        }
    }
    Ok(Value::from_array(ValueArray::from_members(members)))
}

pub fn array_fold_left<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    mut args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("array:fold-left", args.len(), Arity::Exact(3))?;
    let array = arg_array("array:fold-left", 1, &args)?.clone();
    let func = arg_function("array:fold-left", 3, &args)?.clone();
    let zero = args.remove(1);

    let mut acc = zero;
    for member in array.iter() {
        acc = invoke_function(arena, &func, vec![acc, member.clone()], ctx)?;
    }
    Ok(acc)
}

/// Folds from the last member to the first: the supplied zero seeds the
/// accumulator at the rightmost position and the running result threads
/// leftward. Folding an empty array returns the zero unchanged.
pub fn array_fold_right<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    mut args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("array:fold-right", args.len(), Arity::Exact(3))?;
    let array = arg_array("array:fold-right", 1, &args)?.clone();
    let func = arg_function("array:fold-right", 3, &args)?.clone();
    let zero = args.remove(1);

    let mut acc = zero;
    for member in array.iter().rev() {
        acc = invoke_function(arena, &func, vec![member.clone(), acc], ctx)?;
    }
    Ok(acc)
}

/// Pairs two arrays positionally; members beyond the shorter array's length
/// are ignored.
pub fn array_for_each_pair<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("array:for-each-pair", args.len(), Arity::Exact(3))?;
    let arr1 = arg_array("array:for-each-pair", 1, &args)?.clone();
    let arr2 = arg_array("array:for-each-pair", 2, &args)?.clone();
    let func = arg_function("array:for-each-pair", 3, &args)?.clone();

    let len = arr1.size().min(arr2.size());
    let mut members = Vec::with_capacity(len);
    for i in 0..len {
        members.push(invoke_function(
            arena,
            &func,
            vec![arr1.members()[i].clone(), arr2.members()[i].clone()],
            ctx,
        )?);
    }
    Ok(Value::from_array(ValueArray::from_members(members)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, ExprKind, Param, VarSlot};
    use crate::context::StaticContext;
    use crate::error::ErrorKind;
    use crate::types::{AtomicValue, FunctionValue, Item};
    use sylva_tree::tests::MockNode;

    type V = Value<MockNode<'static>>;

    fn int_array(values: &[i64]) -> V {
        Value::from_array(ValueArray::from_members(
            values.iter().map(|i| Value::from_integer(*i)).collect(),
        ))
    }

    fn plus_closure() -> (Arc<ExprArena>, V) {
        let mut arena = ExprArena::new();
        let a = arena.push(ExprKind::VarRef {
            name: "a".to_string(),
            slot: Some(VarSlot::Local(0)),
        });
        let b = arena.push(ExprKind::VarRef {
            name: "b".to_string(),
            slot: Some(VarSlot::Local(1)),
        });
        let body = arena.push(ExprKind::Binary {
            op: BinaryOp::Add,
            left: a,
            right: b,
        });
        let arena = Arc::new(arena);
        let closure = FunctionValue::Closure {
            params: vec![Param::new("a"), Param::new("b")],
            body,
            frame_size: 2,
            captured: vec![],
            arena: Arc::clone(&arena),
        };
        (arena, Value::from_function(closure))
    }

    #[test]
    fn get_is_partial() {
        assert_eq!(
            array_get(vec![int_array(&[10, 20, 30]), V::from_integer(2)])
                .unwrap()
                .to_double(),
            20.0
        );
        for bad in [0i64, 4, -2] {
            let err =
                array_get(vec![int_array(&[10, 20, 30]), V::from_integer(bad)]).unwrap_err();
            assert!(matches!(err.kind, ErrorKind::IndexOutOfBounds { .. }));
        }
    }

    #[test]
    fn fold_right_identity() {
        let (arena, plus) = plus_closure();
        let statics = StaticContext::new();
        let mut ctx = EvalContext::new(&statics, vec![]);

        let result = array_fold_right(
            &arena,
            vec![int_array(&[]), V::from_integer(10), plus],
            &mut ctx,
        )
        .unwrap();
        assert_eq!(result.to_double(), 10.0);
    }

    #[test]
    fn fold_right_sums() {
        let (arena, plus) = plus_closure();
        let statics = StaticContext::new();
        let mut ctx = EvalContext::new(&statics, vec![]);

        let result = array_fold_right(
            &arena,
            vec![int_array(&[1, 2, 3]), V::from_integer(0), plus],
            &mut ctx,
        )
        .unwrap();
        assert_eq!(result.to_double(), 6.0);
    }

    #[test]
    fn for_each_pair_truncates_to_shorter() {
        let (arena, plus) = plus_closure();
        let statics = StaticContext::new();
        let mut ctx = EvalContext::new(&statics, vec![]);

        let result = array_for_each_pair(
            &arena,
            vec![int_array(&[1, 2, 3]), int_array(&[10, 20]), plus],
            &mut ctx,
        )
        .unwrap();

        let array = result.items()[0].as_array().expect("array result");
        assert_eq!(array.size(), 2);
        assert_eq!(array.get(1).unwrap().to_double(), 11.0);
        assert_eq!(array.get(2).unwrap().to_double(), 22.0);
    }

    #[test]
    fn flatten_mixes_arrays_and_items() {
        let input = Value::from_items(vec![
            Item::Atomic(AtomicValue::Integer(1)),
            Item::Array(ValueArray::from_members(vec![
                Value::from_integer(2),
                int_array(&[3, 4]),
            ])),
        ]);
        let result = array_flatten(vec![input]).unwrap();
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn join_concatenates() {
        let input = Value::from_values(vec![int_array(&[1, 2]), int_array(&[3])]);
        let result = array_join(vec![input]).unwrap();
        assert_eq!(result.items()[0].as_array().unwrap().size(), 3);
    }
}
