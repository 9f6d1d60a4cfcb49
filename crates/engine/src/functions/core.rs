//! Boolean, sequence, string and numeric basics of the default function
//! namespace.

use std::collections::HashSet;

use sylva_tree::TreeNode;

use super::{Arity, arg_string, check_arity};
use crate::collation::Collation;
use crate::context::EvalContext;
use crate::error::EngineError;
use crate::ops;
use crate::types::{AtomicValue, Item, Value};

pub fn fn_true<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("fn:true", args.len(), Arity::Exact(0))?;
    Ok(Value::from_bool(true))
}

pub fn fn_false<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("fn:false", args.len(), Arity::Exact(0))?;
    Ok(Value::from_bool(false))
}

pub fn fn_not<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("fn:not", args.len(), Arity::Exact(1))?;
    Ok(Value::from_bool(!args[0].effective_boolean_value()?))
}

pub fn fn_boolean<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("fn:boolean", args.len(), Arity::Exact(1))?;
    Ok(Value::from_bool(args[0].effective_boolean_value()?))
}

pub fn fn_count<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("fn:count", args.len(), Arity::Exact(1))?;
    Ok(Value::from_integer(args[0].len() as i64))
}

pub fn fn_empty<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("fn:empty", args.len(), Arity::Exact(1))?;
    Ok(Value::from_bool(args[0].is_empty()))
}

pub fn fn_exists<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("fn:exists", args.len(), Arity::Exact(1))?;
    Ok(Value::from_bool(!args[0].is_empty()))
}

pub fn fn_head<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("fn:head", args.len(), Arity::Exact(1))?;
    Ok(match args[0].first() {
        Some(item) => Value::from_item(item.clone()),
        None => Value::empty(),
    })
}

pub fn fn_tail<'a, N: TreeNode<'a> + 'a>(mut args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("fn:tail", args.len(), Arity::Exact(1))?;
    let mut items = args.remove(0).into_items();
    if items.is_empty() {
        return Ok(Value::empty());
    }
    items.remove(0);
    Ok(Value::from_items(items))
}

pub fn fn_reverse<'a, N: TreeNode<'a> + 'a>(
    mut args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:reverse", args.len(), Arity::Exact(1))?;
    let mut items = args.remove(0).into_items();
    items.reverse();
    Ok(Value::from_items(items))
}

pub fn fn_distinct_values<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:distinct-values", args.len(), Arity::Exact(1))?;
    let atoms = args[0].atomize()?;
    let collation = ctx.collation();

    let mut seen: HashSet<AtomicValue> = HashSet::new();
    let mut distinct = Vec::new();
    for item in atoms.into_items() {
        let Item::Atomic(atom) = item else { continue };
        if seen.insert(fold_for_distinct(&atom, collation)) {
            distinct.push(Item::Atomic(atom));
        }
    }
    Ok(Value::from_items(distinct))
}

fn fold_for_distinct(atom: &AtomicValue, collation: Collation) -> AtomicValue {
    match atom {
        AtomicValue::String(s) => AtomicValue::String(collation.key(s)),
        AtomicValue::UntypedAtomic(s) => AtomicValue::String(collation.key(s)),
        other => other.clone(),
    }
}

/// `fn:string()`: canonical lexical form of the context item or the single
/// argument. Maps, arrays and function items have no string value.
pub fn fn_string<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:string", args.len(), Arity::Range(0, 1))?;
    let s = string_of(args.first(), ctx)?;
    Ok(Value::from_string(s))
}

pub fn fn_string_length<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:string-length", args.len(), Arity::Range(0, 1))?;
    let s = string_of(args.first(), ctx)?;
    Ok(Value::from_integer(s.chars().count() as i64))
}

fn string_of<'a, N: TreeNode<'a> + 'a>(
    arg: Option<&Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<String, EngineError> {
    let item = match arg {
        Some(value) => {
            if value.is_empty() {
                return Ok(String::new());
            }
            value.single()?.clone()
        }
        None => ctx
            .context_item()
            .cloned()
            .ok_or_else(|| EngineError::new(crate::error::ErrorKind::NoContextItem))?,
    };
    match &item {
        Item::Node(node) => Ok(node.string_value()),
        Item::Atomic(atom) => Ok(atom.to_string_value()),
        other => Err(EngineError::type_error(
            "an item with a string value",
            other.type_name(),
        )),
    }
}

pub fn fn_concat<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("fn:concat", args.len(), Arity::AtLeast(2))?;
    let mut out = String::new();
    for value in &args {
        if let Some(atom) = ops::atomized_singleton(value)? {
            out.push_str(&atom.to_string_value());
        }
    }
    Ok(Value::from_string(out))
}

pub fn fn_number<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:number", args.len(), Arity::Range(0, 1))?;
    let value = match args.first() {
        Some(v) => v.clone(),
        None => match ctx.context_item() {
            Some(item) => Value::from_item(item.clone()),
            None => return Err(EngineError::new(crate::error::ErrorKind::NoContextItem)),
        },
    };
    let d = match ops::atomized_singleton(&value) {
        Ok(Some(atom)) => atom.to_double(),
        _ => f64::NAN,
    };
    Ok(Value::from_double(d))
}

pub fn fn_position<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:position", args.len(), Arity::Exact(0))?;
    Ok(Value::from_integer(ctx.position() as i64))
}

pub fn fn_last<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:last", args.len(), Arity::Exact(0))?;
    Ok(Value::from_integer(ctx.size() as i64))
}

/// `fn:error()`: raises a dynamic error. The raise is fatal, so a listener
/// cannot continue past it.
pub fn fn_error<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("fn:error", args.len(), Arity::Range(0, 2))?;
    let code = if args.is_empty() {
        "FOER0000".to_string()
    } else {
        arg_string("fn:error", 1, &args)?
    };
    let message = if args.len() == 2 {
        arg_string("fn:error", 2, &args)?
    } else {
        "error raised by fn:error".to_string()
    };
    Err(EngineError::raised(code, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticContext;
    use crate::error::ErrorKind;
    use sylva_tree::tests::MockNode;

    type V = Value<MockNode<'static>>;

    fn ctx_and_statics() -> StaticContext {
        StaticContext::new()
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
    fn boolean_basics() {
        assert_eq!(
            fn_not(vec![V::from_bool(true)]).unwrap(),
            V::from_bool(false)
        );
        assert_eq!(fn_not(vec![V::empty()]).unwrap(), V::from_bool(true));
        assert_eq!(
            fn_boolean(vec![V::from_integer(0)]).unwrap(),
            V::from_bool(false)
        );
    }

    #[test]
    fn sequence_basics() {
        assert_eq!(fn_count(vec![int_seq(&[1, 2, 3])]).unwrap().to_double(), 3.0);
        assert!(
            fn_empty(vec![V::empty()])
                .unwrap()
                .effective_boolean_value()
                .unwrap()
        );
        assert_eq!(fn_tail(vec![int_seq(&[1, 2, 3])]).unwrap().len(), 2);
        assert_eq!(fn_head(vec![int_seq(&[7, 8])]).unwrap().to_double(), 7.0);
    }

    #[test]
    fn distinct_values_respects_collation() {
        let statics = ctx_and_statics();
        let mut ctx = EvalContext::new(&statics, vec![]);

        let input: V = Value::from_items(vec![
            Item::Atomic(AtomicValue::String("a".to_string())),
            Item::Atomic(AtomicValue::String("A".to_string())),
            Item::Atomic(AtomicValue::Integer(1)),
            Item::Atomic(AtomicValue::Double(1.0)),
        ]);
        let result = fn_distinct_values(vec![input.clone()], &mut ctx).unwrap();
        // Codepoint collation: "a" != "A"; 1 and 1.0 are the same value.
        assert_eq!(result.len(), 3);

        let mut ctx = EvalContext::new(&statics, vec![]).with_collation(Collation::CaseBlind);
        let result = fn_distinct_values(vec![input], &mut ctx).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn string_and_number() {
        let statics = ctx_and_statics();
        let mut ctx = EvalContext::new(&statics, vec![]);

        assert_eq!(
            fn_string(vec![V::from_integer(42)], &mut ctx)
                .unwrap()
                .to_string_value(),
            "42"
        );
        assert_eq!(
            fn_number(vec![V::from_string("3.5")], &mut ctx)
                .unwrap()
                .to_double(),
            3.5
        );
        assert!(
            fn_number(vec![V::from_string("pear")], &mut ctx)
                .unwrap()
                .to_double()
                .is_nan()
        );
    }

    #[test]
    fn error_raises_fatally() {
        let err = fn_error(vec![
            V::from_string("XPTY0004"),
            V::from_string("boom"),
        ])
        .unwrap_err();
        assert_eq!(err.severity, crate::error::Severity::Fatal);
        assert!(matches!(err.kind, ErrorKind::Raised { .. }));
    }

    #[test]
    fn concat_skips_empties() {
        let result =
            fn_concat(vec![V::from_string("a"), V::empty(), V::from_integer(7)]).unwrap();
        assert_eq!(result.to_string_value(), "a7");
    }
}
