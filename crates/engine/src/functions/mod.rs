mod array;
mod core;
pub mod datetime;
pub mod hof;
mod map;
mod math;

use std::sync::Arc;

use sylva_tree::TreeNode;

use crate::ast::{ExprArena, QName};
use crate::context::EvalContext;
use crate::error::{EngineError, ErrorKind};
use crate::ops;
use crate::types::{AtomicValue, FunctionValue, Value, ValueArray, ValueMap};

pub use hof::invoke_function;

/// Dispatches a static function call by (namespace prefix, local name).
/// Adding a library function means adding an arm here; an unmatched name is
/// an unknown-function error carrying the requested arity.
pub fn call_function<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    name: &QName,
    args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    let prefix = name.prefix.as_deref();
    let local = name.local.as_str();

    match (prefix, local) {
        (Some("fn") | None, "true") => core::fn_true(args),
        (Some("fn") | None, "false") => core::fn_false(args),
        (Some("fn") | None, "not") => core::fn_not(args),
        (Some("fn") | None, "boolean") => core::fn_boolean(args),

        (Some("fn") | None, "count") => core::fn_count(args),
        (Some("fn") | None, "empty") => core::fn_empty(args),
        (Some("fn") | None, "exists") => core::fn_exists(args),
        (Some("fn") | None, "head") => core::fn_head(args),
        (Some("fn") | None, "tail") => core::fn_tail(args),
        (Some("fn") | None, "reverse") => core::fn_reverse(args),
        (Some("fn") | None, "distinct-values") => core::fn_distinct_values(args, ctx),

        (Some("fn") | None, "string") => core::fn_string(args, ctx),
        (Some("fn") | None, "string-length") => core::fn_string_length(args, ctx),
        (Some("fn") | None, "concat") => core::fn_concat(args),
        (Some("fn") | None, "number") => core::fn_number(args, ctx),

        (Some("fn") | None, "position") => core::fn_position(args, ctx),
        (Some("fn") | None, "last") => core::fn_last(args, ctx),

        (Some("fn") | None, "error") => core::fn_error(args),

        (Some("fn") | None, "for-each") => hof::fn_for_each(arena, args, ctx),
        (Some("fn") | None, "filter") => hof::fn_filter(arena, args, ctx),
        (Some("fn") | None, "fold-left") => hof::fn_fold_left(arena, args, ctx),
        (Some("fn") | None, "fold-right") => hof::fn_fold_right(arena, args, ctx),
        (Some("fn") | None, "for-each-pair") => hof::fn_for_each_pair(arena, args, ctx),
        (Some("fn") | None, "apply") => hof::fn_apply(arena, args, ctx),
        (Some("fn") | None, "function-arity") => hof::fn_function_arity(args),

        (Some("map"), "size") => map::map_size(args),
        (Some("map"), "keys") => map::map_keys(args),
        (Some("map"), "contains") => map::map_contains(args),
        (Some("map"), "get") => map::map_get(args),
        (Some("map"), "put") => map::map_put(args),
        (Some("map"), "remove") => map::map_remove(args),
        (Some("map"), "entry") => map::map_entry(args),
        (Some("map"), "merge") => map::map_merge(args),
        (Some("map"), "for-each") => map::map_for_each(arena, args, ctx),

        (Some("array"), "size") => array::array_size(args),
        (Some("array"), "get") => array::array_get(args),
        (Some("array"), "put") => array::array_put(args),
        (Some("array"), "append") => array::array_append(args),
        (Some("array"), "subarray") => array::array_subarray(args),
        (Some("array"), "remove") => array::array_remove(args),
        (Some("array"), "insert-before") => array::array_insert_before(args),
        (Some("array"), "head") => array::array_head(args),
        (Some("array"), "tail") => array::array_tail(args),
        (Some("array"), "reverse") => array::array_reverse(args),
        (Some("array"), "join") => array::array_join(args),
        (Some("array"), "flatten") => array::array_flatten(args),
        (Some("array"), "for-each") => array::array_for_each(arena, args, ctx),
        (Some("array"), "filter") => array::array_filter(arena, args, ctx),
        (Some("array"), "fold-left") => array::array_fold_left(arena, args, ctx),
        (Some("array"), "fold-right") => array::array_fold_right(arena, args, ctx),
        (Some("array"), "for-each-pair") => array::array_for_each_pair(arena, args, ctx),

        (Some("math"), "pi") => math::math_pi(args),
        (Some("math"), "sqrt") => math::math_sqrt(args),
        (Some("math"), "pow") => math::math_pow(args),
        (Some("math"), "exp") => math::math_exp(args),
        (Some("math"), "log") => math::math_log(args),
        (Some("math"), "log10") => math::math_log10(args),
        (Some("math"), "sin") => math::math_sin(args),
        (Some("math"), "cos") => math::math_cos(args),
        (Some("math"), "tan") => math::math_tan(args),
        (Some("math"), "atan2") => math::math_atan2(args),

        (Some("fn") | None, "dateTime") => datetime::fn_datetime(args),
        (Some("fn") | None, "year-from-dateTime") => datetime::fn_year_from_datetime(args),
        (Some("fn") | None, "month-from-dateTime") => datetime::fn_month_from_datetime(args),
        (Some("fn") | None, "day-from-dateTime") => datetime::fn_day_from_datetime(args),
        (Some("fn") | None, "hours-from-dateTime") => datetime::fn_hours_from_datetime(args),
        (Some("fn") | None, "minutes-from-dateTime") => datetime::fn_minutes_from_datetime(args),
        (Some("fn") | None, "seconds-from-dateTime") => datetime::fn_seconds_from_datetime(args),
        (Some("fn") | None, "timezone-from-dateTime") => {
            datetime::fn_timezone_from_datetime(args)
        }
        (Some("fn") | None, "year-from-date") => datetime::fn_year_from_date(args),
        (Some("fn") | None, "month-from-date") => datetime::fn_month_from_date(args),
        (Some("fn") | None, "day-from-date") => datetime::fn_day_from_date(args),
        (Some("fn") | None, "hours-from-time") => datetime::fn_hours_from_time(args),
        (Some("fn") | None, "minutes-from-time") => datetime::fn_minutes_from_time(args),
        (Some("fn") | None, "seconds-from-time") => datetime::fn_seconds_from_time(args),
        (Some("fn") | None, "timezone-from-time") => datetime::fn_timezone_from_time(args),

        _ => Err(EngineError::new(ErrorKind::UnknownFunction {
            name: name.to_string(),
            arity: args.len(),
        })),
    }
}

/// Declared arity of a library function.
pub(crate) enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

pub(crate) fn check_arity(
    function: &str,
    args_len: usize,
    arity: Arity,
) -> Result<(), EngineError> {
    let (ok, expected) = match arity {
        Arity::Exact(n) => (args_len == n, n.to_string()),
        Arity::Range(lo, hi) => (args_len >= lo && args_len <= hi, format!("{} to {}", lo, hi)),
        Arity::AtLeast(n) => (args_len >= n, format!("at least {}", n)),
    };
    if ok {
        Ok(())
    } else {
        Err(EngineError::arity(function, expected, args_len))
    }
}

pub(crate) fn arg_map<'v, 'a, N: TreeNode<'a> + 'a>(
    function: &str,
    position: usize,
    args: &'v [Value<N>],
) -> Result<&'v ValueMap<N>, EngineError> {
    let value = &args[position - 1];
    match value.single() {
        Ok(item) => item.as_map().ok_or_else(|| {
            EngineError::argument(function, position, "map(*)", item.type_name())
        }),
        Err(_) => Err(EngineError::argument(
            function,
            position,
            "map(*)",
            value.shape_name(),
        )),
    }
}

pub(crate) fn arg_array<'v, 'a, N: TreeNode<'a> + 'a>(
    function: &str,
    position: usize,
    args: &'v [Value<N>],
) -> Result<&'v ValueArray<N>, EngineError> {
    let value = &args[position - 1];
    match value.single() {
        Ok(item) => item.as_array().ok_or_else(|| {
            EngineError::argument(function, position, "array(*)", item.type_name())
        }),
        Err(_) => Err(EngineError::argument(
            function,
            position,
            "array(*)",
            value.shape_name(),
        )),
    }
}

pub(crate) fn arg_function<'v, 'a, N: TreeNode<'a> + 'a>(
    function: &str,
    position: usize,
    args: &'v [Value<N>],
) -> Result<&'v FunctionValue<N>, EngineError> {
    let value = &args[position - 1];
    match value.single() {
        Ok(item) => item.as_function().ok_or_else(|| {
            EngineError::argument(function, position, "function(*)", item.type_name())
        }),
        Err(_) => Err(EngineError::argument(
            function,
            position,
            "function(*)",
            value.shape_name(),
        )),
    }
}

pub(crate) fn arg_atomic<'a, N: TreeNode<'a> + 'a>(
    function: &str,
    position: usize,
    args: &[Value<N>],
) -> Result<AtomicValue, EngineError> {
    let value = &args[position - 1];
    ops::atomized_singleton(value)
        .map_err(|_| {
            EngineError::argument(
                function,
                position,
                "a single atomic value",
                value.shape_name(),
            )
        })?
        .ok_or_else(|| {
            EngineError::argument(
                function,
                position,
                "a single atomic value",
                "empty sequence",
            )
        })
}

pub(crate) fn arg_integer<'a, N: TreeNode<'a> + 'a>(
    function: &str,
    position: usize,
    args: &[Value<N>],
) -> Result<i64, EngineError> {
    let atom = arg_atomic(function, position, args)?;
    match atom {
        AtomicValue::Integer(i) => Ok(i),
        other => Err(EngineError::argument(
            function,
            position,
            "xs:integer",
            other.type_name(),
        )),
    }
}

pub(crate) fn arg_string<'a, N: TreeNode<'a> + 'a>(
    function: &str,
    position: usize,
    args: &[Value<N>],
) -> Result<String, EngineError> {
    Ok(arg_atomic(function, position, args)?.to_string_value())
}

pub(crate) fn arg_double<'a, N: TreeNode<'a> + 'a>(
    function: &str,
    position: usize,
    args: &[Value<N>],
) -> Result<f64, EngineError> {
    let atom = arg_atomic(function, position, args)?;
    if atom.is_numeric() || matches!(atom, AtomicValue::UntypedAtomic(_)) {
        Ok(atom.to_double())
    } else {
        Err(EngineError::argument(
            function,
            position,
            "a numeric value",
            atom.type_name(),
        ))
    }
}
