//! The `map:` function namespace.

use std::sync::Arc;

use indexmap::IndexMap;
use sylva_tree::TreeNode;

use super::{Arity, arg_atomic, arg_function, arg_map, check_arity, invoke_function};
use crate::ast::ExprArena;
use crate::context::EvalContext;
use crate::error::{EngineError, ErrorKind};
use crate::types::{AtomicValue, Item, Value, ValueMap};

pub fn map_size<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("map:size", args.len(), Arity::Exact(1))?;
    let map = arg_map("map:size", 1, &args)?;
    Ok(Value::from_integer(map.size() as i64))
}

pub fn map_keys<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("map:keys", args.len(), Arity::Exact(1))?;
    let map = arg_map("map:keys", 1, &args)?;
    let keys: Vec<Item<N>> = map.keys().cloned().map(Item::Atomic).collect();
    Ok(Value::from_items(keys))
}

pub fn map_contains<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("map:contains", args.len(), Arity::Exact(2))?;
    let map = arg_map("map:contains", 1, &args)?;
    let key = arg_atomic("map:contains", 2, &args)?;
    Ok(Value::from_bool(map.contains_key(&key)))
}

/// Total: a missing key is the empty sequence, never an error.
pub fn map_get<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("map:get", args.len(), Arity::Exact(2))?;
    let map = arg_map("map:get", 1, &args)?;
    let key = arg_atomic("map:get", 2, &args)?;
    Ok(map.get(&key).cloned().unwrap_or_else(Value::empty))
}

pub fn map_put<'a, N: TreeNode<'a> + 'a>(mut args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("map:put", args.len(), Arity::Exact(3))?;
    let map = arg_map("map:put", 1, &args)?.clone();
    let key = arg_atomic("map:put", 2, &args)?;
    let value = args.remove(2);
    Ok(Value::from_map(map.put(key, value)))
}

pub fn map_remove<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("map:remove", args.len(), Arity::Exact(2))?;
    let map = arg_map("map:remove", 1, &args)?;
    let mut result = map.clone();
    // The keys argument is a sequence; remove every listed key.
    for item in args[1].items() {
        match item {
            Item::Atomic(key) => result = result.remove(key),
            other => {
                return Err(EngineError::argument(
                    "map:remove",
                    2,
                    "atomic keys",
                    other.type_name(),
                ));
            }
        }
    }
    Ok(Value::from_map(result))
}

pub fn map_entry<'a, N: TreeNode<'a> + 'a>(
    mut args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("map:entry", args.len(), Arity::Exact(2))?;
    let key = arg_atomic("map:entry", 1, &args)?;
    let value = args.remove(1);
    Ok(Value::from_map(ValueMap::from_entries(vec![(key, value)])))
}

/// Duplicate-key resolution for [`map_merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DuplicatesPolicy {
    Reject,
    UseFirst,
    UseLast,
    UseAny,
    Combine,
}

impl DuplicatesPolicy {
    fn parse(name: &str) -> Result<Self, EngineError> {
        match name {
            "reject" => Ok(Self::Reject),
            "use-first" => Ok(Self::UseFirst),
            "use-last" => Ok(Self::UseLast),
            "use-any" => Ok(Self::UseAny),
            "combine" => Ok(Self::Combine),
            other => Err(EngineError::argument(
                "map:merge",
                2,
                "a duplicates policy",
                format!("'{}'", other),
            )),
        }
    }
}

/// Merges a sequence of maps. The optional second argument is an options
/// map whose `duplicates` entry picks the policy; the default keeps the
/// value from the earliest map containing a key.
pub fn map_merge<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("map:merge", args.len(), Arity::Range(1, 2))?;

    let policy = if args.len() == 2 {
        let options = arg_map("map:merge", 2, &args)?;
        match options.get(&AtomicValue::String("duplicates".to_string())) {
            Some(value) => DuplicatesPolicy::parse(&value.to_string_value())?,
            None => DuplicatesPolicy::UseFirst,
        }
    } else {
        DuplicatesPolicy::UseFirst
    };

    let mut entries: IndexMap<AtomicValue, Value<N>> = IndexMap::new();
    for (position, item) in args[0].items().iter().enumerate() {
        let Item::Map(map) = item else {
            return Err(EngineError::argument(
                "map:merge",
                1,
                "a sequence of maps",
                format!("{} at item {}", item.type_name(), position + 1),
            ));
        };
        for (key, value) in map.entries() {
            match entries.get_mut(key) {
                None => {
                    entries.insert(key.clone(), value.clone());
                }
                Some(existing) => match policy {
                    DuplicatesPolicy::UseFirst | DuplicatesPolicy::UseAny => {}
                    DuplicatesPolicy::UseLast => {
                        *existing = value.clone();
                    }
                    DuplicatesPolicy::Combine => {
                        *existing = existing.clone().concat(value.clone());
                    }
                    DuplicatesPolicy::Reject => {
                        return Err(EngineError::new(ErrorKind::DuplicateKey {
                            key: key.to_string_value(),
                        }));
                    }
                },
            }
        }
    }

    let mut result = ValueMap::new();
    for (key, value) in entries {
        result.insert(key, value);
    }
    Ok(Value::from_map(result))
}

pub fn map_for_each<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    check_arity("map:for-each", args.len(), Arity::Exact(2))?;
    let map = arg_map("map:for-each", 1, &args)?.clone();
    let func = arg_function("map:for-each", 2, &args)?.clone();

    let mut results = Vec::new();
    for (key, value) in map.entries() {
        let mapped = invoke_function(
            arena,
            &func,
            vec![Value::from_atomic(key.clone()), value.clone()],
            ctx,
        )?;
        results.extend(mapped.into_items());
    }
    Ok(Value::from_items(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sylva_tree::tests::MockNode;

    type V = Value<MockNode<'static>>;

    fn key(s: &str) -> AtomicValue {
        AtomicValue::String(s.to_string())
    }

    fn m1() -> V {
        // {a: 1}
        Value::from_map(ValueMap::from_entries(vec![(
            key("a"),
            Value::from_integer(1),
        )]))
    }

    fn m2() -> V {
        // {a: 2, b: 3}
        Value::from_map(ValueMap::from_entries(vec![
            (key("a"), Value::from_integer(2)),
            (key("b"), Value::from_integer(3)),
        ]))
    }

    fn merge_input() -> V {
        Value::from_values(vec![m1(), m2()])
    }

    fn options(policy: &str) -> V {
        Value::from_map(ValueMap::from_entries(vec![(
            key("duplicates"),
            Value::from_string(policy),
        )]))
    }

    fn merged_map(result: &V) -> &ValueMap<MockNode<'static>> {
        result.items()[0].as_map().expect("map result")
    }

    #[test]
    fn merge_use_first() {
        let result = map_merge(vec![merge_input(), options("use-first")]).unwrap();
        let map = merged_map(&result);
        assert_eq!(map.get(&key("a")), Some(&Value::from_integer(1)));
        assert_eq!(map.get(&key("b")), Some(&Value::from_integer(3)));
    }

    #[test]
    fn merge_use_last() {
        let result = map_merge(vec![merge_input(), options("use-last")]).unwrap();
        let map = merged_map(&result);
        assert_eq!(map.get(&key("a")), Some(&Value::from_integer(2)));
        assert_eq!(map.get(&key("b")), Some(&Value::from_integer(3)));
    }

    #[test]
    fn merge_use_any_is_deterministically_first() {
        let result = map_merge(vec![merge_input(), options("use-any")]).unwrap();
        assert_eq!(
            merged_map(&result).get(&key("a")),
            Some(&Value::from_integer(1))
        );
    }

    #[test]
    fn merge_combine_collects_all_values_over_all_keys() {
        let result = map_merge(vec![merge_input(), options("combine")]).unwrap();
        let map = merged_map(&result);
        assert_eq!(
            map.get(&key("a")),
            Some(&Value::from_items(vec![
                Item::Atomic(AtomicValue::Integer(1)),
                Item::Atomic(AtomicValue::Integer(2)),
            ]))
        );
        // Keys contributed by a single map still appear.
        assert_eq!(map.get(&key("b")), Some(&Value::from_integer(3)));
    }

    #[test]
    fn merge_reject_raises_on_any_shared_key() {
        let err = map_merge(vec![merge_input(), options("reject")]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateKey { key: "a".to_string() });
    }

    #[test]
    fn merge_defaults_to_use_first() {
        let result = map_merge(vec![merge_input()]).unwrap();
        assert_eq!(
            merged_map(&result).get(&key("a")),
            Some(&Value::from_integer(1))
        );
    }

    #[test]
    fn get_of_missing_key_is_empty_not_error() {
        let result = map_get(vec![m1(), Value::from_string("zzz")]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn put_and_remove_round_trip() {
        let with_b = map_put(vec![m1(), Value::from_string("b"), V::from_integer(9)]).unwrap();
        assert_eq!(
            merged_map(&with_b).get(&key("b")),
            Some(&Value::from_integer(9))
        );

        let without = map_remove(vec![with_b, Value::from_string("b")]).unwrap();
        assert!(!merged_map(&without).contains_key(&key("b")));
    }

    #[test]
    fn entry_builds_a_singleton_map() {
        let result = map_entry(vec![Value::from_string("k"), V::from_integer(1)]).unwrap();
        assert_eq!(merged_map(&result).size(), 1);
    }

    #[test]
    fn bad_policy_names_the_argument() {
        let err = map_merge(vec![merge_input(), options("keep-all")]).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::InvalidArgument { position: 2, .. }
        ));
    }

    #[test]
    fn non_map_item_in_input_is_an_argument_error() {
        let input = Value::from_values(vec![m1(), V::from_integer(5)]);
        let err = map_merge(vec![input]).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::InvalidArgument { position: 1, .. }
        ));
    }
}
