//! The expression evaluator.
//!
//! Entry points: [`evaluate_expression`] for the plain abort-on-error
//! contract, [`evaluate_with_listener`] when an error listener may let
//! evaluation continue with a best-effort value. [`iterate`] produces a
//! node cursor instead of a materialized value for node-yielding kinds.

use std::collections::HashSet;
use std::sync::Arc;

use sylva_tree::{Axis, NodeType, TreeNode};

use crate::ast::*;
use crate::context::EvalContext;
use crate::cursor::{FilterCursor, IntersectCursor, MaterializedCursor, NodeCursor, drain};
use crate::error::{EngineError, ErrorKind};
use crate::fixup::CompiledExpression;
use crate::functions;
use crate::ops;
use crate::types::*;

/// Evaluates a fixed-up expression against a context. The top-level local
/// frame is pushed before and popped after the run, error exits included.
pub fn evaluate_expression<'a, N: TreeNode<'a> + 'a>(
    compiled: &CompiledExpression,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    ctx.with_frame(compiled.frame_size(), |ctx| {
        evaluate(compiled.arena(), compiled.root(), ctx)
    })
}

/// Like [`evaluate_expression`], but routes a failure through the installed
/// error listener first. A listener-sanctioned continue produces the empty
/// sequence as the best-effort result.
pub fn evaluate_with_listener<'a, N: TreeNode<'a> + 'a>(
    compiled: &CompiledExpression,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    match evaluate_expression(compiled, ctx) {
        Ok(value) => Ok(value),
        Err(error) => {
            ctx.report(error)?;
            Ok(Value::empty())
        }
    }
}

/// Evaluates one node of the tree. Errors pick up the node's source
/// location on the way out.
pub fn evaluate<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    id: ExprId,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    let loc = arena.node(id).loc;
    evaluate_kind(arena, id, ctx).map_err(|e| e.at(loc))
}

fn evaluate_kind<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    id: ExprId,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    match &arena.node(id).kind {
        ExprKind::Literal(lit) => Ok(Value::from_atomic(lit.clone())),

        ExprKind::ContextItem => match ctx.context_item() {
            Some(item) => Ok(Value::from_item(item.clone())),
            None => Err(EngineError::new(ErrorKind::NoContextItem)),
        },

        ExprKind::VarRef { name, slot } => {
            let slot = slot.ok_or_else(|| {
                EngineError::new(ErrorKind::UnresolvedVariable { name: name.clone() })
            })?;
            ctx.vars_ref().get(slot).cloned().ok_or_else(|| {
                EngineError::new(ErrorKind::UnresolvedVariable { name: name.clone() })
            })
        }

        ExprKind::Let { bindings, body } => {
            for binding in bindings {
                let value = evaluate(arena, binding.value, ctx)?;
                ctx.vars().set_local(binding_slot(binding)?, value);
            }
            evaluate(arena, *body, ctx)
        }

        ExprKind::For { bindings, body } => {
            let mut results = Vec::new();
            evaluate_for(arena, bindings, 0, *body, ctx, &mut results)?;
            Ok(Value::from_items(results))
        }

        ExprKind::Quantified {
            quantifier,
            bindings,
            satisfies,
        } => {
            let holds = evaluate_quantified(arena, *quantifier, bindings, 0, *satisfies, ctx)?;
            Ok(Value::from_bool(holds))
        }

        ExprKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            if evaluate(arena, *condition, ctx)?.effective_boolean_value()? {
                evaluate(arena, *then_branch, ctx)
            } else {
                evaluate(arena, *else_branch, ctx)
            }
        }

        ExprKind::Binary { op, left, right } => {
            let l = evaluate(arena, *left, ctx)?;
            let r = evaluate(arena, *right, ctx)?;
            ops::binary(*op, l, r, ctx.collation())
        }

        ExprKind::Unary { op, operand } => {
            let value = evaluate(arena, *operand, ctx)?;
            ops::unary(*op, value)
        }

        ExprKind::SequenceCtor(ids) => {
            let mut values = Vec::with_capacity(ids.len());
            for e in ids {
                values.push(evaluate(arena, *e, ctx)?);
            }
            Ok(Value::from_values(values))
        }

        ExprKind::MapCtor(entries) => {
            let mut map = ValueMap::with_collation(ctx.collation());
            for (key_expr, value_expr) in entries {
                let key_value = evaluate(arena, *key_expr, ctx)?;
                let key = ops::atomized_singleton(&key_value)?.ok_or_else(|| {
                    EngineError::type_error("an atomic map key", key_value.shape_name())
                })?;
                let value = evaluate(arena, *value_expr, ctx)?;
                map = map.put(key, value);
            }
            Ok(Value::from_map(map))
        }

        ExprKind::ArrayCtor(members) => {
            let mut values = Vec::with_capacity(members.len());
            for m in members {
                values.push(evaluate(arena, *m, ctx)?);
            }
            Ok(Value::from_array(ValueArray::from_members(values)))
        }

        ExprKind::ArraySeqCtor(expr) => {
            let value = evaluate(arena, *expr, ctx)?;
            let members = value
                .into_items()
                .into_iter()
                .map(Value::from_item)
                .collect();
            Ok(Value::from_array(ValueArray::from_members(members)))
        }

        ExprKind::Lookup { base, key } => {
            let base_value = evaluate(arena, *base, ctx)?;
            evaluate_lookup(arena, &base_value, key, ctx)
        }

        ExprKind::Call { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arena, *arg, ctx)?);
            }
            functions::call_function(arena, name, values, ctx)
        }

        ExprKind::DynamicCall { callee, args } => {
            let callee_value = evaluate(arena, *callee, ctx)?;
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arena, *arg, ctx)?);
            }
            evaluate_dynamic_call(arena, &callee_value, values, ctx)
        }

        ExprKind::NamedFunctionRef { name, arity } => {
            resolve_named_function_ref(name, *arity, ctx)
        }

        ExprKind::InlineFunction {
            params,
            body,
            captures,
            frame_size,
        } => {
            let mut captured = Vec::with_capacity(captures.len());
            for capture in captures {
                let value = ctx.vars_ref().get(capture.source).cloned().ok_or_else(|| {
                    EngineError::new(ErrorKind::UnresolvedVariable {
                        name: format!("capture slot {}", capture.inner_slot),
                    })
                })?;
                captured.push((capture.inner_slot, value));
            }
            Ok(Value::from_function(FunctionValue::Closure {
                params: params.clone(),
                body: *body,
                frame_size: *frame_size as usize,
                captured,
                arena: Arc::clone(arena),
            }))
        }

        ExprKind::Path { start, steps } => evaluate_path(*start, steps, ctx),

        ExprKind::Filter { base, predicates } => {
            let base_value = evaluate(arena, *base, ctx)?;
            evaluate_predicates(arena, base_value, predicates, ctx)
        }
    }
}

fn binding_slot(binding: &Binding) -> Result<u32, EngineError> {
    binding.slot.ok_or_else(|| {
        EngineError::new(ErrorKind::UnresolvedVariable {
            name: binding.name.clone(),
        })
    })
}

fn evaluate_for<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    bindings: &[Binding],
    index: usize,
    body: ExprId,
    ctx: &mut EvalContext<'_, N>,
    results: &mut Vec<Item<N>>,
) -> Result<(), EngineError> {
    if index >= bindings.len() {
        results.extend(evaluate(arena, body, ctx)?.into_items());
        return Ok(());
    }
    let binding = &bindings[index];
    let slot = binding_slot(binding)?;
    let sequence = evaluate(arena, binding.value, ctx)?;
    for item in sequence.into_items() {
        ctx.vars().set_local(slot, Value::from_item(item));
        evaluate_for(arena, bindings, index + 1, body, ctx, results)?;
    }
    Ok(())
}

fn evaluate_quantified<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    quantifier: Quantifier,
    bindings: &[Binding],
    index: usize,
    satisfies: ExprId,
    ctx: &mut EvalContext<'_, N>,
) -> Result<bool, EngineError> {
    if index >= bindings.len() {
        return evaluate(arena, satisfies, ctx)?.effective_boolean_value();
    }
    let binding = &bindings[index];
    let slot = binding_slot(binding)?;
    let sequence = evaluate(arena, binding.value, ctx)?;
    for item in sequence.into_items() {
        ctx.vars().set_local(slot, Value::from_item(item));
        let holds =
            evaluate_quantified(arena, quantifier, bindings, index + 1, satisfies, ctx)?;
        match quantifier {
            Quantifier::Some if holds => return Ok(true),
            Quantifier::Every if !holds => return Ok(false),
            _ => {}
        }
    }
    Ok(matches!(quantifier, Quantifier::Every))
}

fn evaluate_lookup<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    base: &Value<N>,
    key: &LookupKey,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    match base.single()? {
        Item::Map(map) => {
            let atomic_key = match key {
                LookupKey::Name(name) => AtomicValue::String(name.clone()),
                LookupKey::Integer(i) => AtomicValue::Integer(*i),
                LookupKey::Expr(expr) => {
                    let key_value = evaluate(arena, *expr, ctx)?;
                    ops::atomized_singleton(&key_value)?.ok_or_else(|| {
                        EngineError::type_error("an atomic map key", key_value.shape_name())
                    })?
                }
                LookupKey::Wildcard => {
                    let values: Vec<Value<N>> = map.values().cloned().collect();
                    return Ok(Value::from_values(values));
                }
            };
            // Lookup of a missing key is empty, not an error.
            Ok(map.get(&atomic_key).cloned().unwrap_or_else(Value::empty))
        }
        Item::Array(array) => {
            let index = match key {
                LookupKey::Integer(i) => *i,
                LookupKey::Expr(expr) => {
                    let key_value = evaluate(arena, *expr, ctx)?;
                    let atom = ops::atomized_singleton(&key_value)?.ok_or_else(|| {
                        EngineError::new(ErrorKind::InvalidIndex {
                            actual: key_value.shape_name(),
                        })
                    })?;
                    atom.to_integer().ok_or_else(|| {
                        EngineError::new(ErrorKind::InvalidIndex {
                            actual: atom.to_string_value(),
                        })
                    })?
                }
                LookupKey::Wildcard => {
                    let values: Vec<Value<N>> = array.members().to_vec();
                    return Ok(Value::from_values(values));
                }
                LookupKey::Name(name) => {
                    return Err(EngineError::new(ErrorKind::InvalidIndex {
                        actual: format!("name '{}'", name),
                    }));
                }
            };
            array.get(index).cloned()
        }
        other => Err(EngineError::type_error("a map or array", other.type_name())),
    }
}

fn evaluate_dynamic_call<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    callee: &Value<N>,
    args: Vec<Value<N>>,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    match callee.single()? {
        Item::Function(func) => functions::invoke_function(arena, func, args, ctx),
        Item::Map(map) => {
            if args.len() != 1 {
                return Err(EngineError::new(ErrorKind::FunctionArity {
                    expected: 1,
                    actual: args.len(),
                }));
            }
            let key = ops::atomized_singleton(&args[0])?.ok_or_else(|| {
                EngineError::type_error("an atomic map key", args[0].shape_name())
            })?;
            Ok(map.get(&key).cloned().unwrap_or_else(Value::empty))
        }
        Item::Array(array) => {
            if args.len() != 1 {
                return Err(EngineError::new(ErrorKind::FunctionArity {
                    expected: 1,
                    actual: args.len(),
                }));
            }
            let atom = ops::atomized_singleton(&args[0])?.ok_or_else(|| {
                EngineError::new(ErrorKind::InvalidIndex {
                    actual: args[0].shape_name(),
                })
            })?;
            let index = atom.to_integer().ok_or_else(|| {
                EngineError::new(ErrorKind::InvalidIndex {
                    actual: atom.to_string_value(),
                })
            })?;
            array.get(index).cloned()
        }
        other => Err(EngineError::type_error(
            "a function, map or array",
            other.type_name(),
        )),
    }
}

/// Resolves a named function reference. When schema information is
/// installed, the name is offered to it first; an unresolvable name is not
/// an error, the reference falls back to ordinary library resolution.
fn resolve_named_function_ref<'a, N: TreeNode<'a> + 'a>(
    name: &QName,
    arity: usize,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    if let Some(schema) = ctx.statics().schema() {
        match schema.resolve_type(name) {
            Some(schema_type) => {
                log::debug!("named ref {} resolved to schema type {}", name, schema_type.name);
            }
            None => {
                log::debug!("no schema type for {}; falling back to library lookup", name);
            }
        }
    }
    Ok(Value::from_function(FunctionValue::named(name.clone(), arity)))
}

fn evaluate_path<'a, N: TreeNode<'a> + 'a>(
    start: PathStart,
    steps: &[PathStep],
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    let context_node = match ctx.context_item() {
        Some(Item::Node(n)) => *n,
        Some(other) => {
            return Err(EngineError::type_error("a node context item", other.type_name()));
        }
        None => return Err(EngineError::new(ErrorKind::NoContextItem)),
    };
    let mut current: Vec<N> = match start {
        PathStart::Root => vec![context_node.root()],
        PathStart::ContextNode => vec![context_node],
    };

    for step in steps {
        let mut seen: HashSet<N> = HashSet::new();
        let mut collected: Vec<N> = Vec::new();
        for node in &current {
            step.axis.collect(*node, &mut seen, &mut collected);
        }
        collected.retain(|n| matches_node_test(n, &step.test, step.axis));
        // Every step re-establishes the document-order guarantee.
        collected.sort();
        collected.dedup();
        current = collected;
    }

    Ok(Value::from_nodes(current))
}

fn matches_node_test<'a, N: TreeNode<'a>>(node: &N, test: &NodeTest, axis: Axis) -> bool {
    match test {
        NodeTest::Wildcard => match axis {
            Axis::Attribute => node.node_type() == NodeType::Attribute,
            _ => node.node_type() == NodeType::Element,
        },
        NodeTest::Name(name) => node
            .name()
            .is_some_and(|qname| qname.local_part == name),
        NodeTest::Kind(kind) => match kind {
            KindTest::AnyNode => true,
            KindTest::Text => node.node_type() == NodeType::Text,
            KindTest::Comment => node.node_type() == NodeType::Comment,
            KindTest::ProcessingInstruction => {
                node.node_type() == NodeType::ProcessingInstruction
            }
        },
    }
}

fn evaluate_predicates<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    base: Value<N>,
    predicates: &[ExprId],
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    let mut items = base.into_items();
    for predicate in predicates {
        let size = items.len();
        let mut kept = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let keep = ctx.with_scope(None, Some(item.clone()), |ctx| {
                ctx.with_position(i + 1, size, |ctx| {
                    let result = evaluate(arena, *predicate, ctx)?;
                    predicate_keeps(&result, i + 1)
                })
            })?;
            if keep {
                kept.push(item.clone());
            }
        }
        items = kept;
    }
    Ok(Value::from_items(items))
}

/// A numeric predicate selects by position; anything else goes through the
/// effective boolean value.
fn predicate_keeps<N: Clone>(result: &Value<N>, position: usize) -> Result<bool, EngineError> {
    if let Some(Item::Atomic(atom)) = result.first() {
        if result.len() == 1 && atom.is_numeric() {
            return Ok(atom.to_double() == position as f64);
        }
    }
    result.effective_boolean_value()
}

/// Whether a node-yielding expression kind advertises document order.
fn claims_document_order(arena: &ExprArena, id: ExprId) -> bool {
    match &arena.node(id).kind {
        ExprKind::Path { .. } => true,
        ExprKind::Binary {
            op: BinaryOp::Union | BinaryOp::Intersect,
            ..
        } => true,
        ExprKind::Filter { base, .. } => claims_document_order(arena, *base),
        _ => false,
    }
}

/// Produces a cursor for a node-yielding expression. Kinds with dedicated
/// cursor support stream; everything else evaluates eagerly and wraps the
/// node result.
pub fn iterate<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    id: ExprId,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Box<dyn NodeCursor<'a, N> + 'a>, EngineError> {
    match &arena.node(id).kind {
        ExprKind::Filter { .. } => {
            let ordered = claims_document_order(arena, id);
            Ok(Box::new(FilterCursor::new(
                Arc::clone(arena),
                id,
                ctx.vars_ref().frame_pointer(),
                ordered,
            )))
        }
        ExprKind::Binary {
            op: BinaryOp::Intersect,
            left,
            right,
        } => {
            let sources = vec![iterate(arena, *left, ctx)?, iterate(arena, *right, ctx)?];
            Ok(Box::new(IntersectCursor::new(sources)))
        }
        ExprKind::Path { .. } => {
            let value = evaluate(arena, id, ctx)?;
            Ok(Box::new(MaterializedCursor::new(value.to_nodes(), true)))
        }
        _ => {
            let value = evaluate(arena, id, ctx)?;
            let mut nodes = Vec::with_capacity(value.len());
            for item in value.items() {
                match item {
                    Item::Node(n) => nodes.push(*n),
                    other => {
                        return Err(EngineError::type_error(
                            "a node sequence",
                            other.type_name(),
                        )
                        .at(arena.node(id).loc));
                    }
                }
            }
            Ok(Box::new(MaterializedCursor::new(nodes, false)))
        }
    }
}

/// Drains [`iterate`] into a document-order-preserving value; convenience
/// for callers that want the cursor contract but a materialized result.
pub fn iterate_to_value<'a, N: TreeNode<'a> + 'a>(
    arena: &Arc<ExprArena>,
    id: ExprId,
    ctx: &mut EvalContext<'_, N>,
) -> Result<Value<N>, EngineError> {
    let mut cursor = iterate(arena, id, ctx)?;
    let nodes = drain(cursor.as_mut(), ctx)?;
    Ok(Value::from_nodes(nodes))
}
