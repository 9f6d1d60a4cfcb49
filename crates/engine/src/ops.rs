//! Binary and unary operator evaluation.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sylva_tree::TreeNode;

use crate::ast::{BinaryOp, UnaryOp};
use crate::collation::Collation;
use crate::cursor::intersect_node_lists;
use crate::error::{EngineError, ErrorKind};
use crate::types::{AtomicValue, Item, NumericPair, Value};

pub fn binary<'a, N: TreeNode<'a> + 'a>(
    op: BinaryOp,
    left: Value<N>,
    right: Value<N>,
    collation: Collation,
) -> Result<Value<N>, EngineError> {
    match op {
        BinaryOp::Or => Ok(Value::from_bool(
            left.effective_boolean_value()? || right.effective_boolean_value()?,
        )),
        BinaryOp::And => Ok(Value::from_bool(
            left.effective_boolean_value()? && right.effective_boolean_value()?,
        )),

        BinaryOp::Eq => compare(left, right, collation, |ord| ord == Ordering::Equal),
        BinaryOp::Ne => compare(left, right, collation, |ord| ord != Ordering::Equal),
        BinaryOp::Lt => compare(left, right, collation, |ord| ord == Ordering::Less),
        BinaryOp::Le => compare(left, right, collation, |ord| ord != Ordering::Greater),
        BinaryOp::Gt => compare(left, right, collation, |ord| ord == Ordering::Greater),
        BinaryOp::Ge => compare(left, right, collation, |ord| ord != Ordering::Less),

        BinaryOp::Add => arithmetic(left, right, add_pair),
        BinaryOp::Subtract => arithmetic(left, right, subtract_pair),
        BinaryOp::Multiply => arithmetic(left, right, multiply_pair),
        BinaryOp::Divide => arithmetic(left, right, divide_pair),
        BinaryOp::IntegerDivide => arithmetic(left, right, integer_divide_pair),
        BinaryOp::Modulo => arithmetic(left, right, modulo_pair),

        BinaryOp::Range => range(left, right),
        BinaryOp::StringConcat => {
            let l = string_operand(&left)?;
            let r = string_operand(&right)?;
            Ok(Value::from_string(format!("{}{}", l, r)))
        }

        BinaryOp::Union => union(left, right),
        BinaryOp::Intersect => {
            let lists = vec![node_operand(&left)?, node_operand(&right)?];
            Ok(Value::from_nodes(intersect_node_lists(lists)))
        }
    }
}

pub fn unary<'a, N: TreeNode<'a> + 'a>(
    op: UnaryOp,
    operand: Value<N>,
) -> Result<Value<N>, EngineError> {
    let Some(atom) = atomized_singleton(&operand)? else {
        return Ok(Value::empty());
    };
    let value = match (op, atom) {
        (UnaryOp::Plus, a) if a.is_numeric() => a,
        (UnaryOp::Minus, AtomicValue::Integer(i)) => AtomicValue::Integer(-i),
        (UnaryOp::Minus, AtomicValue::Decimal(d)) => AtomicValue::Decimal(-d),
        (UnaryOp::Minus, AtomicValue::Float(v)) => AtomicValue::Float(-v),
        (UnaryOp::Minus, AtomicValue::Double(d)) => AtomicValue::Double(-d),
        (_, AtomicValue::UntypedAtomic(s)) => {
            let d: f64 = s.trim().parse().map_err(|_| {
                EngineError::new(ErrorKind::MalformedNumber { literal: s.clone() })
            })?;
            AtomicValue::Double(if op == UnaryOp::Minus { -d } else { d })
        }
        (_, other) => {
            return Err(EngineError::type_error("a numeric value", other.type_name()));
        }
    };
    Ok(Value::from_atomic(value))
}

/// General comparison: existential over the atomized operands.
fn compare<'a, N, F>(
    left: Value<N>,
    right: Value<N>,
    collation: Collation,
    predicate: F,
) -> Result<Value<N>, EngineError>
where
    N: TreeNode<'a> + 'a,
    F: Fn(Ordering) -> bool,
{
    let left_atoms = left.atomize()?;
    let right_atoms = right.atomize()?;

    for l in left_atoms.items() {
        let Item::Atomic(a) = l else { continue };
        for r in right_atoms.items() {
            let Item::Atomic(b) = r else { continue };
            if let Some(ord) = compare_atomics(a, b, collation) {
                if predicate(ord) {
                    return Ok(Value::from_bool(true));
                }
            }
        }
    }
    Ok(Value::from_bool(false))
}

/// Orders two atomics where the value algebra defines an order; strings go
/// through the collation, untyped values lean numeric when the other side
/// is numeric.
pub fn compare_atomics(
    a: &AtomicValue,
    b: &AtomicValue,
    collation: Collation,
) -> Option<Ordering> {
    use AtomicValue::*;
    match (a, b) {
        (String(x), String(y))
        | (String(x), UntypedAtomic(y))
        | (UntypedAtomic(x), String(y))
        | (UntypedAtomic(x), UntypedAtomic(y)) => Some(collation.compare(x, y)),

        (UntypedAtomic(_), other) if other.is_numeric() => promoted_ordering(a, b),
        (other, UntypedAtomic(_)) if other.is_numeric() => promoted_ordering(a, b),

        (Date(x), Date(y))
        | (DateTime(x), DateTime(y))
        | (Time(x), Time(y))
        | (Duration(x), Duration(y)) => Some(x.cmp(y)),

        _ => a.partial_cmp(b),
    }
}

fn promoted_ordering(a: &AtomicValue, b: &AtomicValue) -> Option<Ordering> {
    match AtomicValue::promote_pair(a, b).ok()? {
        NumericPair::Integer(x, y) => Some(x.cmp(&y)),
        NumericPair::Decimal(x, y) => x.partial_cmp(&y),
        NumericPair::Float(x, y) => x.partial_cmp(&y),
        NumericPair::Double(x, y) => x.partial_cmp(&y),
    }
}

fn arithmetic<'a, N, F>(
    left: Value<N>,
    right: Value<N>,
    apply: F,
) -> Result<Value<N>, EngineError>
where
    N: TreeNode<'a> + 'a,
    F: Fn(NumericPair) -> Result<AtomicValue, EngineError>,
{
    let Some(l) = atomized_singleton(&left)? else {
        return Ok(Value::empty());
    };
    let Some(r) = atomized_singleton(&right)? else {
        return Ok(Value::empty());
    };
    let pair = AtomicValue::promote_pair(&l, &r)?;
    Ok(Value::from_atomic(apply(pair)?))
}

fn add_pair(pair: NumericPair) -> Result<AtomicValue, EngineError> {
    Ok(match pair {
        // i64 overflow widens to double
        NumericPair::Integer(a, b) => match a.checked_add(b) {
            Some(v) => AtomicValue::Integer(v),
            None => AtomicValue::Double(a as f64 + b as f64),
        },
        NumericPair::Decimal(a, b) => AtomicValue::Decimal(a + b),
        NumericPair::Float(a, b) => AtomicValue::Float(a + b),
        NumericPair::Double(a, b) => AtomicValue::Double(a + b),
    })
}

fn subtract_pair(pair: NumericPair) -> Result<AtomicValue, EngineError> {
    Ok(match pair {
        NumericPair::Integer(a, b) => match a.checked_sub(b) {
            Some(v) => AtomicValue::Integer(v),
            None => AtomicValue::Double(a as f64 - b as f64),
        },
        NumericPair::Decimal(a, b) => AtomicValue::Decimal(a - b),
        NumericPair::Float(a, b) => AtomicValue::Float(a - b),
        NumericPair::Double(a, b) => AtomicValue::Double(a - b),
    })
}

fn multiply_pair(pair: NumericPair) -> Result<AtomicValue, EngineError> {
    Ok(match pair {
        NumericPair::Integer(a, b) => match a.checked_mul(b) {
            Some(v) => AtomicValue::Integer(v),
            None => AtomicValue::Double(a as f64 * b as f64),
        },
        NumericPair::Decimal(a, b) => AtomicValue::Decimal(a * b),
        NumericPair::Float(a, b) => AtomicValue::Float(a * b),
        NumericPair::Double(a, b) => AtomicValue::Double(a * b),
    })
}

/// `div`: exact division; two integers produce a decimal.
fn divide_pair(pair: NumericPair) -> Result<AtomicValue, EngineError> {
    Ok(match pair {
        NumericPair::Integer(a, b) => {
            if b == 0 {
                return Err(EngineError::new(ErrorKind::DivisionByZero));
            }
            AtomicValue::Decimal(Decimal::from(a) / Decimal::from(b))
        }
        NumericPair::Decimal(a, b) => {
            if b.is_zero() {
                return Err(EngineError::new(ErrorKind::DivisionByZero));
            }
            AtomicValue::Decimal(a / b)
        }
        NumericPair::Float(a, b) => AtomicValue::Float(a / b),
        NumericPair::Double(a, b) => AtomicValue::Double(a / b),
    })
}

/// `idiv`: truncating integer division, whatever the operand types.
fn integer_divide_pair(pair: NumericPair) -> Result<AtomicValue, EngineError> {
    let result = match pair {
        NumericPair::Integer(a, b) => {
            if b == 0 {
                return Err(EngineError::new(ErrorKind::DivisionByZero));
            }
            a / b
        }
        NumericPair::Decimal(a, b) => {
            if b.is_zero() {
                return Err(EngineError::new(ErrorKind::DivisionByZero));
            }
            (a / b).trunc().to_i64().ok_or_else(|| {
                EngineError::new(ErrorKind::UnsupportedConversion {
                    from: "xs:decimal".to_string(),
                    to: "xs:integer".to_string(),
                })
            })?
        }
        NumericPair::Float(a, b) => {
            if b == 0.0 {
                return Err(EngineError::new(ErrorKind::DivisionByZero));
            }
            truncate_to_integer((a / b) as f64)?
        }
        NumericPair::Double(a, b) => {
            if b == 0.0 {
                return Err(EngineError::new(ErrorKind::DivisionByZero));
            }
            truncate_to_integer(a / b)?
        }
    };
    Ok(AtomicValue::Integer(result))
}

fn truncate_to_integer(d: f64) -> Result<i64, EngineError> {
    if !d.is_finite() {
        return Err(EngineError::new(ErrorKind::UnsupportedConversion {
            from: "xs:double".to_string(),
            to: "xs:integer".to_string(),
        }));
    }
    Ok(d.trunc() as i64)
}

fn modulo_pair(pair: NumericPair) -> Result<AtomicValue, EngineError> {
    Ok(match pair {
        NumericPair::Integer(a, b) => {
            if b == 0 {
                return Err(EngineError::new(ErrorKind::DivisionByZero));
            }
            AtomicValue::Integer(a % b)
        }
        NumericPair::Decimal(a, b) => {
            if b.is_zero() {
                return Err(EngineError::new(ErrorKind::DivisionByZero));
            }
            AtomicValue::Decimal(a % b)
        }
        NumericPair::Float(a, b) => AtomicValue::Float(a % b),
        NumericPair::Double(a, b) => AtomicValue::Double(a % b),
    })
}

fn range<'a, N: TreeNode<'a> + 'a>(
    start: Value<N>,
    end: Value<N>,
) -> Result<Value<N>, EngineError> {
    let (Some(s), Some(e)) = (atomized_singleton(&start)?, atomized_singleton(&end)?) else {
        return Ok(Value::empty());
    };
    let s = require_integer(&s)?;
    let e = require_integer(&e)?;
    if s > e {
        return Ok(Value::empty());
    }
    Ok(Value::from_items(
        (s..=e).map(|i| Item::Atomic(AtomicValue::Integer(i))).collect(),
    ))
}

fn union<'a, N: TreeNode<'a> + 'a>(
    left: Value<N>,
    right: Value<N>,
) -> Result<Value<N>, EngineError> {
    let mut nodes = node_operand(&left)?;
    nodes.extend(node_operand(&right)?);
    nodes.sort();
    nodes.dedup();
    Ok(Value::from_nodes(nodes))
}

/// The operand of a set operator must contain only nodes.
fn node_operand<'a, N: TreeNode<'a> + 'a>(value: &Value<N>) -> Result<Vec<N>, EngineError> {
    let mut nodes = Vec::with_capacity(value.len());
    for item in value.items() {
        match item {
            Item::Node(n) => nodes.push(*n),
            other => {
                return Err(EngineError::type_error("a node sequence", other.type_name()));
            }
        }
    }
    Ok(nodes)
}

fn string_operand<'a, N: TreeNode<'a> + 'a>(value: &Value<N>) -> Result<String, EngineError> {
    Ok(match atomized_singleton(value)? {
        Some(atom) => atom.to_string_value(),
        None => String::new(),
    })
}

fn require_integer(atom: &AtomicValue) -> Result<i64, EngineError> {
    atom.to_integer().ok_or_else(|| {
        EngineError::new(ErrorKind::InvalidIndex {
            actual: atom.to_string_value(),
        })
    })
}

/// Atomizes an operand down to at most one atomic value.
pub fn atomized_singleton<'a, N: TreeNode<'a> + 'a>(
    value: &Value<N>,
) -> Result<Option<AtomicValue>, EngineError> {
    let atoms = value.atomize()?;
    match atoms.len() {
        0 => Ok(None),
        1 => Ok(atoms.items()[0].as_atomic().cloned()),
        n => Err(EngineError::new(ErrorKind::MultipleItems { count: n })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type V = Value<sylva_tree::tests::MockNode<'static>>;

    fn eval(op: BinaryOp, l: V, r: V) -> Result<V, EngineError> {
        binary(op, l, r, Collation::Codepoint)
    }

    #[test]
    fn integer_arithmetic_stays_integer() {
        let result = eval(BinaryOp::Add, V::from_integer(2), V::from_integer(3)).unwrap();
        assert_eq!(
            result.items()[0].as_atomic(),
            Some(&AtomicValue::Integer(5))
        );
    }

    #[test]
    fn integer_division_yields_decimal() {
        let result = eval(BinaryOp::Divide, V::from_integer(10), V::from_integer(4)).unwrap();
        assert_eq!(
            result.items()[0].as_atomic(),
            Some(&AtomicValue::Decimal(Decimal::new(25, 1)))
        );
    }

    #[test]
    fn idiv_truncates() {
        let result =
            eval(BinaryOp::IntegerDivide, V::from_integer(10), V::from_integer(3)).unwrap();
        assert_eq!(
            result.items()[0].as_atomic(),
            Some(&AtomicValue::Integer(3))
        );

        let result =
            eval(BinaryOp::IntegerDivide, V::from_double(-7.5), V::from_integer(2)).unwrap();
        assert_eq!(
            result.items()[0].as_atomic(),
            Some(&AtomicValue::Integer(-3))
        );
    }

    #[test]
    fn division_by_zero() {
        let err =
            eval(BinaryOp::IntegerDivide, V::from_integer(1), V::from_integer(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);

        // Double division keeps IEEE semantics.
        let result = eval(BinaryOp::Divide, V::from_double(1.0), V::from_double(0.0)).unwrap();
        assert!(result.to_double().is_infinite());
    }

    #[test]
    fn mixed_promotion() {
        let result = eval(
            BinaryOp::Multiply,
            V::from_integer(2),
            V::from_double(1.5),
        )
        .unwrap();
        assert_eq!(
            result.items()[0].as_atomic(),
            Some(&AtomicValue::Double(3.0))
        );
    }

    #[test]
    fn empty_operand_yields_empty() {
        let result = eval(BinaryOp::Add, V::empty(), V::from_integer(1)).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn general_comparison_is_existential() {
        let seq = V::from_items(vec![
            Item::Atomic(AtomicValue::Integer(1)),
            Item::Atomic(AtomicValue::Integer(5)),
        ]);
        let result = eval(BinaryOp::Gt, seq.clone(), V::from_integer(3)).unwrap();
        assert!(result.effective_boolean_value().unwrap());

        let result = eval(BinaryOp::Gt, seq, V::from_integer(10)).unwrap();
        assert!(!result.effective_boolean_value().unwrap());
    }

    #[test]
    fn string_comparison_uses_collation() {
        let result = binary::<sylva_tree::tests::MockNode<'static>>(
            BinaryOp::Eq,
            V::from_string("Alpha"),
            V::from_string("alpha"),
            Collation::CaseBlind,
        )
        .unwrap();
        assert!(result.effective_boolean_value().unwrap());
    }

    #[test]
    fn range_op() {
        let result = eval(BinaryOp::Range, V::from_integer(2), V::from_integer(5)).unwrap();
        assert_eq!(result.len(), 4);
        let result = eval(BinaryOp::Range, V::from_integer(5), V::from_integer(2)).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn string_concat() {
        let result =
            eval(BinaryOp::StringConcat, V::from_string("ab"), V::from_integer(3)).unwrap();
        assert_eq!(result.to_string_value(), "ab3");
    }

    #[test]
    fn unary_minus_preserves_type() {
        let result = unary::<sylva_tree::tests::MockNode<'static>>(
            UnaryOp::Minus,
            V::from_integer(4),
        )
        .unwrap();
        assert_eq!(
            result.items()[0].as_atomic(),
            Some(&AtomicValue::Integer(-4))
        );
    }
}
