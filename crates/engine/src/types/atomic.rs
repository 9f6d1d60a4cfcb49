use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{EngineError, ErrorKind};

#[derive(Debug, Clone)]
pub enum AtomicValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    Float(f32),
    Double(f64),
    Date(String),
    DateTime(String),
    Time(String),
    Duration(String),
    QName {
        prefix: Option<String>,
        local: String,
        namespace: Option<String>,
    },
    UntypedAtomic(String),
}

/// The widest numeric type participating in an operation. Promotion walks
/// integer -> decimal -> float -> double.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NumericKind {
    Integer,
    Decimal,
    Float,
    Double,
}

/// A pair of numerics promoted to their common widest type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericPair {
    Integer(i64, i64),
    Decimal(Decimal, Decimal),
    Float(f32, f32),
    Double(f64, f64),
}

impl AtomicValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            AtomicValue::String(_) => "xs:string",
            AtomicValue::Boolean(_) => "xs:boolean",
            AtomicValue::Integer(_) => "xs:integer",
            AtomicValue::Decimal(_) => "xs:decimal",
            AtomicValue::Float(_) => "xs:float",
            AtomicValue::Double(_) => "xs:double",
            AtomicValue::Date(_) => "xs:date",
            AtomicValue::DateTime(_) => "xs:dateTime",
            AtomicValue::Time(_) => "xs:time",
            AtomicValue::Duration(_) => "xs:duration",
            AtomicValue::QName { .. } => "xs:QName",
            AtomicValue::UntypedAtomic(_) => "xs:untypedAtomic",
        }
    }

    /// The canonical lexical form of the value's declared type. Distinct
    /// from atomization: no node access happens here.
    pub fn to_string_value(&self) -> String {
        match self {
            AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => s.clone(),
            AtomicValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            AtomicValue::Integer(i) => i.to_string(),
            AtomicValue::Decimal(d) => d.to_string(),
            AtomicValue::Float(v) => format_float(*v as f64),
            AtomicValue::Double(d) => format_float(*d),
            AtomicValue::Date(s)
            | AtomicValue::DateTime(s)
            | AtomicValue::Time(s)
            | AtomicValue::Duration(s) => s.clone(),
            AtomicValue::QName { prefix, local, .. } => match prefix {
                Some(p) => format!("{}:{}", p, local),
                None => local.clone(),
            },
        }
    }

    pub fn to_double(&self) -> f64 {
        match self {
            AtomicValue::Double(d) => *d,
            AtomicValue::Float(v) => *v as f64,
            AtomicValue::Integer(i) => *i as f64,
            AtomicValue::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
            AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => {
                s.trim().parse().unwrap_or(f64::NAN)
            }
            AtomicValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            _ => f64::NAN,
        }
    }

    pub fn to_integer(&self) -> Option<i64> {
        match self {
            AtomicValue::Integer(i) => Some(*i),
            AtomicValue::Double(d) => {
                if d.is_finite() {
                    Some(d.trunc() as i64)
                } else {
                    None
                }
            }
            AtomicValue::Float(v) => {
                if v.is_finite() {
                    Some(v.trunc() as i64)
                } else {
                    None
                }
            }
            AtomicValue::Decimal(d) => d.trunc().to_i64(),
            AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => s.trim().parse().ok(),
            AtomicValue::Boolean(b) => Some(if *b { 1 } else { 0 }),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            AtomicValue::Integer(_)
                | AtomicValue::Decimal(_)
                | AtomicValue::Float(_)
                | AtomicValue::Double(_)
        )
    }

    pub fn numeric_kind(&self) -> Option<NumericKind> {
        match self {
            AtomicValue::Integer(_) => Some(NumericKind::Integer),
            AtomicValue::Decimal(_) => Some(NumericKind::Decimal),
            AtomicValue::Float(_) => Some(NumericKind::Float),
            AtomicValue::Double(_) => Some(NumericKind::Double),
            _ => None,
        }
    }

    /// Promotes two values to their common numeric type. Untyped atomics
    /// convert to double first; a non-numeric participant is a type error.
    pub fn promote_pair(left: &AtomicValue, right: &AtomicValue) -> Result<NumericPair, EngineError> {
        let l = left.as_numeric()?;
        let r = right.as_numeric()?;
        let kind = l.numeric_kind().unwrap_or(NumericKind::Double).max(
            r.numeric_kind().unwrap_or(NumericKind::Double),
        );
        Ok(match kind {
            NumericKind::Integer => match (&l, &r) {
                (AtomicValue::Integer(a), AtomicValue::Integer(b)) => NumericPair::Integer(*a, *b),
                _ => NumericPair::Double(l.to_double(), r.to_double()),
            },
            NumericKind::Decimal => NumericPair::Decimal(l.as_decimal()?, r.as_decimal()?),
            NumericKind::Float => {
                NumericPair::Float(l.to_double() as f32, r.to_double() as f32)
            }
            NumericKind::Double => NumericPair::Double(l.to_double(), r.to_double()),
        })
    }

    fn as_numeric(&self) -> Result<AtomicValue, EngineError> {
        match self {
            v if v.is_numeric() => Ok(v.clone()),
            AtomicValue::UntypedAtomic(s) => {
                let parsed: f64 = s.trim().parse().map_err(|_| {
                    EngineError::new(ErrorKind::MalformedNumber {
                        literal: s.clone(),
                    })
                })?;
                Ok(AtomicValue::Double(parsed))
            }
            other => Err(EngineError::type_error("a numeric value", other.type_name())),
        }
    }

    fn as_decimal(&self) -> Result<Decimal, EngineError> {
        match self {
            AtomicValue::Decimal(d) => Ok(*d),
            AtomicValue::Integer(i) => Ok(Decimal::from(*i)),
            AtomicValue::Double(d) => Decimal::from_f64(*d).ok_or_else(|| {
                EngineError::new(ErrorKind::UnsupportedConversion {
                    from: "xs:double".to_string(),
                    to: "xs:decimal".to_string(),
                })
            }),
            AtomicValue::Float(v) => Decimal::from_f32(*v).ok_or_else(|| {
                EngineError::new(ErrorKind::UnsupportedConversion {
                    from: "xs:float".to_string(),
                    to: "xs:decimal".to_string(),
                })
            }),
            other => Err(EngineError::type_error("xs:decimal", other.type_name())),
        }
    }
}

fn format_float(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        if d > 0.0 { "INF" } else { "-INF" }.to_string()
    } else if d == 0.0 && d.is_sign_negative() {
        "-0".to_string()
    } else {
        d.to_string()
    }
}

impl PartialEq for AtomicValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AtomicValue::String(a), AtomicValue::String(b)) => a == b,
            (AtomicValue::Boolean(a), AtomicValue::Boolean(b)) => a == b,
            (AtomicValue::QName { local: l1, namespace: n1, .. },
             AtomicValue::QName { local: l2, namespace: n2, .. }) => l1 == l2 && n1 == n2,
            (AtomicValue::UntypedAtomic(a), AtomicValue::UntypedAtomic(b)) => a == b,
            (AtomicValue::UntypedAtomic(a), AtomicValue::String(b))
            | (AtomicValue::String(b), AtomicValue::UntypedAtomic(a)) => a == b,
            (AtomicValue::Date(a), AtomicValue::Date(b))
            | (AtomicValue::DateTime(a), AtomicValue::DateTime(b))
            | (AtomicValue::Time(a), AtomicValue::Time(b))
            | (AtomicValue::Duration(a), AtomicValue::Duration(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => {
                match AtomicValue::promote_pair(a, b) {
                    Ok(NumericPair::Integer(x, y)) => x == y,
                    Ok(NumericPair::Decimal(x, y)) => x == y,
                    Ok(NumericPair::Float(x, y)) => x == y || (x.is_nan() && y.is_nan()),
                    Ok(NumericPair::Double(x, y)) => x == y || (x.is_nan() && y.is_nan()),
                    Err(_) => false,
                }
            }
            _ => false,
        }
    }
}

impl Eq for AtomicValue {}

impl Hash for AtomicValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Numerics hash through their double form so that 5 and 5.0 agree,
        // matching the cross-type equality above.
        match self {
            AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            AtomicValue::Boolean(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            AtomicValue::Integer(_)
            | AtomicValue::Decimal(_)
            | AtomicValue::Float(_)
            | AtomicValue::Double(_) => {
                2u8.hash(state);
                self.to_double().to_bits().hash(state);
            }
            AtomicValue::Date(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            AtomicValue::DateTime(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            AtomicValue::Time(s) => {
                5u8.hash(state);
                s.hash(state);
            }
            AtomicValue::Duration(s) => {
                6u8.hash(state);
                s.hash(state);
            }
            AtomicValue::QName { local, namespace, .. } => {
                7u8.hash(state);
                local.hash(state);
                namespace.hash(state);
            }
        }
    }
}

impl PartialOrd for AtomicValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (AtomicValue::String(a), AtomicValue::String(b)) => a.partial_cmp(b),
            (AtomicValue::Boolean(a), AtomicValue::Boolean(b)) => a.partial_cmp(b),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                match AtomicValue::promote_pair(a, b).ok()? {
                    NumericPair::Integer(x, y) => x.partial_cmp(&y),
                    NumericPair::Decimal(x, y) => x.partial_cmp(&y),
                    NumericPair::Float(x, y) => x.partial_cmp(&y),
                    NumericPair::Double(x, y) => x.partial_cmp(&y),
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for AtomicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_value())
    }
}

impl From<String> for AtomicValue {
    fn from(s: String) -> Self {
        AtomicValue::String(s)
    }
}

impl From<&str> for AtomicValue {
    fn from(s: &str) -> Self {
        AtomicValue::String(s.to_string())
    }
}

impl From<bool> for AtomicValue {
    fn from(b: bool) -> Self {
        AtomicValue::Boolean(b)
    }
}

impl From<i64> for AtomicValue {
    fn from(i: i64) -> Self {
        AtomicValue::Integer(i)
    }
}

impl From<f64> for AtomicValue {
    fn from(d: f64) -> Self {
        AtomicValue::Double(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_strings() {
        assert_eq!(AtomicValue::Boolean(true).to_string_value(), "true");
        assert_eq!(AtomicValue::Integer(42).to_string_value(), "42");
        assert_eq!(AtomicValue::Double(f64::NAN).to_string_value(), "NaN");
        assert_eq!(AtomicValue::Double(f64::INFINITY).to_string_value(), "INF");
        assert_eq!(AtomicValue::Double(-0.0).to_string_value(), "-0");
    }

    #[test]
    fn promotion_ladder() {
        let pair = AtomicValue::promote_pair(&AtomicValue::Integer(1), &AtomicValue::Integer(2))
            .unwrap();
        assert_eq!(pair, NumericPair::Integer(1, 2));

        let pair = AtomicValue::promote_pair(
            &AtomicValue::Integer(1),
            &AtomicValue::Decimal(Decimal::new(25, 1)),
        )
        .unwrap();
        assert!(matches!(pair, NumericPair::Decimal(_, _)));

        let pair =
            AtomicValue::promote_pair(&AtomicValue::Decimal(Decimal::ONE), &AtomicValue::Float(2.0))
                .unwrap();
        assert!(matches!(pair, NumericPair::Float(_, _)));

        let pair =
            AtomicValue::promote_pair(&AtomicValue::Float(1.0), &AtomicValue::Double(2.0)).unwrap();
        assert!(matches!(pair, NumericPair::Double(_, _)));
    }

    #[test]
    fn untyped_promotes_to_double() {
        let pair = AtomicValue::promote_pair(
            &AtomicValue::UntypedAtomic("3.5".to_string()),
            &AtomicValue::Integer(2),
        )
        .unwrap();
        assert_eq!(pair, NumericPair::Double(3.5, 2.0));
    }

    #[test]
    fn malformed_untyped_is_an_error() {
        let err = AtomicValue::promote_pair(
            &AtomicValue::UntypedAtomic("not a number".to_string()),
            &AtomicValue::Integer(2),
        )
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MalformedNumber { .. }));
    }

    #[test]
    fn cross_type_numeric_equality() {
        assert_eq!(AtomicValue::Integer(5), AtomicValue::Double(5.0));
        assert_eq!(
            AtomicValue::Integer(5),
            AtomicValue::Decimal(Decimal::from(5))
        );
        assert_ne!(AtomicValue::Integer(5), AtomicValue::Integer(6));
    }

    #[test]
    fn comparison() {
        assert!(AtomicValue::Integer(5) < AtomicValue::Integer(10));
        assert!(AtomicValue::Integer(3) < AtomicValue::Double(3.5));
        assert!(
            AtomicValue::String("abc".to_string()) < AtomicValue::String("abd".to_string())
        );
    }
}
