use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::Value;
use crate::ast::{ExprArena, ExprId, Param, QName};

/// A function item: either a reference to a named library function with a
/// fixed arity, or an inline function closing over its creation scope.
#[derive(Clone)]
pub enum FunctionValue<N> {
    Named {
        name: QName,
        arity: usize,
    },
    Closure {
        params: Vec<Param>,
        body: ExprId,
        /// Total slot count of the invocation frame (parameters, captured
        /// values and body-local bindings), computed by fixup.
        frame_size: usize,
        /// Captured values paired with the frame slot they occupy when the
        /// closure is invoked.
        captured: Vec<(u32, Value<N>)>,
        /// The expression tree the body id points into. Closures stay valid
        /// even when invoked through a different compiled expression.
        arena: Arc<ExprArena>,
    },
}

impl<N: Clone> FunctionValue<N> {
    pub fn named(name: QName, arity: usize) -> Self {
        Self::Named { name, arity }
    }

    pub fn arity(&self) -> usize {
        match self {
            FunctionValue::Named { arity, .. } => *arity,
            FunctionValue::Closure { params, .. } => params.len(),
        }
    }

    pub fn name(&self) -> Option<&QName> {
        match self {
            FunctionValue::Named { name, .. } => Some(name),
            FunctionValue::Closure { .. } => None,
        }
    }
}

impl<N> fmt::Debug for FunctionValue<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionValue::Named { name, arity } => write!(f, "{}#{}", name, arity),
            FunctionValue::Closure { params, .. } => {
                write!(
                    f,
                    "function(${})",
                    params
                        .iter()
                        .map(|p| p.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", $")
                )
            }
        }
    }
}

impl<N> fmt::Display for FunctionValue<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl<N> PartialEq for FunctionValue<N> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                FunctionValue::Named { name: n1, arity: a1 },
                FunctionValue::Named { name: n2, arity: a2 },
            ) => n1 == n2 && a1 == a2,
            // Closures have no useful identity.
            _ => false,
        }
    }
}

impl<N> Eq for FunctionValue<N> {}

impl<N> Hash for FunctionValue<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            FunctionValue::Named { name, arity } => {
                name.hash(state);
                arity.hash(state);
            }
            FunctionValue::Closure { params, .. } => {
                params.len().hash(state);
            }
        }
    }
}
