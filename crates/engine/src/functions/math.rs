//! The `math:` function namespace. Trigonometric functions work in radians.

use std::f64::consts::PI;

use sylva_tree::TreeNode;

use super::{Arity, arg_double, check_arity};
use crate::error::EngineError;
use crate::types::Value;

/// math:pi() - Returns an approximation of the mathematical constant.
pub fn math_pi<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("math:pi", args.len(), Arity::Exact(0))?;
    Ok(Value::from_double(PI))
}

/// math:sqrt($arg as xs:double?) as xs:double?
pub fn math_sqrt<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("math:sqrt", args.len(), Arity::Exact(1))?;
    if args[0].is_empty() {
        return Ok(Value::empty());
    }
    let x = arg_double("math:sqrt", 1, &args)?;
    Ok(Value::from_double(x.sqrt()))
}

/// math:pow($x as xs:double?, $y as xs:numeric) as xs:double?
pub fn math_pow<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("math:pow", args.len(), Arity::Exact(2))?;
    if args[0].is_empty() {
        return Ok(Value::empty());
    }
    let x = arg_double("math:pow", 1, &args)?;
    let y = arg_double("math:pow", 2, &args)?;
    Ok(Value::from_double(x.powf(y)))
}

/// math:exp($arg as xs:double?) as xs:double?
pub fn math_exp<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("math:exp", args.len(), Arity::Exact(1))?;
    if args[0].is_empty() {
        return Ok(Value::empty());
    }
    let x = arg_double("math:exp", 1, &args)?;
    Ok(Value::from_double(x.exp()))
}

/// math:log($arg as xs:double?) as xs:double? - natural logarithm.
pub fn math_log<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("math:log", args.len(), Arity::Exact(1))?;
    if args[0].is_empty() {
        return Ok(Value::empty());
    }
    let x = arg_double("math:log", 1, &args)?;
    Ok(Value::from_double(x.ln()))
}

/// math:log10($arg as xs:double?) as xs:double?
pub fn math_log10<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("math:log10", args.len(), Arity::Exact(1))?;
    if args[0].is_empty() {
        return Ok(Value::empty());
    }
    let x = arg_double("math:log10", 1, &args)?;
    Ok(Value::from_double(x.log10()))
}

/// math:sin($arg as xs:double?) as xs:double?
pub fn math_sin<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("math:sin", args.len(), Arity::Exact(1))?;
    if args[0].is_empty() {
        return Ok(Value::empty());
    }
    let x = arg_double("math:sin", 1, &args)?;
    Ok(Value::from_double(x.sin()))
}

/// math:cos($arg as xs:double?) as xs:double?
pub fn math_cos<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("math:cos", args.len(), Arity::Exact(1))?;
    if args[0].is_empty() {
        return Ok(Value::empty());
    }
    let x = arg_double("math:cos", 1, &args)?;
    Ok(Value::from_double(x.cos()))
}

/// math:tan($arg as xs:double?) as xs:double?
pub fn math_tan<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("math:tan", args.len(), Arity::Exact(1))?;
    if args[0].is_empty() {
        return Ok(Value::empty());
    }
    let x = arg_double("math:tan", 1, &args)?;
    Ok(Value::from_double(x.tan()))
}

/// math:atan2($y as xs:double, $x as xs:double) as xs:double
pub fn math_atan2<'a, N: TreeNode<'a> + 'a>(args: Vec<Value<N>>) -> Result<Value<N>, EngineError> {
    check_arity("math:atan2", args.len(), Arity::Exact(2))?;
    let y = arg_double("math:atan2", 1, &args)?;
    let x = arg_double("math:atan2", 2, &args)?;
    Ok(Value::from_double(y.atan2(x)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use sylva_tree::tests::MockNode;

    type V = Value<MockNode<'static>>;

    #[test]
    fn basics() {
        assert_eq!(
            math_sqrt(vec![V::from_double(9.0)]).unwrap().to_double(),
            3.0
        );
        assert_eq!(
            math_pow(vec![V::from_double(2.0), V::from_double(10.0)])
                .unwrap()
                .to_double(),
            1024.0
        );
        let pi = math_pi(Vec::<V>::new()).unwrap().to_double();
        assert!((pi - PI).abs() < 1e-12);
    }

    #[test]
    fn empty_input_propagates() {
        assert!(math_sqrt(vec![V::empty()]).unwrap().is_empty());
        assert!(math_log(vec![V::empty()]).unwrap().is_empty());
    }

    #[test]
    fn non_numeric_argument_is_typed() {
        let err = math_sqrt(vec![V::from_string("x")]).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::InvalidArgument { position: 1, .. }
        ));
    }
}
