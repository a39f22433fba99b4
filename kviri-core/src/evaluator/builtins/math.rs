//! Math builtin functions.

use serde_json::{Number, Value};

use super::check_args;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::helpers::float_value;

fn get_number(v: &Value, func_name: &str) -> EvalResult<f64> {
    v.as_f64()
        .ok_or_else(|| EvalError::Type(format!("{}: argument must be a number", func_name)))
}

/// Integral results come back as integers when they fit.
fn integral(f: f64) -> EvalResult<Value> {
    if f.is_finite() && f.abs() < 9.2e18 {
        Ok(Value::Number(Number::from(f as i64)))
    } else {
        float_value(f)
    }
}

/// Call a math function. Returns None if function not found.
pub fn call(name: &str, args: &[Value]) -> EvalResult<Option<Value>> {
    let result = match name {
        "ABS" => {
            check_args(name, args, 1)?;
            if let Some(i) = args[0].as_i64().and_then(i64::checked_abs) {
                return Ok(Some(Value::Number(Number::from(i))));
            }
            Some(float_value(get_number(&args[0], name)?.abs())?)
        }

        "FLOOR" => {
            check_args(name, args, 1)?;
            Some(integral(get_number(&args[0], name)?.floor())?)
        }

        "CEIL" | "CEILING" => {
            check_args(name, args, 1)?;
            Some(integral(get_number(&args[0], name)?.ceil())?)
        }

        "ROUND" => {
            if args.is_empty() || args.len() > 2 {
                return Err(EvalError::Execution(
                    "ROUND requires 1-2 arguments".to_string(),
                ));
            }
            let num = get_number(&args[0], name)?;
            match args.get(1).and_then(|v| v.as_i64()).unwrap_or(0) {
                0 => Some(integral(num.round())?),
                decimals => {
                    let multiplier = 10f64.powi(decimals.clamp(-15, 15) as i32);
                    Some(float_value((num * multiplier).round() / multiplier)?)
                }
            }
        }

        "SQRT" => {
            check_args(name, args, 1)?;
            let num = get_number(&args[0], name)?;
            if num < 0.0 {
                return Err(EvalError::Execution(
                    "SQRT: argument must be non-negative".to_string(),
                ));
            }
            Some(float_value(num.sqrt())?)
        }

        "POW" | "POWER" => {
            if args.len() != 2 {
                return Err(EvalError::Execution(
                    "POW requires 2 arguments: base, exponent".to_string(),
                ));
            }
            if let (Some(base), Some(exp)) = (args[0].as_i64(), args[1].as_u64()) {
                if let Some(n) = u32::try_from(exp).ok().and_then(|e| base.checked_pow(e)) {
                    return Ok(Some(Value::Number(Number::from(n))));
                }
            }
            let base = get_number(&args[0], name)?;
            let exp = get_number(&args[1], name)?;
            Some(float_value(base.powf(exp))?)
        }

        _ => None,
    };

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_abs() {
        assert_eq!(call("ABS", &[json!(-5)]).unwrap(), Some(json!(5)));
        assert_eq!(call("ABS", &[json!(-2.5)]).unwrap(), Some(json!(2.5)));
        assert!(call("ABS", &[json!("x")]).is_err());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(call("FLOOR", &[json!(3.7)]).unwrap(), Some(json!(3)));
        assert_eq!(call("CEIL", &[json!(3.2)]).unwrap(), Some(json!(4)));
        assert_eq!(call("ROUND", &[json!(2.5)]).unwrap(), Some(json!(3)));
        assert_eq!(
            call("ROUND", &[json!(3.14159), json!(2)]).unwrap(),
            Some(json!(3.14))
        );
    }

    #[test]
    fn test_sqrt_pow() {
        assert_eq!(call("SQRT", &[json!(16)]).unwrap(), Some(json!(4.0)));
        assert!(call("SQRT", &[json!(-1)]).is_err());
        assert_eq!(call("POW", &[json!(2), json!(10)]).unwrap(), Some(json!(1024)));
        assert_eq!(call("POW", &[json!(4), json!(0.5)]).unwrap(), Some(json!(2.0)));
    }

    #[test]
    fn test_argument_count() {
        assert!(call("FLOOR", &[]).is_err());
        assert!(call("POW", &[json!(2)]).is_err());
    }
}
