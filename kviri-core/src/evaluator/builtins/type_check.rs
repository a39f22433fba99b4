//! Type checking and conversion builtin functions.

use serde_json::Value;

use super::check_args;
use crate::error::EvalResult;
use crate::evaluator::helpers::{to_bool, type_name};

/// Call a type checking function. Returns None if function not found.
pub fn call(name: &str, args: &[Value]) -> EvalResult<Option<Value>> {
    let result = match name {
        "IS_NULL" => {
            check_args(name, args, 1)?;
            Some(Value::Bool(args[0].is_null()))
        }

        "IS_BOOL" | "IS_BOOLEAN" => {
            check_args(name, args, 1)?;
            Some(Value::Bool(args[0].is_boolean()))
        }

        "IS_NUMBER" | "IS_NUMERIC" => {
            check_args(name, args, 1)?;
            Some(Value::Bool(args[0].is_number()))
        }

        "IS_STRING" => {
            check_args(name, args, 1)?;
            Some(Value::Bool(args[0].is_string()))
        }

        "IS_ARRAY" | "IS_LIST" => {
            check_args(name, args, 1)?;
            Some(Value::Bool(args[0].is_array()))
        }

        "IS_OBJECT" => {
            check_args(name, args, 1)?;
            Some(Value::Bool(args[0].is_object()))
        }

        "TYPENAME" | "TYPE_OF" => {
            check_args(name, args, 1)?;
            Some(Value::String(type_name(&args[0]).to_string()))
        }

        "TO_BOOL" | "TO_BOOLEAN" => {
            check_args(name, args, 1)?;
            Some(Value::Bool(to_bool(&args[0])))
        }

        "TO_NUMBER" => {
            check_args(name, args, 1)?;
            let n = match &args[0] {
                Value::Number(n) => Some(n.clone()),
                Value::Bool(b) => Some(serde_json::Number::from(i64::from(*b))),
                Value::String(s) => {
                    let s = s.trim();
                    s.parse::<i64>()
                        .ok()
                        .map(serde_json::Number::from)
                        .or_else(|| s.parse::<f64>().ok().and_then(serde_json::Number::from_f64))
                }
                Value::Null => Some(serde_json::Number::from(0)),
                _ => None,
            };
            Some(n.map(Value::Number).unwrap_or(Value::Null))
        }

        _ => None,
    };

    Ok(result)
}
