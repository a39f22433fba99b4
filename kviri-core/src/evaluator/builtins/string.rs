//! String builtin functions.

use serde_json::Value;

use super::check_args;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::helpers::{to_text, type_name};

fn get_str<'a>(args: &'a [Value], index: usize, name: &str) -> EvalResult<&'a str> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(EvalError::Type(format!(
            "{}: argument {} must be a string, got {}",
            name,
            index + 1,
            type_name(other)
        ))),
        None => Err(EvalError::Execution(format!(
            "{}: missing argument {}",
            name,
            index + 1
        ))),
    }
}

/// Call a string function. Returns None if function not found.
pub fn call(name: &str, args: &[Value]) -> EvalResult<Option<Value>> {
    let result = match name {
        "UPPER" => {
            check_args(name, args, 1)?;
            Some(Value::String(get_str(args, 0, name)?.to_uppercase()))
        }

        "LOWER" => {
            check_args(name, args, 1)?;
            Some(Value::String(get_str(args, 0, name)?.to_lowercase()))
        }

        "TRIM" => {
            check_args(name, args, 1)?;
            Some(Value::String(get_str(args, 0, name)?.trim().to_string()))
        }

        "LENGTH" => {
            check_args(name, args, 1)?;
            let len = match &args[0] {
                Value::String(s) => s.chars().count(),
                Value::Array(arr) => arr.len(),
                Value::Object(obj) => obj.len(),
                Value::Null => 0,
                other => {
                    return Err(EvalError::Type(format!(
                        "LENGTH: unsupported argument type {}",
                        type_name(other)
                    )))
                }
            };
            Some(Value::Number(serde_json::Number::from(len)))
        }

        "CONCAT" => Some(Value::String(args.iter().map(to_text).collect())),

        "CONTAINS" => {
            check_args(name, args, 2)?;
            let haystack = get_str(args, 0, name)?;
            let needle = get_str(args, 1, name)?;
            Some(Value::Bool(haystack.contains(needle)))
        }

        "STARTS_WITH" => {
            check_args(name, args, 2)?;
            let s = get_str(args, 0, name)?;
            Some(Value::Bool(s.starts_with(get_str(args, 1, name)?)))
        }

        "ENDS_WITH" => {
            check_args(name, args, 2)?;
            let s = get_str(args, 0, name)?;
            Some(Value::Bool(s.ends_with(get_str(args, 1, name)?)))
        }

        "SUBSTRING" => {
            if !(2..=3).contains(&args.len()) {
                return Err(EvalError::Execution(
                    "SUBSTRING requires 2-3 arguments: string, start, length".to_string(),
                ));
            }
            let s = get_str(args, 0, name)?;
            let start = args[1].as_u64().unwrap_or(0) as usize;
            let chars = s.chars().skip(start);
            let result: String = match args.get(2).and_then(|v| v.as_u64()) {
                Some(len) => chars.take(len as usize).collect(),
                None => chars.collect(),
            };
            Some(Value::String(result))
        }

        "SPLIT" => {
            check_args(name, args, 2)?;
            let s = get_str(args, 0, name)?;
            let separator = get_str(args, 1, name)?;
            let parts: Vec<Value> = if separator.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(separator)
                    .map(|p| Value::String(p.to_string()))
                    .collect()
            };
            Some(Value::Array(parts))
        }

        "REPLACE" => {
            check_args(name, args, 3)?;
            let s = get_str(args, 0, name)?;
            let from = get_str(args, 1, name)?;
            let to = get_str(args, 2, name)?;
            Some(Value::String(s.replace(from, to)))
        }

        "TO_STRING" => {
            check_args(name, args, 1)?;
            Some(Value::String(to_text(&args[0])))
        }

        _ => None,
    };

    Ok(result)
}
