//! Array builtin functions.

use std::collections::HashSet;

use serde_json::{Number, Value};

use super::check_args;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::helpers::{canonical_key, compare_values, float_value, type_name};

fn get_array<'a>(args: &'a [Value], name: &str) -> EvalResult<&'a [Value]> {
    check_args(name, args, 1)?;
    match &args[0] {
        Value::Array(arr) => Ok(arr),
        other => Err(EvalError::Type(format!(
            "{}: argument must be an array, got {}",
            name,
            type_name(other)
        ))),
    }
}

/// Call an array function. Returns None if function not found.
pub fn call(name: &str, args: &[Value]) -> EvalResult<Option<Value>> {
    let result = match name {
        "FIRST" => Some(get_array(args, name)?.first().cloned().unwrap_or(Value::Null)),

        "LAST" => Some(get_array(args, name)?.last().cloned().unwrap_or(Value::Null)),

        "COUNT" => Some(Value::Number(Number::from(get_array(args, name)?.len()))),

        "SUM" => Some(sum(get_array(args, name)?)?),

        "AVG" | "AVERAGE" => {
            let values: Vec<f64> = get_array(args, name)?
                .iter()
                .filter_map(|v| v.as_f64())
                .collect();
            if values.is_empty() {
                return Ok(Some(Value::Null));
            }
            Some(float_value(values.iter().sum::<f64>() / values.len() as f64)?)
        }

        "MIN" => Some(
            get_array(args, name)?
                .iter()
                .filter(|v| !v.is_null())
                .min_by(|a, b| compare_values(a, b))
                .cloned()
                .unwrap_or(Value::Null),
        ),

        "MAX" => Some(
            get_array(args, name)?
                .iter()
                .filter(|v| !v.is_null())
                .max_by(|a, b| compare_values(a, b))
                .cloned()
                .unwrap_or(Value::Null),
        ),

        "UNIQUE" => {
            let mut seen = HashSet::new();
            let unique: Vec<Value> = get_array(args, name)?
                .iter()
                .filter(|item| seen.insert(canonical_key(item)))
                .cloned()
                .collect();
            Some(Value::Array(unique))
        }

        "SORTED" | "SORT" => {
            let mut sorted = get_array(args, name)?.to_vec();
            sorted.sort_by(compare_values);
            Some(Value::Array(sorted))
        }

        "REVERSE" => match args.first() {
            Some(Value::String(s)) if args.len() == 1 => Some(Value::String(s.chars().rev().collect())),
            _ => {
                let mut reversed = get_array(args, name)?.to_vec();
                reversed.reverse();
                Some(Value::Array(reversed))
            }
        },

        _ => None,
    };

    Ok(result)
}

/// Sum the numbers of an array, staying integral while every term is an integer.
fn sum(arr: &[Value]) -> EvalResult<Value> {
    let mut int_sum: Option<i64> = Some(0);
    let mut float_sum = 0.0;

    for n in arr.iter().filter_map(|v| v.as_number()) {
        int_sum = match (int_sum, n.as_i64()) {
            (Some(acc), Some(i)) => acc.checked_add(i),
            _ => None,
        };
        float_sum += n.as_f64().unwrap_or(0.0);
    }

    match int_sum {
        Some(total) => Ok(Value::Number(Number::from(total))),
        None => float_value(float_sum),
    }
}
