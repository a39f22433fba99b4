//! Tree-walking interpreter for parsed expressions.

use serde_json::{Number, Value};

use super::builtins::BuiltinFunctions;
use super::helpers::{evaluate_binary_op, evaluate_unary_op, to_bool, to_text, type_name};
use crate::ast::{BinaryOperator, Expression, TemplateStringPart};
use crate::binding::Binding;
use crate::error::{EvalError, EvalResult};

/// Largest array a range expression may produce.
const MAX_RANGE_LEN: i64 = 1_000_000;

/// Evaluate a parsed expression against one binding.
pub fn evaluate_expression(expr: &Expression, binding: &Binding) -> EvalResult<Value> {
    match expr {
        Expression::Variable(name) => binding.value(name).cloned(),

        Expression::Literal(value) => Ok(value.clone()),

        Expression::FieldAccess(base, field) => {
            let base = evaluate_expression(base, binding)?;
            Ok(base.get(field).cloned().unwrap_or(Value::Null))
        }

        Expression::OptionalFieldAccess(base, field) => {
            let base = evaluate_expression(base, binding)?;
            if base.is_null() {
                return Ok(Value::Null);
            }
            Ok(base.get(field).cloned().unwrap_or(Value::Null))
        }

        Expression::DynamicFieldAccess(base, key) => {
            let base = evaluate_expression(base, binding)?;
            let key = evaluate_expression(key, binding)?;
            match (&base, &key) {
                (Value::Object(obj), Value::String(k)) => {
                    Ok(obj.get(k).cloned().unwrap_or(Value::Null))
                }
                (Value::Array(_), Value::Number(_)) => index_array(&base, &key),
                _ => Ok(Value::Null),
            }
        }

        Expression::ArrayAccess(base, index) => {
            let base = evaluate_expression(base, binding)?;
            let index = evaluate_expression(index, binding)?;
            index_array(&base, &index)
        }

        Expression::BinaryOp { left, op, right } => {
            evaluate_binary(left, *op, right, binding)
        }

        Expression::UnaryOp { op, operand } => {
            let value = evaluate_expression(operand, binding)?;
            evaluate_unary_op(*op, &value)
        }

        Expression::Object(fields) => {
            let mut obj = serde_json::Map::new();
            for (key, value_expr) in fields {
                obj.insert(key.clone(), evaluate_expression(value_expr, binding)?);
            }
            Ok(Value::Object(obj))
        }

        Expression::Array(elements) => elements
            .iter()
            .map(|e| evaluate_expression(e, binding))
            .collect::<EvalResult<Vec<_>>>()
            .map(Value::Array),

        Expression::Range(start, end) => {
            let start = evaluate_expression(start, binding)?;
            let end = evaluate_expression(end, binding)?;
            evaluate_range(&start, &end)
        }

        Expression::FunctionCall { name, args } => {
            let args = args
                .iter()
                .map(|a| evaluate_expression(a, binding))
                .collect::<EvalResult<Vec<_>>>()?;
            BuiltinFunctions::call(name, &args)
        }

        Expression::Ternary {
            condition,
            true_expr,
            false_expr,
        } => {
            if to_bool(&evaluate_expression(condition, binding)?) {
                evaluate_expression(true_expr, binding)
            } else {
                evaluate_expression(false_expr, binding)
            }
        }

        Expression::TemplateString { parts } => {
            let mut out = String::new();
            for part in parts {
                match part {
                    TemplateStringPart::Literal(s) => out.push_str(s),
                    TemplateStringPart::Expression(e) => {
                        out.push_str(&to_text(&evaluate_expression(e, binding)?))
                    }
                }
            }
            Ok(Value::String(out))
        }
    }
}

/// `AND`, `OR` and `??` only evaluate their right side when needed.
fn evaluate_binary(
    left: &Expression,
    op: BinaryOperator,
    right: &Expression,
    binding: &Binding,
) -> EvalResult<Value> {
    let left = evaluate_expression(left, binding)?;

    match op {
        BinaryOperator::And if !to_bool(&left) => Ok(Value::Bool(false)),
        BinaryOperator::Or if to_bool(&left) => Ok(Value::Bool(true)),
        BinaryOperator::NullCoalesce if !left.is_null() => Ok(left),
        _ => {
            let right = evaluate_expression(right, binding)?;
            evaluate_binary_op(&left, op, &right)
        }
    }
}

fn index_array(base: &Value, index: &Value) -> EvalResult<Value> {
    let arr = match base {
        Value::Array(arr) => arr,
        Value::Null => return Ok(Value::Null),
        other => {
            return Err(EvalError::Type(format!(
                "Cannot index into {}",
                type_name(other)
            )))
        }
    };
    let idx = index
        .as_i64()
        .ok_or_else(|| EvalError::Type("Array index must be an integer".to_string()))?;
    let idx = if idx < 0 { arr.len() as i64 + idx } else { idx };

    Ok(usize::try_from(idx)
        .ok()
        .and_then(|i| arr.get(i))
        .cloned()
        .unwrap_or(Value::Null))
}

fn evaluate_range(start: &Value, end: &Value) -> EvalResult<Value> {
    match (start.as_i64(), end.as_i64()) {
        (Some(s), Some(e)) => {
            if e >= s && e.checked_sub(s).map_or(true, |len| len >= MAX_RANGE_LEN) {
                return Err(EvalError::Execution(format!(
                    "Range {}..{} is too large",
                    s, e
                )));
            }
            Ok(Value::Array(
                (s..=e).map(|i| Value::Number(Number::from(i))).collect(),
            ))
        }
        _ => Err(EvalError::Type(
            "Range bounds must be integers".to_string(),
        )),
    }
}
