//! Value helpers shared by the interpreter, the builtins and the query engine.
//!
//! - get_field_value: read a dotted path out of a JSON value
//! - values_equal / compare_values: numeric-aware equality and a total order
//! - canonical_key: hashable encoding that agrees with `values_equal`
//! - evaluate_binary_op / evaluate_unary_op: operator semantics
//! - to_bool: truthiness

use std::cmp::Ordering;
use std::fmt::Write;

use regex::Regex;
use serde_json::{Number, Value};

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::error::{EvalError, EvalResult};

/// Extract a nested field value from a JSON value.
///
/// `field_path` is dot-separated (e.g. "address.city"). Numeric segments index
/// into arrays. Missing fields yield `Value::Null`.
#[inline]
pub fn get_field_value(value: &Value, field_path: &str) -> Value {
    let mut current = value;

    for part in field_path.split('.') {
        let next = match current {
            Value::Object(obj) => obj.get(part),
            Value::Array(arr) => part.parse::<usize>().ok().and_then(|i| arr.get(i)),
            _ => None,
        };
        match next {
            Some(val) => current = val,
            None => return Value::Null,
        }
    }

    current.clone()
}

/// Compare two JSON values for equality.
///
/// Numbers compare numerically (`1 == 1.0`), containers recursively.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => left == right,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    compare_numbers(a, b) == Ordering::Equal
}

/// Integral floats in this range convert to i128 exactly.
const I128_FLOAT_BOUND: f64 = 1.7e38;

enum Num {
    Int(i128),
    Float(f64),
}

fn num_parts(n: &Number) -> Num {
    if let Some(i) = n.as_i64() {
        Num::Int(i as i128)
    } else if let Some(u) = n.as_u64() {
        Num::Int(u as i128)
    } else {
        Num::Float(n.as_f64().unwrap_or(0.0))
    }
}

/// Exact comparison of an integer with a finite float, with no rounding of
/// the integer through f64.
fn compare_int_float(i: i128, f: f64) -> Ordering {
    let floor = f.floor();
    if floor < -I128_FLOAT_BOUND {
        return Ordering::Greater;
    }
    if floor >= I128_FLOAT_BOUND {
        return Ordering::Less;
    }
    match i.cmp(&(floor as i128)) {
        Ordering::Equal if f > floor => Ordering::Less,
        ord => ord,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    match (num_parts(a), num_parts(b)) {
        (Num::Int(x), Num::Int(y)) => x.cmp(&y),
        (Num::Float(x), Num::Float(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Num::Int(x), Num::Float(y)) => compare_int_float(x, y),
        (Num::Float(x), Num::Int(y)) => compare_int_float(y, x).reverse(),
    }
}

/// Compare two JSON values for ordering.
///
/// Null < Bool < Number < String < Array < Object. Arrays compare element by
/// element, objects by length then by their sorted entries.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b) {
                let ord = compare_values(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Object(a), Value::Object(b)) => {
            let ord = a.len().cmp(&b.len());
            if ord != Ordering::Equal {
                return ord;
            }
            let mut left: Vec<_> = a.iter().collect();
            let mut right: Vec<_> = b.iter().collect();
            left.sort_by(|x, y| x.0.cmp(y.0));
            right.sort_by(|x, y| x.0.cmp(y.0));
            for ((ka, va), (kb, vb)) in left.into_iter().zip(right) {
                let ord = ka.cmp(kb).then_with(|| compare_values(va, vb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Hashable encoding of a value. Two values have the same key exactly when
/// `values_equal` holds: integral floats are written as integers and object
/// entries are written in key order.
pub fn canonical_key(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => match num_parts(n) {
            Num::Int(i) => {
                let _ = write!(out, "{}", i);
            }
            Num::Float(f) if f.fract() == 0.0 && f.abs() < I128_FLOAT_BOUND => {
                let _ = write!(out, "{}", f as i128);
            }
            Num::Float(_) => {
                let _ = write!(out, "{}", n);
            }
        },
        Value::String(s) => {
            let _ = write!(out, "{:?}", s);
        }
        Value::Array(arr) => {
            out.push('[');
            for (i, item) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(obj) => {
            let mut entries: Vec<_> = obj.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{:?}:", k);
                write_canonical(v, out);
            }
            out.push('}');
        }
    }
}

/// Build a JSON number from an f64, rejecting NaN and infinities.
#[inline]
pub fn float_value(n: f64) -> EvalResult<Value> {
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| EvalError::Execution(format!("Non-finite number: {}", n)))
}

/// Safely compile a regex with size limits to prevent ReDoS attacks.
pub fn safe_regex(pattern: &str) -> Result<Regex, regex::Error> {
    if pattern.len() > 1000 {
        return Err(regex::Error::Syntax(
            "Pattern too long (max 1000 chars)".to_string(),
        ));
    }
    Regex::new(pattern)
}

/// Convert a SQL LIKE pattern (`%`, `_`) to an anchored regex.
fn like_to_regex(pattern: &str) -> String {
    let mut regex_pattern = String::from("(?s)^");
    for c in pattern.chars() {
        match c {
            '%' => regex_pattern.push_str(".*"),
            '_' => regex_pattern.push('.'),
            _ => regex_pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    regex_pattern.push('$');
    regex_pattern
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(arr) => arr.iter().any(|v| values_equal(needle, v)),
        Value::Object(obj) => needle.as_str().is_some_and(|k| obj.contains_key(k)),
        Value::String(s) => needle.as_str().is_some_and(|n| s.contains(n)),
        _ => false,
    }
}

fn arithmetic(
    left: &Value,
    right: &Value,
    name: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> EvalResult<Value> {
    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        if let Some(n) = int_op(a, b) {
            return Ok(Value::Number(Number::from(n)));
        }
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => float_value(float_op(a, b)),
        _ => Err(EvalError::Type(format!(
            "Cannot {} {} and {}",
            name,
            type_name(left),
            type_name(right)
        ))),
    }
}

/// Name of a value's JSON type, as reported in errors and by `TYPENAME`.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_zero(value: &Value) -> bool {
    value.as_f64() == Some(0.0)
}

/// Evaluate a binary operation on two already evaluated operands.
///
/// `AND`, `OR` and `??` are short-circuited by the interpreter; the versions
/// here are used when both sides are already known.
pub fn evaluate_binary_op(left: &Value, op: BinaryOperator, right: &Value) -> EvalResult<Value> {
    match op {
        BinaryOperator::Equal => Ok(Value::Bool(values_equal(left, right))),
        BinaryOperator::NotEqual => Ok(Value::Bool(!values_equal(left, right))),

        BinaryOperator::LessThan => Ok(Value::Bool(compare_values(left, right) == Ordering::Less)),
        BinaryOperator::LessThanOrEqual => Ok(Value::Bool(
            compare_values(left, right) != Ordering::Greater,
        )),
        BinaryOperator::GreaterThan => Ok(Value::Bool(
            compare_values(left, right) == Ordering::Greater,
        )),
        BinaryOperator::GreaterThanOrEqual => {
            Ok(Value::Bool(compare_values(left, right) != Ordering::Less))
        }

        BinaryOperator::In => Ok(Value::Bool(contains(right, left))),
        BinaryOperator::NotIn => Ok(Value::Bool(!contains(right, left))),

        BinaryOperator::Like | BinaryOperator::NotLike => {
            let s = left.as_str().unwrap_or("");
            let pattern = right.as_str().unwrap_or("");
            let re = safe_regex(&like_to_regex(pattern))
                .map_err(|e| EvalError::Execution(format!("Invalid LIKE pattern: {}", e)))?;
            let is_match = re.is_match(s);
            Ok(Value::Bool(is_match != matches!(op, BinaryOperator::NotLike)))
        }

        BinaryOperator::RegEx | BinaryOperator::NotRegEx => {
            let s = left.as_str().unwrap_or("");
            let pattern = right.as_str().unwrap_or("");
            let re = safe_regex(pattern)
                .map_err(|e| EvalError::Execution(format!("Invalid regex: {}", e)))?;
            let is_match = re.is_match(s);
            Ok(Value::Bool(is_match != matches!(op, BinaryOperator::NotRegEx)))
        }

        BinaryOperator::And => Ok(Value::Bool(to_bool(left) && to_bool(right))),
        BinaryOperator::Or => Ok(Value::Bool(to_bool(left) || to_bool(right))),
        BinaryOperator::NullCoalesce => {
            if left.is_null() {
                Ok(right.clone())
            } else {
                Ok(left.clone())
            }
        }

        BinaryOperator::Add => match (left, right) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            (Value::Array(a), Value::Array(b)) => {
                Ok(Value::Array(a.iter().chain(b).cloned().collect()))
            }
            _ => arithmetic(left, right, "add", i64::checked_add, |a, b| a + b),
        },
        BinaryOperator::Subtract => {
            arithmetic(left, right, "subtract", i64::checked_sub, |a, b| a - b)
        }
        BinaryOperator::Multiply => {
            arithmetic(left, right, "multiply", i64::checked_mul, |a, b| a * b)
        }
        BinaryOperator::Divide => {
            if is_zero(right) {
                return Err(EvalError::Execution("Division by zero".to_string()));
            }
            // exact integer quotients stay integers
            arithmetic(
                left,
                right,
                "divide",
                |a, b| {
                    if a.checked_rem(b)? == 0 {
                        a.checked_div(b)
                    } else {
                        None
                    }
                },
                |a, b| a / b,
            )
        }
        BinaryOperator::Modulus => {
            if is_zero(right) {
                return Err(EvalError::Execution("Modulo by zero".to_string()));
            }
            arithmetic(left, right, "take modulo of", i64::checked_rem, |a, b| a % b)
        }
    }
}

/// Evaluate a unary operation on a value.
pub fn evaluate_unary_op(op: UnaryOperator, operand: &Value) -> EvalResult<Value> {
    match op {
        UnaryOperator::Not => Ok(Value::Bool(!to_bool(operand))),
        UnaryOperator::Negate => {
            if let Some(n) = operand.as_i64().and_then(i64::checked_neg) {
                return Ok(Value::Number(Number::from(n)));
            }
            match operand.as_f64() {
                Some(n) => float_value(-n),
                None => Err(EvalError::Type(format!(
                    "Cannot negate {}",
                    type_name(operand)
                ))),
            }
        }
    }
}

/// Render a value as text: strings as is, null as empty, everything else as JSON.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

/// Convert a JSON value to boolean.
///
/// `false`, `null`, `0`, `""`, `[]` and `{}` are false, everything else true.
#[inline]
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
