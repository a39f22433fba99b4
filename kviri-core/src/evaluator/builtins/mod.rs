//! Builtin functions callable from textual expressions.
//!
//! Names are case-insensitive. Each family returns `Ok(None)` for names it
//! does not know, so lookup falls through to the next one.

mod array;
mod math;
mod object;
mod string;
mod type_check;

use serde_json::Value;

use crate::error::{EvalError, EvalResult};

/// Container for builtin function implementations.
pub struct BuiltinFunctions;

impl BuiltinFunctions {
    /// Call a builtin function by name.
    pub fn call(name: &str, args: &[Value]) -> EvalResult<Value> {
        let upper_name = name.to_uppercase();

        if let Some(result) = string::call(&upper_name, args)? {
            return Ok(result);
        }

        if let Some(result) = array::call(&upper_name, args)? {
            return Ok(result);
        }

        if let Some(result) = math::call(&upper_name, args)? {
            return Ok(result);
        }

        if let Some(result) = type_check::call(&upper_name, args)? {
            return Ok(result);
        }

        if let Some(result) = object::call(&upper_name, args)? {
            return Ok(result);
        }

        Err(EvalError::Execution(format!("Unknown function: {}", name)))
    }
}

fn check_args(name: &str, args: &[Value], expected: usize) -> EvalResult<()> {
    if args.len() != expected {
        return Err(EvalError::Execution(format!(
            "{} requires {} argument(s), got {}",
            name,
            expected,
            args.len()
        )));
    }
    Ok(())
}
