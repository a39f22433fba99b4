//! Object builtin functions.

use serde_json::Value;

use super::check_args;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::helpers::type_name;

fn get_object<'a>(
    args: &'a [Value],
    name: &str,
) -> EvalResult<&'a serde_json::Map<String, Value>> {
    match args.first() {
        Some(Value::Object(obj)) => Ok(obj),
        Some(other) => Err(EvalError::Type(format!(
            "{}: argument must be an object, got {}",
            name,
            type_name(other)
        ))),
        None => Err(EvalError::Execution(format!("{}: missing argument", name))),
    }
}

/// Call an object function. Returns None if function not found.
pub fn call(name: &str, args: &[Value]) -> EvalResult<Option<Value>> {
    let result = match name {
        "KEYS" | "ATTRIBUTES" => {
            check_args(name, args, 1)?;
            let mut keys: Vec<&String> = get_object(args, name)?.keys().collect();
            keys.sort();
            Some(Value::Array(
                keys.into_iter().map(|k| Value::String(k.clone())).collect(),
            ))
        }

        "VALUES" => {
            check_args(name, args, 1)?;
            let obj = get_object(args, name)?;
            let mut entries: Vec<(&String, &Value)> = obj.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Some(Value::Array(
                entries.into_iter().map(|(_, v)| v.clone()).collect(),
            ))
        }

        "HAS" => {
            check_args(name, args, 2)?;
            let obj = get_object(args, name)?;
            let key = args[1].as_str().ok_or_else(|| {
                EvalError::Type("HAS: attribute name must be a string".to_string())
            })?;
            Some(Value::Bool(obj.contains_key(key)))
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
    fn test_keys_values() {
        let doc = json!({"b": 2, "a": 1});
        assert_eq!(call("KEYS", &[doc.clone()]).unwrap(), Some(json!(["a", "b"])));
        assert_eq!(call("VALUES", &[doc]).unwrap(), Some(json!([1, 2])));
        assert!(call("KEYS", &[json!([1])]).is_err());
    }

    #[test]
    fn test_has() {
        let doc = json!({"name": "Ann", "nick": null});
        assert_eq!(
            call("HAS", &[doc.clone(), json!("nick")]).unwrap(),
            Some(json!(true))
        );
        assert_eq!(call("HAS", &[doc, json!("age")]).unwrap(), Some(json!(false)));
    }
}
