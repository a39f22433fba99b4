//! Data sources a plan can bind names to.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{PlanError, PlanResult};

/// Where the values of a `[sources.<name>]` table come from.
///
/// File paths are resolved against the directory of the plan file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSpec {
    /// A JSON file holding an array
    File(PathBuf),
    /// A CSV file with a header row; each record becomes an object
    Csv(PathBuf),
    /// Values written inline in the plan
    Values(Vec<Value>),
    /// Integers from `start` (inclusive) to `end` (exclusive)
    Range { start: i64, end: i64 },
}

impl SourceSpec {
    /// Read the source into memory. `max_len` bounds generated ranges.
    pub fn load(&self, name: &str, base_dir: &Path, max_len: usize) -> PlanResult<Vec<Value>> {
        let values = match self {
            SourceSpec::File(path) => load_json(name, &base_dir.join(path))?,
            SourceSpec::Csv(path) => load_csv(&base_dir.join(path))?,
            SourceSpec::Values(values) => values.clone(),
            SourceSpec::Range { start, end } => {
                let len = end.checked_sub(*start).unwrap_or(i64::MAX).max(0) as u64;
                if len > max_len as u64 {
                    return Err(PlanError::InvalidSource {
                        name: name.to_string(),
                        message: format!("range of {} values exceeds the limit of {}", len, max_len),
                    });
                }
                (*start..*end).map(Value::from).collect()
            }
        };

        tracing::debug!(source = name, values = values.len(), "loaded source");
        Ok(values)
    }

    pub fn describe(&self) -> String {
        match self {
            SourceSpec::File(path) => format!("json file {}", path.display()),
            SourceSpec::Csv(path) => format!("csv file {}", path.display()),
            SourceSpec::Values(values) => format!("{} inline values", values.len()),
            SourceSpec::Range { start, end } => format!("range {}..{}", start, end),
        }
    }
}

fn load_json(name: &str, path: &Path) -> PlanResult<Vec<Value>> {
    let content = fs::read_to_string(path).map_err(|e| PlanError::io(path, e))?;
    match serde_json::from_str(&content)? {
        Value::Array(values) => Ok(values),
        other => Err(PlanError::InvalidSource {
            name: name.to_string(),
            message: format!(
                "{} holds a JSON {}, expected an array",
                path.display(),
                json_type(&other)
            ),
        }),
    }
}

fn load_csv(path: &Path) -> PlanResult<Vec<Value>> {
    let file = fs::File::open(path).map_err(|e| PlanError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        let object: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(header, field)| (header.to_string(), typed_field(field)))
            .collect();
        values.push(Value::Object(object));
    }
    Ok(values)
}

/// Integers, then floats, then booleans; anything else stays a string.
pub fn typed_field(field: &str) -> Value {
    if let Ok(i) = field.parse::<i64>() {
        return Value::from(i);
    }
    if let Some(n) = field.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    match field {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(field.to_string()),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
