//! Common test utilities for kviri tests
//!
//! Provides shared fixtures for:
//! - In-memory people/number sources
//! - Plan directories on disk with their data files

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use serde_json::{json, Value};
use tempfile::TempDir;

pub fn people() -> Vec<Value> {
    vec![
        json!({"name": "Alice", "age": 27, "dept": "eng"}),
        json!({"name": "Bob", "age": 28, "dept": "eng"}),
        json!({"name": "Fred", "age": 19, "dept": "sales"}),
        json!({"name": "Gina", "age": 28, "dept": "sales"}),
    ]
}

pub fn numbers() -> (Vec<i64>, Vec<i64>) {
    (vec![1, 2, 3], vec![7, 8, 9])
}

/// A temp directory holding `people.json`, `people.csv` and `scores.json`.
pub fn data_dir() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");

    fs::write(
        dir.path().join("people.json"),
        serde_json::to_string_pretty(&people()).unwrap(),
    )
    .unwrap();

    fs::write(
        dir.path().join("people.csv"),
        "name,age,active\nAlice,27,true\nBob,28,false\nFred,19.5,true\n",
    )
    .unwrap();

    fs::write(
        dir.path().join("scores.json"),
        r#"[{"name": "Alice", "score": 90}, {"name": "Fred", "score": 75}]"#,
    )
    .unwrap();

    dir
}

/// Write `content` as a plan file inside `dir` and return its path.
pub fn write_plan(dir: &TempDir, file_name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(file_name);
    fs::write(&path, content).expect("Failed to write plan");
    path
}
