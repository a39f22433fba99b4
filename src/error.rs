use std::path::PathBuf;

use kviri_core::{EvalError, KviriError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid clause #{index}: {message}")]
    InvalidClause { index: usize, message: String },

    #[error("Unknown source '{0}'")]
    UnknownSource(String),

    #[error("Invalid source '{name}': {message}")]
    InvalidSource { name: String, message: String },

    #[error("Invalid expression `{expression}` in clause #{index}: {source}")]
    Expression {
        index: usize,
        expression: String,
        #[source]
        source: EvalError,
    },

    #[error("Query failed at clause #{index}: {source}")]
    Query {
        index: usize,
        #[source]
        source: KviriError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type PlanResult<T> = Result<T, PlanError>;

impl PlanError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PlanError::Io {
            path: path.into(),
            source,
        }
    }
}
