//! Error types for kviri-core.
//!
//! Two layers: [`EvalError`] is what an [`Evaluator`](crate::Evaluator) (and the
//! expression lexer/parser behind it) reports, [`KviriError`] is what the query
//! builder reports to its caller, with the failing clause attached.

use std::fmt;

use thiserror::Error;

/// The clause a builder call belongs to, used to label errors and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    From,
    In,
    Let,
    Be,
    Join,
    On,
    Where,
    OrderBy,
    Select,
    Distinct,
    Group,
    By,
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Clause::From => "FROM",
            Clause::In => "IN",
            Clause::Let => "LET",
            Clause::Be => "BE",
            Clause::Join => "JOIN",
            Clause::On => "ON",
            Clause::Where => "WHERE",
            Clause::OrderBy => "ORDER BY",
            Clause::Select => "SELECT",
            Clause::Distinct => "DISTINCT",
            Clause::Group => "GROUP",
            Clause::By => "BY",
        };
        f.write_str(name)
    }
}

/// Failure raised while evaluating a selector, predicate or ordering key.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unbound name: {0}")]
    UnboundName(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Not supported: {0}")]
    Unsupported(String),
}

/// Result type for expression evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Query builder error type
#[derive(Error, Debug)]
pub enum KviriError {
    /// Call sequencing violation (pending name protocol, missing SELECT, ...)
    #[error("Usage error in {clause}: {message}")]
    Usage { clause: Clause, message: String },

    /// A clause tried to bind a name that is already bound
    #[error("Name conflict in {clause}: '{name}' is already bound")]
    NameConflict { clause: Clause, name: String },

    /// The evaluator failed for one binding
    #[error("Evaluation error in {clause} for `{expression}` with {binding}: {source}")]
    Evaluation {
        clause: Clause,
        expression: String,
        binding: String,
        #[source]
        source: EvalError,
    },

    /// An expansion would exceed the configured binding limit
    #[error("Limit exceeded in {clause}: {requested} bindings > {max}")]
    LimitExceeded {
        clause: Clause,
        requested: usize,
        max: usize,
    },
}

impl KviriError {
    pub(crate) fn usage(clause: Clause, message: impl Into<String>) -> Self {
        KviriError::Usage {
            clause,
            message: message.into(),
        }
    }

    /// The clause that failed.
    pub fn clause(&self) -> Clause {
        match self {
            KviriError::Usage { clause, .. }
            | KviriError::NameConflict { clause, .. }
            | KviriError::Evaluation { clause, .. }
            | KviriError::LimitExceeded { clause, .. } => *clause,
        }
    }
}

/// Result type for query builder operations
pub type KviriResult<T> = Result<T, KviriError>;

impl serde::Serialize for KviriError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
