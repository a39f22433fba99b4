//! Kviri Core - LINQ-style queries over in-memory JSON values.
//!
//! Queries are built by chaining clause calls on a [`Query`] instead of
//! parsing a query string. Each call transforms the query's binding set:
//! FROM/JOIN expand it (cartesian product), LET extends it with a constant,
//! WHERE/ON filter it, ORDER BY sorts it, and SELECT or GROUP/BY materialize
//! rows from it.
//!
//! # Main Components
//!
//! - **Query**: the fluent builder and its name-then-value protocol
//! - **Binding / BindingSet**: the environments queries work on
//! - **Evaluator**: turns selectors, predicates and keys into values; either
//!   closures or the built-in expression language (lexer, parser, AST,
//!   interpreter, builtin functions)
//!
//! # Example
//!
//! ```rust
//! use kviri_core::Query;
//! use serde_json::json;
//!
//! let people = vec![
//!     json!({"name": "Alice", "age": 27}),
//!     json!({"name": "Bob", "age": 28}),
//!     json!({"name": "Fred", "age": 19}),
//! ];
//!
//! let mut q = Query::new();
//! q.from("p")?.in_(people)?
//!     .where_("p.age > 21")?
//!     .order_by(["p.age desc"])?
//!     .select(["p.name"])?;
//!
//! assert_eq!(q.to_value(), json!([["Bob"], ["Alice"]]));
//! # Ok::<(), kviri_core::KviriError>(())
//! ```

pub mod ast;
pub mod binding;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod query;

// Re-export main types for convenience
pub use binding::{Binding, BindingSet};
pub use error::{Clause, EvalError, EvalResult, KviriError, KviriResult};
pub use evaluator::{ClosureEvaluator, Evaluator, Expr, ExpressionEvaluator};
pub use query::{Direction, Group, Item, OrderSpec, Query, QueryLimits, ResultSet, Row};
