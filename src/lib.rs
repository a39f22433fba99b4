//! Kviri - LINQ-style queries over JSON, CSV and inline data.
//!
//! The query engine lives in [`kviri_core`]; this crate adds what the `kviri`
//! command needs around it: TOML query [plans](plan), data [sources],
//! layered [configuration](config) and result [rendering](output).
//!
//! ```rust
//! use kviri::plan::Plan;
//! use kviri::QueryLimits;
//! use serde_json::json;
//!
//! let plan = Plan::from_toml_str(r#"
//!     [sources.l]
//!     values = [1, 2, 3]
//!
//!     [[clauses]]
//!     from = "x"
//!     in = "l"
//!
//!     [[clauses]]
//!     group = ["x"]
//!     by = "x % 2"
//! "#, ".")?;
//!
//! let query = plan.run(QueryLimits::default())?;
//! assert_eq!(query.groups()?.len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod output;
pub mod plan;
pub mod sources;

pub use config::{Config, OutputFormat};
pub use error::{PlanError, PlanResult};
pub use plan::{ClauseSpec, ExplainStep, Plan, Step};
pub use sources::SourceSpec;

pub use kviri_core::{
    Binding, Direction, EvalError, Evaluator, Expr, ExpressionEvaluator, KviriError, OrderSpec,
    Query, QueryLimits, ResultSet,
};
