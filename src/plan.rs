//! TOML query plans.
//!
//! A plan names its data sources and lists clauses to apply in order, with
//! the same semantics as the fluent [`Query`] API:
//!
//! ```toml
//! [sources.people]
//! file = "people.json"
//!
//! [[clauses]]
//! from = "p"
//! in = "people"
//!
//! [[clauses]]
//! where = "p.age > 21"
//!
//! [[clauses]]
//! select = ["p.name"]
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use kviri_core::{Evaluator, ExpressionEvaluator, KviriResult, OrderSpec, Query, QueryLimits};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PlanError, PlanResult};
use crate::sources::SourceSpec;

/// One `[[clauses]]` table as written in the plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClauseSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, rename = "in", skip_serializing_if = "Option::is_none")]
    pub in_: Option<String>,
    #[serde(default, rename = "let", skip_serializing_if = "Option::is_none")]
    pub let_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub be: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<String>,
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by: Option<String>,
}

/// A validated clause, ready to apply to a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    From { name: String, source: String },
    Let { name: String, value: Value },
    Join { name: String, source: String, on: Option<String> },
    Where(String),
    OrderBy(Vec<String>),
    Select(Vec<String>),
    Distinct,
    Group { selectors: Vec<String>, by: String },
}

impl ClauseSpec {
    /// Resolve the table into a [`Step`]. Exactly one clause shape must be
    /// present: `from`+`in`, `let`+`be`, `join`+`in`[+`on`], `where`,
    /// `order_by`, `select`, `distinct = true` or `group`+`by`.
    pub fn to_step(&self, index: usize) -> PlanResult<Step> {
        let invalid = |message: String| PlanError::InvalidClause { index, message };

        let keys = self.keys();
        let step = match keys.as_slice() {
            ["from", "in"] => Step::From {
                name: field(&self.from),
                source: field(&self.in_),
            },
            ["be", "let"] => Step::Let {
                name: field(&self.let_),
                value: self.be.clone().unwrap_or(Value::Null),
            },
            ["in", "join"] => Step::Join {
                name: field(&self.join),
                source: field(&self.in_),
                on: None,
            },
            ["in", "join", "on"] => Step::Join {
                name: field(&self.join),
                source: field(&self.in_),
                on: self.on.clone(),
            },
            ["where"] => Step::Where(field(&self.where_)),
            ["order_by"] => Step::OrderBy(self.order_by.clone().unwrap_or_default()),
            ["select"] => Step::Select(self.select.clone().unwrap_or_default()),
            ["distinct"] => {
                if self.distinct != Some(true) {
                    return Err(invalid("distinct must be true".to_string()));
                }
                Step::Distinct
            }
            ["by", "group"] => Step::Group {
                selectors: self.group.clone().unwrap_or_default(),
                by: field(&self.by),
            },
            [] => return Err(invalid("empty clause".to_string())),
            other => {
                return Err(invalid(format!(
                    "unsupported combination of keys: {}",
                    other.join(", ")
                )))
            }
        };
        Ok(step)
    }

    /// Present keys, sorted.
    fn keys(&self) -> Vec<&'static str> {
        let present = [
            ("by", self.by.is_some()),
            ("be", self.be.is_some()),
            ("distinct", self.distinct.is_some()),
            ("from", self.from.is_some()),
            ("group", self.group.is_some()),
            ("in", self.in_.is_some()),
            ("join", self.join.is_some()),
            ("let", self.let_.is_some()),
            ("on", self.on.is_some()),
            ("order_by", self.order_by.is_some()),
            ("select", self.select.is_some()),
            ("where", self.where_.is_some()),
        ];
        let mut keys: Vec<&'static str> = present
            .into_iter()
            .filter_map(|(key, set)| set.then_some(key))
            .collect();
        keys.sort_unstable();
        keys
    }
}

fn field(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

impl Step {
    /// Name of the source the step reads, if any.
    pub fn source(&self) -> Option<&str> {
        match self {
            Step::From { source, .. } | Step::Join { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Name the step binds, if any.
    pub fn binds(&self) -> Option<&str> {
        match self {
            Step::From { name, .. } | Step::Let { name, .. } | Step::Join { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }

    /// Every textual expression the step evaluates. Ordering texts are
    /// returned without their direction suffix.
    pub fn expressions(&self) -> Vec<String> {
        match self {
            Step::From { .. } | Step::Let { .. } | Step::Distinct => Vec::new(),
            Step::Join { on, .. } => on.iter().cloned().collect(),
            Step::Where(predicate) => vec![predicate.clone()],
            Step::OrderBy(specs) => specs
                .iter()
                .filter_map(|s| OrderSpec::parse(s).expr.as_text().map(str::to_string))
                .collect(),
            Step::Select(selectors) => selectors.clone(),
            Step::Group { selectors, by } => {
                let mut exprs = selectors.clone();
                exprs.push(by.clone());
                exprs
            }
        }
    }

    /// Apply the step; `values` are the loaded source for FROM and JOIN.
    pub fn apply<E: Evaluator>(
        &self,
        query: &mut Query<E>,
        values: Option<Vec<Value>>,
    ) -> KviriResult<()> {
        match self {
            Step::From { name, .. } => {
                query.from(name)?.in_(values.unwrap_or_default())?;
            }
            Step::Let { name, value } => {
                query.let_(name)?.be(value.clone())?;
            }
            Step::Join { name, on, .. } => {
                query.join(name)?.in_(values.unwrap_or_default())?;
                if let Some(on) = on {
                    query.on(on)?;
                }
            }
            Step::Where(predicate) => {
                query.where_(predicate)?;
            }
            Step::OrderBy(specs) => {
                query.order_by(specs)?;
            }
            Step::Select(selectors) => {
                query.select(selectors)?;
            }
            Step::Distinct => {
                query.distinct()?;
            }
            Step::Group { selectors, by } => {
                query.group(selectors)?.by(by)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::From { name, source } => write!(f, "FROM {} IN {}", name, source),
            Step::Let { name, value } => write!(f, "LET {} BE {}", name, value),
            Step::Join { name, source, on } => {
                write!(f, "JOIN {} IN {}", name, source)?;
                if let Some(on) = on {
                    write!(f, " ON {}", on)?;
                }
                Ok(())
            }
            Step::Where(predicate) => write!(f, "WHERE {}", predicate),
            Step::OrderBy(specs) => write!(f, "ORDER BY {}", specs.join(", ")),
            Step::Select(selectors) => write!(f, "SELECT {}", selectors.join(", ")),
            Step::Distinct => f.write_str("DISTINCT"),
            Step::Group { selectors, by } => {
                write!(f, "GROUP {} BY {}", selectors.join(", "), by)
            }
        }
    }
}

/// A parsed plan file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    #[serde(default)]
    pub sources: BTreeMap<String, SourceSpec>,
    #[serde(default)]
    pub clauses: Vec<ClauseSpec>,
    /// Directory source paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// One line of `kviri explain`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainStep {
    /// 1-based clause number
    pub index: usize,
    pub clause: String,
    /// Size of the binding set after the clause
    pub bindings: usize,
    /// Number of rows or groups, once a terminal clause has run
    pub results: Option<usize>,
}

impl Plan {
    /// Read a plan file; its sources resolve relative to its directory.
    pub fn load(path: &Path) -> PlanResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PlanError::io(path, e))?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::from_toml_str(&content, base_dir)
    }

    pub fn from_toml_str(content: &str, base_dir: impl Into<PathBuf>) -> PlanResult<Self> {
        let mut plan: Plan = toml::from_str(content)?;
        plan.base_dir = base_dir.into();
        Ok(plan)
    }

    /// Resolve every clause, checking that referenced sources exist.
    pub fn steps(&self) -> PlanResult<Vec<Step>> {
        if self.clauses.is_empty() {
            return Err(PlanError::InvalidPlan("no clauses".to_string()));
        }

        let mut steps = Vec::with_capacity(self.clauses.len());
        for (i, clause) in self.clauses.iter().enumerate() {
            let step = clause.to_step(i + 1)?;
            if let Some(source) = step.source() {
                if !self.sources.contains_key(source) {
                    return Err(PlanError::UnknownSource(source.to_string()));
                }
            }
            steps.push(step);
        }
        Ok(steps)
    }

    /// Validate the plan without loading any data: clause shapes, source
    /// names, names bound twice, and every textual expression.
    pub fn check<E: Evaluator>(&self, evaluator: &E) -> PlanResult<Vec<Step>> {
        let steps = self.steps()?;
        let mut bound = HashSet::new();

        for (i, step) in steps.iter().enumerate() {
            let index = i + 1;
            if let Some(name) = step.binds() {
                if !bound.insert(name) {
                    return Err(PlanError::InvalidClause {
                        index,
                        message: format!("'{}' is already bound", name),
                    });
                }
            }
            for expression in step.expressions() {
                evaluator
                    .validate(&expression)
                    .map_err(|source| PlanError::Expression {
                        index,
                        expression: expression.clone(),
                        source,
                    })?;
            }
        }

        tracing::debug!(clauses = steps.len(), "plan is valid");
        Ok(steps)
    }

    /// Run the plan with the built-in expression language.
    pub fn run(&self, limits: QueryLimits) -> PlanResult<Query> {
        self.run_with(Query::new().with_limits(limits))
    }

    /// Run the plan on a caller-provided query.
    pub fn run_with<E: Evaluator>(&self, query: Query<E>) -> PlanResult<Query<E>> {
        self.execute(query, |_, _, _| {})
    }

    /// Run the plan, reporting the binding count after every clause.
    pub fn explain(&self, limits: QueryLimits) -> PlanResult<Vec<ExplainStep>> {
        let mut report = Vec::new();
        self.execute(
            Query::new().with_limits(limits),
            |index, step, query: &Query<ExpressionEvaluator>| {
                report.push(ExplainStep {
                    index,
                    clause: step.to_string(),
                    bindings: query.bindings().len(),
                    results: query.results().ok().map(|r| r.len()),
                });
            },
        )?;
        Ok(report)
    }

    fn execute<E, F>(&self, mut query: Query<E>, mut observe: F) -> PlanResult<Query<E>>
    where
        E: Evaluator,
        F: FnMut(usize, &Step, &Query<E>),
    {
        let steps = self.steps()?;
        let max_len = query.limits().max_bindings;
        let mut loaded: HashMap<&str, Vec<Value>> = HashMap::new();

        for (i, step) in steps.iter().enumerate() {
            let index = i + 1;
            let values = match step.source() {
                Some(source) => Some(self.source_values(source, max_len, &mut loaded)?),
                None => None,
            };

            tracing::debug!(index, clause = %step, "applying clause");
            step.apply(&mut query, values)
                .map_err(|source| PlanError::Query { index, source })?;
            observe(index, step, &query);
        }

        Ok(query)
    }

    /// Values of a source, loaded once per run.
    fn source_values<'a>(
        &'a self,
        name: &'a str,
        max_len: usize,
        loaded: &mut HashMap<&'a str, Vec<Value>>,
    ) -> PlanResult<Vec<Value>> {
        if let Some(values) = loaded.get(name) {
            return Ok(values.clone());
        }
        let spec = self
            .sources
            .get(name)
            .ok_or_else(|| PlanError::UnknownSource(name.to_string()))?;
        let values = spec.load(name, &self.base_dir, max_len)?;
        loaded.insert(name, values.clone());
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kviri_core::{ClosureEvaluator, KviriError};
    use serde_json::json;

    const PEOPLE: &str = r#"
        [sources.people]
        values = [
            { name = "Alice", age = 27 },
            { name = "Bob", age = 28 },
            { name = "Fred", age = 19 },
        ]

        [[clauses]]
        from = "p"
        in = "people"

        [[clauses]]
        where = "p.age > 21"

        [[clauses]]
        order_by = ["p.age desc"]

        [[clauses]]
        select = ["p.name"]
    "#;

    #[test]
    fn test_run_inline_plan() {
        let plan = Plan::from_toml_str(PEOPLE, ".").unwrap();
        let query = plan.run(QueryLimits::default()).unwrap();
        assert_eq!(query.to_value(), json!([["Bob"], ["Alice"]]));
    }

    #[test]
    fn test_steps_display() {
        let plan = Plan::from_toml_str(PEOPLE, ".").unwrap();
        let steps: Vec<String> = plan.steps().unwrap().iter().map(|s| s.to_string()).collect();
        assert_eq!(
            steps,
            vec![
                "FROM p IN people",
                "WHERE p.age > 21",
                "ORDER BY p.age desc",
                "SELECT p.name",
            ]
        );
    }

    #[test]
    fn test_clause_shapes() {
        let clause = ClauseSpec {
            join: Some("q".into()),
            in_: Some("people".into()),
            on: Some("p.age == q.age".into()),
            ..Default::default()
        };
        assert_eq!(
            clause.to_step(1).unwrap(),
            Step::Join {
                name: "q".into(),
                source: "people".into(),
                on: Some("p.age == q.age".into()),
            }
        );

        let clause = ClauseSpec {
            from: Some("x".into()),
            ..Default::default()
        };
        assert!(matches!(
            clause.to_step(2),
            Err(PlanError::InvalidClause { index: 2, .. })
        ));

        let clause = ClauseSpec {
            distinct: Some(false),
            ..Default::default()
        };
        assert!(clause.to_step(1).is_err());
        assert!(ClauseSpec::default().to_step(1).is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = Plan::from_toml_str("[[clauses]]\nfrom = \"x\"\nfor = \"y\"", ".").unwrap_err();
        assert!(matches!(err, PlanError::Toml(_)));
    }

    #[test]
    fn test_unknown_source() {
        let plan = Plan::from_toml_str("[[clauses]]\nfrom = \"x\"\nin = \"nowhere\"", ".").unwrap();
        assert!(matches!(plan.steps(), Err(PlanError::UnknownSource(s)) if s == "nowhere"));
    }

    #[test]
    fn test_check_expressions() {
        let plan = Plan::from_toml_str(PEOPLE, ".").unwrap();
        assert_eq!(plan.check(&ExpressionEvaluator::new()).unwrap().len(), 4);

        // "p.age > 21" is not a plain path
        let err = plan.check(&ClosureEvaluator).unwrap_err();
        assert!(matches!(err, PlanError::Expression { index: 2, .. }));

        let broken = PEOPLE.replace("p.age > 21", "p.age >");
        let plan = Plan::from_toml_str(&broken, ".").unwrap();
        assert!(matches!(
            plan.check(&ExpressionEvaluator::new()),
            Err(PlanError::Expression { index: 2, .. })
        ));
    }

    #[test]
    fn test_check_rebound_name() {
        let text = r#"
            [sources.l]
            values = [1]
            [[clauses]]
            from = "x"
            in = "l"
            [[clauses]]
            let = "x"
            be = 2
        "#;
        let plan = Plan::from_toml_str(text, ".").unwrap();
        assert!(matches!(
            plan.check(&ExpressionEvaluator::new()),
            Err(PlanError::InvalidClause { index: 2, .. })
        ));
        assert!(matches!(
            plan.run(QueryLimits::default()),
            Err(PlanError::Query {
                index: 2,
                source: KviriError::NameConflict { .. }
            })
        ));
    }

    #[test]
    fn test_explain_counts() {
        let text = r#"
            [sources.l]
            range = { start = 1, end = 4 }
            [sources.m]
            values = [7, 8, 9]
            [[clauses]]
            from = "x"
            in = "l"
            [[clauses]]
            from = "y"
            in = "m"
            [[clauses]]
            where = "x > 1"
            [[clauses]]
            select = ["x", "y"]
        "#;
        let plan = Plan::from_toml_str(text, ".").unwrap();
        let report = plan.explain(QueryLimits::default()).unwrap();
        let counts: Vec<usize> = report.iter().map(|s| s.bindings).collect();
        assert_eq!(counts, vec![3, 9, 6, 6]);
        assert_eq!(report[2].results, None);
        assert_eq!(report[3].results, Some(6));
    }

    #[test]
    fn test_source_loaded_once_and_limits() {
        let text = r#"
            [sources.l]
            range = { start = 0, end = 10 }
            [[clauses]]
            from = "x"
            in = "l"
            [[clauses]]
            join = "y"
            in = "l"
            on = "x == y"
            [[clauses]]
            select = ["x"]
        "#;
        let plan = Plan::from_toml_str(text, ".").unwrap();
        assert_eq!(plan.run(QueryLimits::default()).unwrap().rows().unwrap().len(), 10);

        let err = plan.run(QueryLimits { max_bindings: 50 }).unwrap_err();
        assert!(matches!(
            err,
            PlanError::Query {
                index: 2,
                source: KviriError::LimitExceeded { .. }
            }
        ));
    }
}
