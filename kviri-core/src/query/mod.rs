//! The fluent query builder.
//!
//! A [`Query`] owns a [`BindingSet`] and mutates it clause by clause:
//!
//! ```rust
//! use kviri_core::Query;
//!
//! let mut q = Query::new();
//! q.from("x")?.in_([1, 2, 3])?
//!     .from("y")?.in_([7, 8, 9])?
//!     .where_("x > 1")?
//!     .select(["x", "y"])?;
//! assert_eq!(q.rows()?.len(), 6);
//! # Ok::<(), kviri_core::KviriError>(())
//! ```
//!
//! `from`, `let_` and `join` register a name; `in_` and `be` bind it. `on`
//! filters directly after a `join(..).in_(..)` pair. `select` and
//! `group(..).by(..)` materialize results; the binding set is kept, so more
//! clauses may follow.

mod ordering;
mod registrar;
mod results;

pub use ordering::{Direction, OrderSpec};
pub use results::{Group, Item, Iter, ResultSet, Row};

use std::fmt;

use serde_json::Value;

use crate::binding::{Binding, BindingSet};
use crate::error::{Clause, KviriError, KviriResult};
use crate::evaluator::helpers::{canonical_key, to_bool};
use crate::evaluator::{Evaluator, Expr, ExpressionEvaluator};
use registrar::PendingName;

/// Configuration for query execution limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    /// Maximum number of bindings a FROM/JOIN expansion may produce (default: 1,000,000)
    pub max_bindings: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_bindings: 1_000_000,
        }
    }
}

impl QueryLimits {
    /// No limit on expansion size.
    pub fn unlimited() -> Self {
        Self {
            max_bindings: usize::MAX,
        }
    }
}

/// A query under construction, see the [module docs](self).
#[derive(Debug, Clone)]
pub struct Query<E: Evaluator = ExpressionEvaluator> {
    evaluator: E,
    limits: QueryLimits,
    bindings: BindingSet,
    pending_name: PendingName,
    pending_selectors: Option<Vec<Expr>>,
    join_open: bool,
    results: Option<ResultSet>,
    stale: bool,
}

impl Query<ExpressionEvaluator> {
    /// An empty query using the built-in expression language.
    pub fn new() -> Self {
        Self::with_evaluator(ExpressionEvaluator::new())
    }

    /// Shorthand for `Query::new()` followed by `from(name)`.
    pub fn from_name(name: &str) -> KviriResult<Self> {
        let mut query = Self::new();
        query.from(name)?;
        Ok(query)
    }
}

impl Default for Query<ExpressionEvaluator> {
    fn default() -> Self {
        Self::new()
    }
}

fn evaluate<E: Evaluator>(
    evaluator: &E,
    clause: Clause,
    expr: &Expr,
    binding: &Binding,
) -> KviriResult<Value> {
    evaluator
        .evaluate(expr, binding)
        .map_err(|source| KviriError::Evaluation {
            clause,
            expression: expr.to_string(),
            binding: binding.to_string(),
            source,
        })
}

fn select_row<E: Evaluator>(
    evaluator: &E,
    clause: Clause,
    selectors: &[Expr],
    binding: &Binding,
) -> KviriResult<Row> {
    selectors
        .iter()
        .map(|s| evaluate(evaluator, clause, s, binding))
        .collect()
}

impl<E: Evaluator> Query<E> {
    /// An empty query evaluating selectors with `evaluator`.
    pub fn with_evaluator(evaluator: E) -> Self {
        Self {
            evaluator,
            limits: QueryLimits::default(),
            bindings: BindingSet::new(),
            pending_name: PendingName::Idle,
            pending_selectors: None,
            join_open: false,
            results: None,
            stale: false,
        }
    }

    pub fn with_limits(mut self, limits: QueryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    /// Register `name` for a following `in_`.
    pub fn from(&mut self, name: &str) -> KviriResult<&mut Self> {
        self.pending_name.open(Clause::From, name)?;
        Ok(self.finish(Clause::From))
    }

    /// Register `name` for a following `be`.
    pub fn let_(&mut self, name: &str) -> KviriResult<&mut Self> {
        self.pending_name.open(Clause::Let, name)?;
        Ok(self.finish(Clause::Let))
    }

    /// Register `name` for a following `in_`, which may be followed by `on`.
    pub fn join(&mut self, name: &str) -> KviriResult<&mut Self> {
        self.pending_name.open(Clause::Join, name)?;
        Ok(self.finish(Clause::Join))
    }

    /// Bind the pending name to each value of `source` in turn (cartesian
    /// product with the current bindings). The source is read once.
    pub fn in_<I>(&mut self, source: I) -> KviriResult<&mut Self>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let (name, opened_by) = self
            .pending_name
            .take(Clause::In, &[Clause::From, Clause::Join])?;

        let values: Vec<Value> = source.into_iter().map(Into::into).collect();
        let source_len = values.len();
        self.bindings
            .expand(Clause::In, &name, values, &self.limits)?;
        self.mark_stale(Clause::In);

        tracing::debug!(
            clause = %Clause::In,
            name = %name,
            source_len,
            bindings = self.bindings.len(),
            "expanded bindings"
        );

        self.finish(Clause::In);
        self.join_open = opened_by == Clause::Join;
        Ok(self)
    }

    /// Bind the pending name to `value` in every binding.
    pub fn be(&mut self, value: impl Into<Value>) -> KviriResult<&mut Self> {
        let (name, _) = self.pending_name.take(Clause::Be, &[Clause::Let])?;

        self.bindings.augment(Clause::Be, &name, value.into())?;
        self.mark_stale(Clause::Be);

        tracing::debug!(clause = %Clause::Be, name = %name, "bound constant");
        Ok(self.finish(Clause::Be))
    }

    /// Join condition; only valid right after `join(..).in_(..)`.
    pub fn on(&mut self, predicate: impl Into<Expr>) -> KviriResult<&mut Self> {
        if !self.join_open {
            return Err(KviriError::usage(
                Clause::On,
                "on() must directly follow join(..).in_(..)",
            ));
        }
        self.filter(Clause::On, predicate.into())?;
        Ok(self.finish(Clause::On))
    }

    /// Keep the bindings for which `predicate` is truthy.
    pub fn where_(&mut self, predicate: impl Into<Expr>) -> KviriResult<&mut Self> {
        self.filter(Clause::Where, predicate.into())?;
        Ok(self.finish(Clause::Where))
    }

    fn filter(&mut self, clause: Clause, predicate: Expr) -> KviriResult<()> {
        let before = self.bindings.len();
        let evaluator = &self.evaluator;
        self.bindings
            .filter(|b| evaluate(evaluator, clause, &predicate, b).map(|v| to_bool(&v)))?;
        self.mark_stale(clause);

        tracing::debug!(
            clause = %clause,
            predicate = %predicate,
            before,
            after = self.bindings.len(),
            "filtered bindings"
        );
        Ok(())
    }

    /// Sort the bindings. The first ordering is the primary key, later ones
    /// break ties; equal bindings keep their relative order.
    pub fn order_by<I>(&mut self, orderings: I) -> KviriResult<&mut Self>
    where
        I: IntoIterator,
        I::Item: Into<OrderSpec>,
    {
        let specs: Vec<OrderSpec> = orderings.into_iter().map(Into::into).collect();
        let directions: Vec<Direction> = specs.iter().map(|s| s.direction).collect();

        let evaluator = &self.evaluator;
        let keys = self
            .bindings
            .iter()
            .map(|b| {
                specs
                    .iter()
                    .map(|s| evaluate(evaluator, Clause::OrderBy, &s.expr, b))
                    .collect::<KviriResult<Vec<Value>>>()
            })
            .collect::<KviriResult<Vec<_>>>()?;

        self.bindings.sort_by_keys(keys, &directions);
        self.mark_stale(Clause::OrderBy);

        tracing::debug!(
            clause = %Clause::OrderBy,
            keys = specs.len(),
            bindings = self.bindings.len(),
            "sorted bindings"
        );
        Ok(self.finish(Clause::OrderBy))
    }

    /// Project every binding to a row, one column per selector.
    pub fn select<I>(&mut self, selectors: I) -> KviriResult<&mut Self>
    where
        I: IntoIterator,
        I::Item: Into<Expr>,
    {
        let selectors: Vec<Expr> = selectors.into_iter().map(Into::into).collect();
        let evaluator = &self.evaluator;
        let rows = self
            .bindings
            .iter()
            .map(|b| select_row(evaluator, Clause::Select, &selectors, b))
            .collect::<KviriResult<Vec<Row>>>()?;

        tracing::debug!(
            clause = %Clause::Select,
            columns = selectors.len(),
            rows = rows.len(),
            "selected rows"
        );
        self.set_results(ResultSet::Rows(rows));
        Ok(self.finish(Clause::Select))
    }

    /// Remove later duplicates from the last result, keeping order.
    pub fn distinct(&mut self) -> KviriResult<&mut Self> {
        let results = self.results.as_mut().ok_or_else(|| {
            KviriError::usage(Clause::Distinct, "select() has not been called")
        })?;

        let before = results.len();
        results.dedup();
        tracing::debug!(
            clause = %Clause::Distinct,
            before,
            after = results.len(),
            "removed duplicates"
        );
        Ok(self.finish(Clause::Distinct))
    }

    /// Stash selectors for the following `by`.
    pub fn group<I>(&mut self, selectors: I) -> KviriResult<&mut Self>
    where
        I: IntoIterator,
        I::Item: Into<Expr>,
    {
        if self.pending_selectors.is_some() {
            return Err(KviriError::usage(
                Clause::Group,
                "group() is already waiting for by()",
            ));
        }
        self.pending_selectors = Some(selectors.into_iter().map(Into::into).collect());
        Ok(self.finish(Clause::Group))
    }

    /// Bucket the rows selected by the pending `group` under the value of
    /// `criteria`. Buckets keep the order in which their key first appeared.
    pub fn by(&mut self, criteria: impl Into<Expr>) -> KviriResult<&mut Self> {
        let selectors = self
            .pending_selectors
            .as_deref()
            .ok_or_else(|| KviriError::usage(Clause::By, "group() has not been called"))?;
        let criteria = criteria.into();

        let evaluator = &self.evaluator;
        let mut groups: Vec<Group> = Vec::new();
        let mut index = std::collections::HashMap::new();

        for binding in &self.bindings {
            let key = evaluate(evaluator, Clause::By, &criteria, binding)?;
            let row = select_row(evaluator, Clause::By, selectors, binding)?;

            let slot = *index.entry(canonical_key(&key)).or_insert_with(|| {
                groups.push(Group {
                    key,
                    rows: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].rows.push(row);
        }

        tracing::debug!(
            clause = %Clause::By,
            criteria = %criteria,
            groups = groups.len(),
            "grouped rows"
        );
        self.pending_selectors = None;
        self.set_results(ResultSet::Groups(groups));
        Ok(self.finish(Clause::By))
    }

    /// The last materialized result.
    pub fn results(&self) -> KviriResult<&ResultSet> {
        self.results.as_ref().ok_or_else(|| {
            KviriError::usage(Clause::Select, "no result: call select() or group().by()")
        })
    }

    /// Rows of the last result, if it came from `select`.
    pub fn rows(&self) -> KviriResult<&[Row]> {
        self.results()?.rows().ok_or_else(|| {
            KviriError::usage(Clause::Select, "the last result is grouped, use groups()")
        })
    }

    /// Buckets of the last result, if it came from `group(..).by(..)`.
    pub fn groups(&self) -> KviriResult<&[Group]> {
        self.results()?.groups().ok_or_else(|| {
            KviriError::usage(Clause::By, "the last result is not grouped, use rows()")
        })
    }

    /// True when the binding set changed after the last terminal call.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn bindings(&self) -> &BindingSet {
        &self.bindings
    }

    /// The name registered by `from`, `let_` or `join` and not yet bound.
    pub fn pending_name(&self) -> Option<&str> {
        self.pending_name.name()
    }

    /// Rows or groups if a terminal call happened, else the bindings.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self.results.as_ref(), self.bindings.as_slice())
    }

    /// Results if a terminal call happened, else the bindings, as JSON.
    pub fn to_value(&self) -> Value {
        match &self.results {
            Some(results) => results.to_value(),
            None => Value::Array(self.bindings.iter().map(Binding::to_value).collect()),
        }
    }

    fn set_results(&mut self, results: ResultSet) {
        self.results = Some(results);
        self.stale = false;
    }

    fn mark_stale(&mut self, clause: Clause) {
        if self.results.is_some() && !self.stale {
            tracing::debug!(clause = %clause, "bindings changed after a terminal call, results are stale");
            self.stale = true;
        }
    }

    fn finish(&mut self, clause: Clause) -> &mut Self {
        if clause != Clause::On {
            self.join_open = false;
        }
        self
    }
}

impl<'a, E: Evaluator> IntoIterator for &'a Query<E> {
    type Item = Item<'a>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<E: Evaluator> fmt::Display for Query<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string_pretty(&self.to_value()).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
mod tests;
