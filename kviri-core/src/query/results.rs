//! Materialized query results.

use std::collections::HashSet;
use std::fmt;
use std::slice;

use serde::ser::{Serialize, Serializer};
use serde_json::Value;

use crate::binding::Binding;
use crate::evaluator::helpers::{canonical_key, values_equal};

/// One selected tuple, in selector order.
pub type Row = Vec<Value>;

/// The rows that share one grouping key.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Group {
    pub key: Value,
    pub rows: Vec<Row>,
}

/// Output of a terminal call: flat rows from `select`, or buckets from
/// `group(..).by(..)` in order of first-seen key.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSet {
    Rows(Vec<Row>),
    Groups(Vec<Group>),
}

impl ResultSet {
    /// Number of rows, or of groups.
    pub fn len(&self) -> usize {
        match self {
            ResultSet::Rows(rows) => rows.len(),
            ResultSet::Groups(groups) => groups.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            ResultSet::Rows(rows) => Some(rows),
            ResultSet::Groups(_) => None,
        }
    }

    pub fn groups(&self) -> Option<&[Group]> {
        match self {
            ResultSet::Rows(_) => None,
            ResultSet::Groups(groups) => Some(groups),
        }
    }

    /// Rows of the group whose key equals `key`.
    pub fn group(&self, key: &Value) -> Option<&[Row]> {
        self.groups()?
            .iter()
            .find(|g| values_equal(&g.key, key))
            .map(|g| g.rows.as_slice())
    }

    /// Drop later duplicate rows, keeping the first occurrence of each.
    /// Grouped results are deduplicated within each bucket.
    pub(crate) fn dedup(&mut self) {
        match self {
            ResultSet::Rows(rows) => dedup_rows(rows),
            ResultSet::Groups(groups) => {
                for group in groups {
                    dedup_rows(&mut group.rows);
                }
            }
        }
    }

    pub(crate) fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn dedup_rows(rows: &mut Vec<Row>) {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.retain(|row| seen.insert(canonical_key(&Value::Array(row.clone()))));
}

impl Serialize for ResultSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ResultSet::Rows(rows) => rows.serialize(serializer),
            ResultSet::Groups(groups) => groups.serialize(serializer),
        }
    }
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// What iterating a query yields: raw bindings before any terminal call,
/// afterwards rows or groups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item<'a> {
    Binding(&'a Binding),
    Row(&'a Row),
    Group(&'a Group),
}

impl Item<'_> {
    /// The item as a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Item::Binding(b) => b.to_value(),
            Item::Row(r) => Value::Array(r.to_vec()),
            Item::Group(g) => serde_json::json!({ "key": g.key, "rows": g.rows }),
        }
    }
}

/// Iterator over a query, see [`Item`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    inner: IterInner<'a>,
}

#[derive(Debug, Clone)]
enum IterInner<'a> {
    Bindings(slice::Iter<'a, Binding>),
    Rows(slice::Iter<'a, Row>),
    Groups(slice::Iter<'a, Group>),
}

impl<'a> Iter<'a> {
    pub(crate) fn new(results: Option<&'a ResultSet>, bindings: &'a [Binding]) -> Self {
        let inner = match results {
            Some(ResultSet::Rows(rows)) => IterInner::Rows(rows.iter()),
            Some(ResultSet::Groups(groups)) => IterInner::Groups(groups.iter()),
            None => IterInner::Bindings(bindings.iter()),
        };
        Self { inner }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = Item<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            IterInner::Bindings(it) => it.next().map(Item::Binding),
            IterInner::Rows(it) => it.next().map(Item::Row),
            IterInner::Groups(it) => it.next().map(Item::Group),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            IterInner::Bindings(it) => it.size_hint(),
            IterInner::Rows(it) => it.size_hint(),
            IterInner::Groups(it) => it.size_hint(),
        }
    }
}

impl ExactSizeIterator for Iter<'_> {}
