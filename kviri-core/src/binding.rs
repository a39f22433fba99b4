//! Binding environments.
//!
//! A [`Binding`] maps variable names to values in the order they were bound.
//! A [`BindingSet`] is the ordered sequence of bindings a query works on; every
//! binding in a set has the same names, which the set tracks on its own so that
//! conflicts are still detected once filtering has emptied it.

use std::cmp::Ordering;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::error::{Clause, EvalError, EvalResult, KviriError, KviriResult};
use crate::evaluator::helpers::get_field_value;
use crate::query::{Direction, QueryLimits};

/// One environment: name → value, in binding order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Binding {
    entries: Vec<(String, Value)>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Like [`get`](Self::get), but an unbound name is an [`EvalError::UnboundName`].
    /// Convenient inside closure selectors: `b.value("x")?`.
    pub fn value(&self, name: &str) -> EvalResult<&Value> {
        self.get(name)
            .ok_or_else(|| EvalError::UnboundName(name.to_string()))
    }

    /// Resolve a dotted path (`p.address.city`). The first segment must be a
    /// bound name; missing fields below it read as null.
    pub fn resolve(&self, path: &str) -> EvalResult<Value> {
        let (name, rest) = match path.split_once('.') {
            Some((name, rest)) => (name, Some(rest)),
            None => (path, None),
        };
        let value = self.value(name)?;
        Ok(match rest {
            Some(rest) => get_field_value(value, rest),
            None => value.clone(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// A copy of this binding extended with `name`.
    pub(crate) fn with(&self, name: &str, value: Value) -> Binding {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.extend(self.entries.iter().cloned());
        entries.push((name.to_string(), value));
        Binding { entries }
    }

    /// The binding as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.entries.iter().cloned().collect())
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Binding {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        let mut binding = Binding::new();
        for (name, value) in iter {
            let name = name.into();
            match binding.entries.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => entry.1 = value,
                None => binding.entries.push((name, value)),
            }
        }
        binding
    }
}

impl Serialize for Binding {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// The ordered collection of bindings a query is working on.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingSet {
    bindings: Vec<Binding>,
    names: Vec<String>,
}

impl Default for BindingSet {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingSet {
    /// A set holding one empty binding.
    pub fn new() -> Self {
        Self {
            bindings: vec![Binding::new()],
            names: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Binding> {
        self.bindings.iter()
    }

    pub fn as_slice(&self) -> &[Binding] {
        &self.bindings
    }

    /// Names bound in every binding of the set, in binding order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    fn check_unbound(&self, clause: Clause, name: &str) -> KviriResult<()> {
        if self.names.iter().any(|n| n == name) {
            return Err(KviriError::NameConflict {
                clause,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Cartesian product with `source`: for each existing binding, in order,
    /// one new binding per source value, in source order.
    pub fn expand(
        &mut self,
        clause: Clause,
        name: &str,
        source: Vec<Value>,
        limits: &QueryLimits,
    ) -> KviriResult<()> {
        self.check_unbound(clause, name)?;

        let requested = self.bindings.len().saturating_mul(source.len());
        if requested > limits.max_bindings {
            return Err(KviriError::LimitExceeded {
                clause,
                requested,
                max: limits.max_bindings,
            });
        }

        let mut expanded = Vec::with_capacity(requested);
        for binding in &self.bindings {
            for value in &source {
                expanded.push(binding.with(name, value.clone()));
            }
        }

        self.bindings = expanded;
        self.names.push(name.to_string());
        Ok(())
    }

    /// Extend every binding with the same constant.
    pub fn augment(&mut self, clause: Clause, name: &str, value: Value) -> KviriResult<()> {
        self.check_unbound(clause, name)?;

        self.bindings = self
            .bindings
            .iter()
            .map(|binding| binding.with(name, value.clone()))
            .collect();
        self.names.push(name.to_string());
        Ok(())
    }

    /// Keep the bindings for which `predicate` holds, preserving order.
    /// Every binding is tested before anything is removed.
    pub fn filter<F>(&mut self, mut predicate: F) -> KviriResult<()>
    where
        F: FnMut(&Binding) -> KviriResult<bool>,
    {
        let keep = self
            .bindings
            .iter()
            .map(&mut predicate)
            .collect::<KviriResult<Vec<bool>>>()?;

        let mut keep = keep.into_iter();
        self.bindings.retain(|_| keep.next().unwrap_or(false));
        Ok(())
    }

    /// Reorder by precomputed keys: `keys[i][k]` is the k-th ordering key of
    /// binding `i`. Sorts stably by the last key first, so the first key is
    /// the primary one.
    pub fn sort_by_keys(&mut self, keys: Vec<Vec<Value>>, directions: &[Direction]) {
        let mut order: Vec<usize> = (0..self.bindings.len()).collect();

        for (k, direction) in directions.iter().enumerate().rev() {
            order.sort_by(|&a, &b| match (keys[a].get(k), keys[b].get(k)) {
                (Some(x), Some(y)) => direction.apply(x, y),
                _ => Ordering::Equal,
            });
        }

        let mut slots: Vec<Option<Binding>> = std::mem::take(&mut self.bindings)
            .into_iter()
            .map(Some)
            .collect();
        self.bindings = order.into_iter().filter_map(|i| slots[i].take()).collect();
    }
}

impl<'a> IntoIterator for &'a BindingSet {
    type Item = &'a Binding;
    type IntoIter = std::slice::Iter<'a, Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}
