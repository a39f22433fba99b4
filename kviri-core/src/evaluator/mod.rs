//! The evaluator seam.
//!
//! Every selector, predicate, ordering key and grouping criterion handed to the
//! query builder is an [`Expr`]: either a Rust closure over the binding or the
//! text of an expression. An [`Evaluator`] turns an `Expr` plus a [`Binding`]
//! into a value. The query builder never looks inside an `Expr` itself.

pub mod builtins;
pub mod helpers;
mod interpret;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::ast::Expression;
use crate::binding::Binding;
use crate::error::{EvalError, EvalResult};
use crate::parser;

pub use interpret::evaluate_expression;

type ExprFn = dyn Fn(&Binding) -> EvalResult<Value>;

/// A selector, predicate, ordering key or grouping criterion.
#[derive(Clone)]
pub enum Expr {
    /// Expression text, interpreted by the evaluator.
    Text(String),
    /// A closure receiving the whole binding.
    Func(Rc<ExprFn>),
}

impl Expr {
    /// Wrap a closure computing a value from the binding.
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&Binding) -> EvalResult<Value> + 'static,
    {
        Expr::Func(Rc::new(f))
    }

    /// Wrap a closure computing a boolean from the binding.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Binding) -> EvalResult<bool> + 'static,
    {
        Expr::Func(Rc::new(move |b: &Binding| f(b).map(Value::Bool)))
    }

    /// The expression text, if this is a textual expression.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Expr::Text(text) => Some(text),
            Expr::Func(_) => None,
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Expr::Func(_) => f.write_str("Func(<closure>)"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Text(text) => f.write_str(text),
            Expr::Func(_) => f.write_str("<closure>"),
        }
    }
}

impl From<&str> for Expr {
    fn from(text: &str) -> Self {
        Expr::Text(text.to_string())
    }
}

impl From<String> for Expr {
    fn from(text: String) -> Self {
        Expr::Text(text)
    }
}

impl From<&String> for Expr {
    fn from(text: &String) -> Self {
        Expr::Text(text.clone())
    }
}

/// Computes the value of an [`Expr`] for one binding.
pub trait Evaluator {
    fn evaluate(&self, expr: &Expr, binding: &Binding) -> EvalResult<Value>;

    /// Check a textual expression without evaluating it.
    fn validate(&self, _text: &str) -> EvalResult<()> {
        Ok(())
    }
}

/// Default evaluator: runs closures and interprets expression text.
///
/// Parsed expressions are cached per text, so a selector used over a large
/// binding set is parsed once.
#[derive(Debug, Default, Clone)]
pub struct ExpressionEvaluator {
    cache: RefCell<HashMap<String, Rc<Expression>>>,
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    fn parsed(&self, text: &str) -> EvalResult<Rc<Expression>> {
        if let Some(expr) = self.cache.borrow().get(text) {
            return Ok(Rc::clone(expr));
        }

        tracing::trace!(expression = text, "parsing expression");
        let expr = Rc::new(parser::parse(text)?);
        self.cache
            .borrow_mut()
            .insert(text.to_string(), Rc::clone(&expr));
        Ok(expr)
    }

    /// Number of distinct expression texts parsed so far.
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl Evaluator for ExpressionEvaluator {
    fn evaluate(&self, expr: &Expr, binding: &Binding) -> EvalResult<Value> {
        match expr {
            Expr::Func(f) => f(binding),
            Expr::Text(text) => {
                let parsed = self.parsed(text)?;
                evaluate_expression(&parsed, binding)
            }
        }
    }

    fn validate(&self, text: &str) -> EvalResult<()> {
        self.parsed(text).map(|_| ())
    }
}

/// Evaluator for hosts that only use closures. Text is limited to a bare name
/// or a dotted path such as `p.age`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClosureEvaluator;

impl ClosureEvaluator {
    fn check_path(text: &str) -> EvalResult<()> {
        let valid = !text.is_empty()
            && text.split('.').all(|segment| {
                let mut chars = segment.chars();
                matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
                    && chars.all(|c| c.is_alphanumeric() || c == '_')
            });
        if valid {
            Ok(())
        } else {
            Err(EvalError::Unsupported(format!(
                "only names and dotted paths can be given as text, got `{}`",
                text
            )))
        }
    }
}

impl Evaluator for ClosureEvaluator {
    fn evaluate(&self, expr: &Expr, binding: &Binding) -> EvalResult<Value> {
        match expr {
            Expr::Func(f) => f(binding),
            Expr::Text(text) => {
                let text = text.trim();
                Self::check_path(text)?;
                binding.resolve(text)
            }
        }
    }

    fn validate(&self, text: &str) -> EvalResult<()> {
        Self::check_path(text.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn binding() -> Binding {
        [("x", json!(3)), ("p", json!({"name": "Ann", "age": 30}))]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_expression_evaluator_text() {
        let eval = ExpressionEvaluator::new();
        let b = binding();
        assert_eq!(eval.evaluate(&"x * 2".into(), &b).unwrap(), json!(6));
        assert_eq!(eval.evaluate(&"p.name".into(), &b).unwrap(), json!("Ann"));
        assert_eq!(
            eval.evaluate(&"y".into(), &b),
            Err(EvalError::UnboundName("y".to_string()))
        );
    }

    #[test]
    fn test_expression_cache() {
        let eval = ExpressionEvaluator::new();
        let b = binding();
        for _ in 0..3 {
            eval.evaluate(&"x + 1".into(), &b).unwrap();
        }
        eval.evaluate(&"x + 2".into(), &b).unwrap();
        assert_eq!(eval.cached(), 2);

        // parse failures are not cached
        assert!(matches!(
            eval.evaluate(&"x +".into(), &b),
            Err(EvalError::Parse(_))
        ));
        assert_eq!(eval.cached(), 2);
    }

    #[test]
    fn test_closures() {
        let eval = ExpressionEvaluator::new();
        let b = binding();
        let double = Expr::func(|b| {
            let x = b.value("x")?.as_i64().unwrap_or(0);
            Ok(json!(x * 2))
        });
        assert_eq!(eval.evaluate(&double, &b).unwrap(), json!(6));

        let adult = Expr::predicate(|b| Ok(b.resolve("p.age")?.as_i64() >= Some(18)));
        assert_eq!(eval.evaluate(&adult, &b).unwrap(), json!(true));
        assert_eq!(ClosureEvaluator.evaluate(&adult, &b).unwrap(), json!(true));
    }

    #[test]
    fn test_closure_evaluator_paths_only() {
        let eval = ClosureEvaluator;
        let b = binding();
        assert_eq!(eval.evaluate(&"p.age".into(), &b).unwrap(), json!(30));
        assert_eq!(eval.evaluate(&" x ".into(), &b).unwrap(), json!(3));
        assert!(matches!(
            eval.evaluate(&"x + 1".into(), &b),
            Err(EvalError::Unsupported(_))
        ));
        assert!(eval.validate("p..age").is_err());
    }

    #[test]
    fn test_expr_display() {
        assert_eq!(Expr::from("x > 1").to_string(), "x > 1");
        assert_eq!(Expr::func(|_| Ok(Value::Null)).to_string(), "<closure>");
        assert_eq!(Expr::from("x").as_text(), Some("x"));
    }
}
