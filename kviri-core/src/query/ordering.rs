//! ORDER BY specifications.

use std::cmp::Ordering;

use serde_json::Value;

use crate::evaluator::helpers::compare_values;
use crate::evaluator::Expr;

/// Sort direction of one ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Compare two key values in this direction.
    pub(crate) fn apply(self, a: &Value, b: &Value) -> Ordering {
        match self {
            Direction::Asc => compare_values(a, b),
            Direction::Desc => compare_values(b, a),
        }
    }
}

/// One ordering key: what to evaluate and which way to sort.
#[derive(Debug, Clone)]
pub struct OrderSpec {
    pub expr: Expr,
    pub direction: Direction,
}

impl OrderSpec {
    pub fn asc(expr: impl Into<Expr>) -> Self {
        Self {
            expr: expr.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(expr: impl Into<Expr>) -> Self {
        Self {
            expr: expr.into(),
            direction: Direction::Desc,
        }
    }

    /// Parse `"<expr>"`, `"<expr> asc"` or `"<expr> desc"`. The suffix is
    /// case-insensitive; without one the order is ascending.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if let Some((head, suffix)) = trimmed.rsplit_once(char::is_whitespace) {
            let head = head.trim_end();
            if !head.is_empty() {
                if suffix.eq_ignore_ascii_case("desc") {
                    return Self::desc(head);
                }
                if suffix.eq_ignore_ascii_case("asc") {
                    return Self::asc(head);
                }
            }
        }
        Self::asc(trimmed)
    }
}

impl From<&str> for OrderSpec {
    fn from(text: &str) -> Self {
        OrderSpec::parse(text)
    }
}

impl From<String> for OrderSpec {
    fn from(text: String) -> Self {
        OrderSpec::parse(&text)
    }
}

impl From<&String> for OrderSpec {
    fn from(text: &String) -> Self {
        OrderSpec::parse(text)
    }
}

impl From<Expr> for OrderSpec {
    fn from(expr: Expr) -> Self {
        OrderSpec::asc(expr)
    }
}

impl<T: Into<Expr>> From<(T, Direction)> for OrderSpec {
    fn from((expr, direction): (T, Direction)) -> Self {
        OrderSpec {
            expr: expr.into(),
            direction,
        }
    }
}

/// `true` means ascending.
impl<T: Into<Expr>> From<(T, bool)> for OrderSpec {
    fn from((expr, ascending): (T, bool)) -> Self {
        let direction = if ascending {
            Direction::Asc
        } else {
            Direction::Desc
        };
        (expr, direction).into()
    }
}
