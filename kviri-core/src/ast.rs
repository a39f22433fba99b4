//! AST for textual kviri expressions.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Variable reference (e.g., x)
    Variable(String),

    /// Field access (e.g., p.name)
    FieldAccess(Box<Expression>, String),

    /// Optional field access (e.g., p?.name) - returns null if base is null
    OptionalFieldAccess(Box<Expression>, String),

    /// Dynamic field access (e.g., p[key])
    DynamicFieldAccess(Box<Expression>, Box<Expression>),

    /// Array element access (e.g., arr[0], arr[-1])
    ArrayAccess(Box<Expression>, Box<Expression>),

    /// Literal value
    Literal(Value),

    /// Binary operation
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// Object construction
    Object(Vec<(String, Expression)>),

    /// Array construction
    Array(Vec<Expression>),

    /// Range expression (e.g., 1..5 produces [1, 2, 3, 4, 5])
    Range(Box<Expression>, Box<Expression>),

    /// Function call (e.g., UPPER(p.name))
    FunctionCall { name: String, args: Vec<Expression> },

    /// Ternary conditional (condition ? true_expr : false_expr)
    Ternary {
        condition: Box<Expression>,
        true_expr: Box<Expression>,
        false_expr: Box<Expression>,
    },

    /// Template string with interpolation: $"Hello ${name}"
    TemplateString { parts: Vec<TemplateStringPart> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateStringPart {
    Literal(String),
    Expression(Box<Expression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    In,
    NotIn,
    Like,
    NotLike,
    RegEx,
    NotRegEx,

    // Logical
    And,
    Or,
    NullCoalesce,

    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negate,
}

impl Expression {
    /// The dotted path this expression reads, if it is nothing but a name
    /// followed by plain field accesses (`p`, `p.address.city`).
    pub fn as_path(&self) -> Option<String> {
        match self {
            Expression::Variable(name) => Some(name.clone()),
            Expression::FieldAccess(base, field) => {
                base.as_path().map(|path| format!("{}.{}", path, field))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_path() {
        let expr = Expression::FieldAccess(
            Box::new(Expression::FieldAccess(
                Box::new(Expression::Variable("p".to_string())),
                "address".to_string(),
            )),
            "city".to_string(),
        );
        assert_eq!(expr.as_path(), Some("p.address.city".to_string()));

        let expr = Expression::Literal(Value::Null);
        assert_eq!(expr.as_path(), None);
    }
}
