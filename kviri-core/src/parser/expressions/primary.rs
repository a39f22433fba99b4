//! Primary expression parsing.
//!
//! Handles:
//! - Literals: integers, floats, strings, booleans, null
//! - Variables and function calls
//! - Parenthesized expressions
//! - Postfix operations: field access (.), optional chaining (?.), indexing ([])

use serde_json::Value;

use crate::ast::Expression;
use crate::error::{EvalError, EvalResult};
use crate::lexer::Token;
use crate::parser::Parser;

impl Parser {
    /// Parse postfix expression: field access, optional chaining, indexing
    pub(super) fn parse_postfix_expression(&mut self) -> EvalResult<Expression> {
        let mut expr = self.parse_primary_expression()?;

        loop {
            match self.current_token() {
                Token::Dot => {
                    expr = self.parse_field_access(expr)?;
                }
                Token::QuestionDot => {
                    expr = self.parse_optional_field_access(expr)?;
                }
                Token::LeftBracket => {
                    expr = self.parse_bracket_access(expr)?;
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Parse field access: expr.field
    fn parse_field_access(&mut self, base: Expression) -> EvalResult<Expression> {
        self.advance(); // consume '.'

        if let Some(field_name) = Self::token_to_field_name(self.current_token()) {
            self.advance();
            Ok(Expression::FieldAccess(Box::new(base), field_name))
        } else {
            Err(EvalError::Parse("Expected field name after '.'".to_string()))
        }
    }

    /// Parse optional field access: expr?.field
    fn parse_optional_field_access(&mut self, base: Expression) -> EvalResult<Expression> {
        self.advance(); // consume '?.'

        if let Some(field_name) = Self::token_to_field_name(self.current_token()) {
            self.advance();
            Ok(Expression::OptionalFieldAccess(Box::new(base), field_name))
        } else {
            Err(EvalError::Parse("Expected field name after '?.'".to_string()))
        }
    }

    /// Parse bracket access: expr[index] or expr["field"]
    fn parse_bracket_access(&mut self, base: Expression) -> EvalResult<Expression> {
        self.advance(); // consume '['

        let index_expr = self.parse_expression()?;
        self.expect(Token::RightBracket)?;

        Ok(match &index_expr {
            Expression::Literal(Value::Number(_)) => {
                Expression::ArrayAccess(Box::new(base), Box::new(index_expr))
            }
            Expression::Literal(Value::String(s)) => {
                Expression::FieldAccess(Box::new(base), s.clone())
            }
            Expression::UnaryOp { .. } => {
                // arr[-1]
                Expression::ArrayAccess(Box::new(base), Box::new(index_expr))
            }
            _ => Expression::DynamicFieldAccess(Box::new(base), Box::new(index_expr)),
        })
    }

    /// Parse primary expression (highest precedence)
    pub(super) fn parse_primary_expression(&mut self) -> EvalResult<Expression> {
        match self.current_token() {
            Token::Identifier(name) => {
                let name = name.clone();
                self.parse_identifier_expression(name)
            }
            Token::Integer(n) => {
                let n = *n;
                self.advance();
                Ok(Expression::Literal(Value::Number(serde_json::Number::from(n))))
            }
            Token::Float(f) => {
                let f = *f;
                self.advance();
                serde_json::Number::from_f64(f)
                    .map(|n| Expression::Literal(Value::Number(n)))
                    .ok_or_else(|| EvalError::Parse(format!("Invalid float literal: {}", f)))
            }
            Token::String(s) => {
                let s = s.clone();
                self.advance();
                Ok(Expression::Literal(Value::String(s)))
            }
            Token::True => {
                self.advance();
                Ok(Expression::Literal(Value::Bool(true)))
            }
            Token::False => {
                self.advance();
                Ok(Expression::Literal(Value::Bool(false)))
            }
            Token::Null => {
                self.advance();
                Ok(Expression::Literal(Value::Null))
            }
            Token::TemplateString(parts) => {
                let parts = parts.clone();
                self.advance();
                self.parse_template_string(parts)
            }
            Token::LeftBrace => self.parse_object_expression(),
            Token::LeftBracket => self.parse_array_expression(),
            Token::LeftParen => self.parse_parenthesized_expression(),
            _ => Err(EvalError::Parse(format!(
                "Unexpected token in expression: {:?}",
                self.current_token()
            ))),
        }
    }

    /// Parse identifier: variable or function call
    fn parse_identifier_expression(&mut self, name: String) -> EvalResult<Expression> {
        self.advance();

        if matches!(self.current_token(), Token::LeftParen) {
            self.advance(); // consume '('
            let args = self.parse_expression_list(Token::RightParen)?;
            Ok(Expression::FunctionCall { name, args })
        } else {
            Ok(Expression::Variable(name))
        }
    }

    /// Parse parenthesized expression. `(a, b)` builds an array, like a tuple.
    fn parse_parenthesized_expression(&mut self) -> EvalResult<Expression> {
        self.advance(); // consume '('

        let first = self.parse_expression()?;

        if matches!(self.current_token(), Token::Comma) {
            self.advance();
            let mut elements = vec![first];
            elements.extend(self.parse_expression_list(Token::RightParen)?);
            return Ok(Expression::Array(elements));
        }

        self.expect(Token::RightParen)?;
        Ok(first)
    }
}
