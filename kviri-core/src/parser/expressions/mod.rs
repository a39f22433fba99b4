//! Expression parsing methods.
//!
//! - `precedence`: operator precedence chain (ternary → logical → comparison → arithmetic)
//! - `operators`: comparison operator parsing
//! - `primary`: primary expressions, postfix operations, field access
//! - `special`: template strings, object and array literals

mod operators;
mod precedence;
mod primary;
mod special;

use crate::ast::Expression;
use crate::error::EvalResult;
use crate::lexer::Token;
use crate::parser::Parser;

impl Parser {
    /// Entry point for expression parsing
    pub(crate) fn parse_expression(&mut self) -> EvalResult<Expression> {
        self.parse_ternary_expression()
    }

    /// Parse a comma separated list up to `close`.
    /// Assumes the opening delimiter has already been consumed.
    pub(super) fn parse_expression_list(&mut self, close: Token) -> EvalResult<Vec<Expression>> {
        let mut items = Vec::new();

        while self.current_token() != &close && !matches!(self.current_token(), Token::Eof) {
            items.push(self.parse_expression()?);

            if matches!(self.current_token(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(close)?;
        Ok(items)
    }

    /// Convert a token to a field name if it can be used after `.` or as an object key.
    /// Keywords are allowed as field names (`doc.in`, `{ not: 1 }`).
    pub(super) fn token_to_field_name(token: &Token) -> Option<String> {
        match token {
            Token::Identifier(name) => Some(name.clone()),
            Token::In => Some("in".to_string()),
            Token::And => Some("and".to_string()),
            Token::Or => Some("or".to_string()),
            Token::Not => Some("not".to_string()),
            Token::Like => Some("like".to_string()),
            Token::True => Some("true".to_string()),
            Token::False => Some("false".to_string()),
            Token::Null => Some("null".to_string()),
            _ => None,
        }
    }
}
