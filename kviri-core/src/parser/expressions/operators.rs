//! Comparison operator parsing.
//!
//! Handles operators:
//! - Equality: `==`, `!=`
//! - Relational: `<`, `<=`, `>`, `>=`
//! - Membership: `IN`, `NOT IN`
//! - Pattern matching: `LIKE`, `NOT LIKE`, `=~`, `!~`

use crate::ast::BinaryOperator;
use crate::error::EvalResult;
use crate::lexer::Token;
use crate::parser::Parser;

impl Parser {
    /// Parse a comparison operator if present, consuming it.
    pub(super) fn parse_comparison_operator(&mut self) -> EvalResult<Option<BinaryOperator>> {
        let op = match self.current_token() {
            Token::Equal => BinaryOperator::Equal,
            Token::NotEqual => BinaryOperator::NotEqual,
            Token::LessThan => BinaryOperator::LessThan,
            Token::LessThanEq => BinaryOperator::LessThanOrEqual,
            Token::GreaterThan => BinaryOperator::GreaterThan,
            Token::GreaterThanEq => BinaryOperator::GreaterThanOrEqual,
            Token::In => BinaryOperator::In,
            Token::Like => BinaryOperator::Like,
            Token::RegEx => BinaryOperator::RegEx,
            Token::NotRegEx => BinaryOperator::NotRegEx,
            Token::Not => return Ok(self.parse_negated_operator()),
            _ => return Ok(None),
        };

        self.advance();
        Ok(Some(op))
    }

    /// Parse negated operators: NOT LIKE, NOT IN
    fn parse_negated_operator(&mut self) -> Option<BinaryOperator> {
        let op = match self.peek_token(1) {
            Token::Like => BinaryOperator::NotLike,
            Token::In => BinaryOperator::NotIn,
            _ => return None,
        };

        self.advance(); // consume NOT
        self.advance(); // consume LIKE / IN
        Some(op)
    }
}
