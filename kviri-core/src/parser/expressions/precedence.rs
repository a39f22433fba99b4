//! Operator precedence chain for kviri expression parsing.
//!
//! Precedence (lowest to highest):
//! 1. Ternary: `?:`
//! 2. Null coalesce: `??`
//! 3. Boolean OR: `OR`, `||`
//! 4. Boolean AND: `AND`, `&&`
//! 5. Boolean NOT: `NOT`, `!`
//! 6. Comparison: `==`, `!=`, `<`, `<=`, `>`, `>=`, `IN`, `LIKE`, etc.
//! 7. Range: `..`
//! 8. Additive: `+`, `-`
//! 9. Multiplicative: `*`, `/`, `%`
//! 10. Unary minus: `-`
//! 11. Postfix: `.`, `?.`, `[]`
//! 12. Primary: literals, variables, function calls, etc.

use crate::ast::{BinaryOperator, Expression, UnaryOperator};
use crate::error::EvalResult;
use crate::lexer::Token;
use crate::parser::Parser;

impl Parser {
    /// Parse ternary expression: condition ? true_expr : false_expr
    /// Lowest precedence, right-associative
    pub(super) fn parse_ternary_expression(&mut self) -> EvalResult<Expression> {
        let condition = self.parse_null_coalesce_expression()?;

        if matches!(self.current_token(), Token::Question) {
            self.advance(); // consume '?'
            let true_expr = self.parse_ternary_expression()?;
            self.expect(Token::Colon)?;
            let false_expr = self.parse_ternary_expression()?;
            Ok(Expression::Ternary {
                condition: Box::new(condition),
                true_expr: Box::new(true_expr),
                false_expr: Box::new(false_expr),
            })
        } else {
            Ok(condition)
        }
    }

    /// Parse null coalescing expression: left ?? right
    fn parse_null_coalesce_expression(&mut self) -> EvalResult<Expression> {
        let mut left = self.parse_or_expression()?;

        while matches!(self.current_token(), Token::NullCoalesce) {
            self.advance();
            let right = self.parse_or_expression()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::NullCoalesce,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse boolean OR expression
    fn parse_or_expression(&mut self) -> EvalResult<Expression> {
        let mut left = self.parse_and_expression()?;

        while matches!(self.current_token(), Token::Or | Token::DoublePipe) {
            self.advance();
            let right = self.parse_and_expression()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::Or,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse boolean AND expression
    fn parse_and_expression(&mut self) -> EvalResult<Expression> {
        let mut left = self.parse_not_expression()?;

        while matches!(self.current_token(), Token::And | Token::DoubleAmp) {
            self.advance();
            let right = self.parse_not_expression()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::And,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse boolean NOT. Binds looser than comparisons: `NOT x > 1` is `NOT (x > 1)`.
    fn parse_not_expression(&mut self) -> EvalResult<Expression> {
        if matches!(self.current_token(), Token::Not) {
            self.advance();
            let operand = self.parse_not_expression()?;
            return Ok(Expression::UnaryOp {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
            });
        }

        self.parse_comparison_expression()
    }

    /// Parse comparison expression
    fn parse_comparison_expression(&mut self) -> EvalResult<Expression> {
        let mut left = self.parse_range_expression()?;

        while let Some(op) = self.parse_comparison_operator()? {
            let right = self.parse_range_expression()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse range expressions (e.g., 1..5 produces [1, 2, 3, 4, 5])
    fn parse_range_expression(&mut self) -> EvalResult<Expression> {
        let left = self.parse_additive_expression()?;

        if matches!(self.current_token(), Token::DotDot) {
            self.advance(); // consume '..'
            let right = self.parse_additive_expression()?;
            Ok(Expression::Range(Box::new(left), Box::new(right)))
        } else {
            Ok(left)
        }
    }

    fn parse_additive_expression(&mut self) -> EvalResult<Expression> {
        let mut left = self.parse_multiplicative_expression()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative_expression()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> EvalResult<Expression> {
        let mut left = self.parse_unary_expression()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                Token::Percent => BinaryOperator::Modulus,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary_expression()?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> EvalResult<Expression> {
        if matches!(self.current_token(), Token::Minus) {
            self.advance();
            let operand = self.parse_unary_expression()?;
            return Ok(Expression::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(operand),
            });
        }

        self.parse_postfix_expression()
    }
}
