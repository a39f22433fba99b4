//! Parser for textual kviri expressions.
//!
//! Converts the token stream produced by the [`Lexer`](crate::lexer::Lexer)
//! into an [`Expression`] tree. There is no statement or clause syntax: clauses
//! are method calls on the query builder, only their arguments are parsed.

mod expressions;

use crate::ast::Expression;
use crate::error::{EvalError, EvalResult};
use crate::lexer::{Lexer, Token};

/// Parser for kviri expressions
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
}

impl Parser {
    /// Create a new parser from an input string
    pub fn new(input: &str) -> EvalResult<Self> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Get the current token
    pub(crate) fn current_token(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    /// Peek at a token at a given offset from the current position
    pub(crate) fn peek_token(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.position + offset)
            .unwrap_or(&Token::Eof)
    }

    /// Advance to the next token
    pub(crate) fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Expect a specific token and advance, or return an error
    pub(crate) fn expect(&mut self, expected: Token) -> EvalResult<()> {
        if self.current_token() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(EvalError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    /// Parse one complete expression, rejecting trailing tokens
    pub fn parse(&mut self) -> EvalResult<Expression> {
        let expr = self.parse_expression()?;

        if !matches!(self.current_token(), Token::Eof) {
            return Err(EvalError::Parse(format!(
                "Unexpected token after expression: {:?}",
                self.current_token()
            )));
        }

        Ok(expr)
    }
}

/// Parse a textual expression into an AST.
pub fn parse(input: &str) -> EvalResult<Expression> {
    let mut parser = Parser::new(input)?;
    parser.parse()
}
