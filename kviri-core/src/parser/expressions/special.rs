//! Special constructs: template strings, object and array literals.

use crate::ast::{Expression, TemplateStringPart};
use crate::error::{EvalError, EvalResult};
use crate::lexer::{TemplatePart, Token};
use crate::parser::Parser;

impl Parser {
    /// Parse the interpolated parts of a template string
    pub(super) fn parse_template_string(
        &mut self,
        parts: Vec<TemplatePart>,
    ) -> EvalResult<Expression> {
        let mut parsed_parts = Vec::new();

        for part in parts {
            match part {
                TemplatePart::Literal(s) => {
                    parsed_parts.push(TemplateStringPart::Literal(s));
                }
                TemplatePart::Expression(expr_str) => {
                    let mut expr_parser = Parser::new(&expr_str)?;
                    let expr = expr_parser.parse()?;
                    parsed_parts.push(TemplateStringPart::Expression(Box::new(expr)));
                }
            }
        }

        Ok(Expression::TemplateString {
            parts: parsed_parts,
        })
    }

    /// Parse object expression: { field: value, ... }
    pub(super) fn parse_object_expression(&mut self) -> EvalResult<Expression> {
        self.expect(Token::LeftBrace)?;

        let mut fields = Vec::new();

        while !matches!(self.current_token(), Token::RightBrace | Token::Eof) {
            let key = self.parse_object_key()?;

            // Shorthand: { city } means { city: city }
            let value = if matches!(self.current_token(), Token::Colon) {
                self.advance();
                self.parse_expression()?
            } else {
                Expression::Variable(key.clone())
            };

            fields.push((key, value));

            if matches!(self.current_token(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(Token::RightBrace)?;

        Ok(Expression::Object(fields))
    }

    /// Parse object key: identifier, string, or keyword
    fn parse_object_key(&mut self) -> EvalResult<String> {
        if let Token::String(s) = self.current_token() {
            let k = s.clone();
            self.advance();
            return Ok(k);
        }

        match Self::token_to_field_name(self.current_token()) {
            Some(name) => {
                self.advance();
                Ok(name)
            }
            None => Err(EvalError::Parse("Expected field name in object".to_string())),
        }
    }

    /// Parse array expression: [a, b, ...]
    pub(super) fn parse_array_expression(&mut self) -> EvalResult<Expression> {
        self.expect(Token::LeftBracket)?;
        let elements = self.parse_expression_list(Token::RightBracket)?;
        Ok(Expression::Array(elements))
    }
}
