//! Tokenizer for textual kviri expressions.

use crate::error::{EvalError, EvalResult};

/// Part of a template string (used in lexer output)
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    /// Static text between interpolations
    Literal(String),
    /// Raw expression text inside ${...}
    Expression(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    In,
    And,
    Or,
    Not,
    Like,
    True,
    False,
    Null,

    // Identifiers and literals
    Identifier(String),
    Integer(i64),
    Float(f64),
    String(String),
    TemplateString(Vec<TemplatePart>), // $"..." with interpolation

    // Operators
    Equal,         // ==
    NotEqual,      // !=
    LessThan,      // <
    LessThanEq,    // <=
    GreaterThan,   // >
    GreaterThanEq, // >=
    Plus,          // +
    Minus,         // -
    Star,          // *
    Slash,         // /
    Percent,       // %
    RegEx,         // =~
    NotRegEx,      // !~
    DoubleAmp,     // &&
    DoublePipe,    // ||
    NullCoalesce,  // ??

    // Delimiters
    Dot,          // .
    DotDot,       // .. (range operator)
    Comma,        // ,
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]
    LeftParen,    // (
    RightParen,   // )
    Colon,        // :
    Question,     // ?
    QuestionDot,  // ?. (optional chaining)

    // Special
    Eof,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            input: chars,
            position: 0,
            current_char,
        }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    /// Peek at the next character without consuming it
    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> EvalResult<Token> {
        let mut num_str = String::new();
        let mut has_dot = false;

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                num_str.push(ch);
                self.advance();
            } else if ch == '.' && !has_dot {
                // `1..5` is a range, not a float
                if self.peek_char() == Some('.') {
                    break;
                }
                has_dot = true;
                num_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if has_dot {
            num_str
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| EvalError::Parse(format!("Invalid float number: {}", num_str)))
        } else {
            num_str
                .parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| EvalError::Parse(format!("Invalid integer number: {}", num_str)))
        }
    }

    fn read_string(&mut self, quote: char) -> EvalResult<Token> {
        self.advance(); // Skip opening quote

        let mut string = String::new();

        while let Some(ch) = self.current_char {
            if ch == quote {
                self.advance(); // Skip closing quote
                return Ok(Token::String(string));
            } else if ch == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    string.push(unescape(escaped));
                    self.advance();
                }
            } else {
                string.push(ch);
                self.advance();
            }
        }

        Err(EvalError::Parse("Unterminated string".to_string()))
    }

    /// Read a template string: $"..." or $'...' with ${expression} interpolation
    fn read_template_string(&mut self, quote: char) -> EvalResult<Token> {
        self.advance(); // skip $
        self.advance(); // skip opening quote

        let mut parts = Vec::new();
        let mut current_literal = String::new();

        while let Some(ch) = self.current_char {
            if ch == quote {
                if !current_literal.is_empty() {
                    parts.push(TemplatePart::Literal(current_literal));
                }
                self.advance();
                return Ok(Token::TemplateString(parts));
            } else if ch == '$' && self.peek_char() == Some('{') {
                if !current_literal.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut current_literal)));
                }
                self.advance(); // skip $
                self.advance(); // skip {

                let expr = self.read_until_closing_brace()?;
                parts.push(TemplatePart::Expression(expr));
            } else if ch == '$' && self.peek_char() == Some('$') {
                // $$ -> $
                current_literal.push('$');
                self.advance();
                self.advance();
            } else if ch == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    current_literal.push(unescape(escaped));
                    self.advance();
                }
            } else {
                current_literal.push(ch);
                self.advance();
            }
        }

        Err(EvalError::Parse("Unterminated template string".to_string()))
    }

    /// Read expression text inside ${...}, handling nested braces
    fn read_until_closing_brace(&mut self) -> EvalResult<String> {
        let mut expr = String::new();
        let mut brace_depth = 1;

        while let Some(ch) = self.current_char {
            if ch == '{' {
                brace_depth += 1;
            } else if ch == '}' {
                brace_depth -= 1;
                if brace_depth == 0 {
                    self.advance();
                    return Ok(expr);
                }
            }
            expr.push(ch);
            self.advance();
        }

        Err(EvalError::Parse("Unterminated interpolation ${}".to_string()))
    }

    fn read_quoted_identifier(&mut self) -> EvalResult<Token> {
        self.advance(); // Skip opening backtick

        let mut ident = String::new();

        while let Some(ch) = self.current_char {
            if ch == '`' {
                self.advance();
                return Ok(Token::Identifier(ident));
            }
            ident.push(ch);
            self.advance();
        }

        Err(EvalError::Parse("Unterminated quoted identifier".to_string()))
    }

    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match ident.to_uppercase().as_str() {
            "IN" => Token::In,
            "AND" => Token::And,
            "OR" => Token::Or,
            "NOT" => Token::Not,
            "LIKE" => Token::Like,
            "TRUE" => Token::True,
            "FALSE" => Token::False,
            "NULL" | "NONE" => Token::Null,
            _ => Token::Identifier(ident),
        }
    }

    pub fn next_token(&mut self) -> EvalResult<Token> {
        self.skip_whitespace();

        let token = match self.current_char {
            None => Token::Eof,

            Some(ch) if ch.is_ascii_digit() => {
                return self.read_number();
            }

            Some('$') if matches!(self.peek_char(), Some('"') | Some('\'')) => {
                let quote = self.peek_char().unwrap_or('"');
                return self.read_template_string(quote);
            }

            Some(quote @ ('"' | '\'')) => {
                return self.read_string(quote);
            }

            Some('`') => {
                return self.read_quoted_identifier();
            }

            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                return Ok(self.read_identifier());
            }

            Some('=') => {
                self.advance();
                match self.current_char {
                    Some('=') => {
                        self.advance();
                        Token::Equal
                    }
                    Some('~') => {
                        self.advance();
                        Token::RegEx
                    }
                    _ => {
                        return Err(EvalError::Parse(
                            "Unexpected '=': use '==' for comparison".to_string(),
                        ))
                    }
                }
            }

            Some('!') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::NotEqual
                } else if self.current_char == Some('~') {
                    self.advance();
                    Token::NotRegEx
                } else {
                    Token::Not
                }
            }

            Some('<') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::LessThanEq
                } else {
                    Token::LessThan
                }
            }

            Some('>') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::GreaterThanEq
                } else {
                    Token::GreaterThan
                }
            }

            Some('&') => {
                self.advance();
                if self.current_char == Some('&') {
                    self.advance();
                    Token::DoubleAmp
                } else {
                    return Err(EvalError::Parse("Unexpected character: &".to_string()));
                }
            }

            Some('|') => {
                self.advance();
                if self.current_char == Some('|') {
                    self.advance();
                    Token::DoublePipe
                } else {
                    return Err(EvalError::Parse("Unexpected character: |".to_string()));
                }
            }

            Some('+') => {
                self.advance();
                Token::Plus
            }
            Some('-') => {
                self.advance();
                Token::Minus
            }
            Some('*') => {
                self.advance();
                Token::Star
            }
            Some('/') => {
                self.advance();
                Token::Slash
            }
            Some('%') => {
                self.advance();
                Token::Percent
            }
            Some('.') => {
                self.advance();
                if self.current_char == Some('.') {
                    self.advance();
                    Token::DotDot
                } else {
                    Token::Dot
                }
            }
            Some(',') => {
                self.advance();
                Token::Comma
            }
            Some('{') => {
                self.advance();
                Token::LeftBrace
            }
            Some('}') => {
                self.advance();
                Token::RightBrace
            }
            Some('[') => {
                self.advance();
                Token::LeftBracket
            }
            Some(']') => {
                self.advance();
                Token::RightBracket
            }
            Some('(') => {
                self.advance();
                Token::LeftParen
            }
            Some(')') => {
                self.advance();
                Token::RightParen
            }
            Some(':') => {
                self.advance();
                Token::Colon
            }
            Some('?') => {
                self.advance();
                if self.current_char == Some('?') {
                    self.advance();
                    Token::NullCoalesce
                } else if self.current_char == Some('.') {
                    self.advance();
                    Token::QuestionDot
                } else {
                    Token::Question
                }
            }

            Some(ch) => {
                return Err(EvalError::Parse(format!("Unexpected character: {}", ch)));
            }
        };

        Ok(token)
    }

    pub fn tokenize(&mut self) -> EvalResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        Ok(tokens)
    }
}

fn unescape(escaped: char) -> char {
    match escaped {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(tokenize("and")[0], Token::And);
        assert_eq!(tokenize("AND")[0], Token::And);
        assert_eq!(tokenize("Or")[0], Token::Or);
        assert_eq!(tokenize("not")[0], Token::Not);
        assert_eq!(tokenize("in")[0], Token::In);
        assert_eq!(tokenize("like")[0], Token::Like);
    }

    #[test]
    fn test_boolean_null() {
        assert_eq!(tokenize("true")[0], Token::True);
        assert_eq!(tokenize("False")[0], Token::False);
        assert_eq!(tokenize("NULL")[0], Token::Null);
        assert_eq!(tokenize("None")[0], Token::Null);
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(tokenize("myVar")[0], Token::Identifier("myVar".to_string()));
        assert_eq!(tokenize("_x1")[0], Token::Identifier("_x1".to_string()));
        assert_eq!(
            tokenize("`first name`")[0],
            Token::Identifier("first name".to_string())
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokenize("123")[0], Token::Integer(123));
        assert_eq!(tokenize("3.5")[0], Token::Float(3.5));
        let tokens = tokenize("1..10");
        assert_eq!(tokens[0], Token::Integer(1));
        assert_eq!(tokens[1], Token::DotDot);
        assert_eq!(tokens[2], Token::Integer(10));
    }

    #[test]
    fn test_strings() {
        assert_eq!(tokenize("\"hello\"")[0], Token::String("hello".to_string()));
        assert_eq!(tokenize("'world'")[0], Token::String("world".to_string()));
        assert_eq!(
            tokenize("'it\\'s'")[0],
            Token::String("it's".to_string())
        );
        assert_eq!(
            tokenize("\"a\\nb\"")[0],
            Token::String("a\nb".to_string())
        );
    }

    #[test]
    fn test_template_string() {
        assert_eq!(
            tokenize("$\"${p.name} is ${p.age}\"")[0],
            Token::TemplateString(vec![
                TemplatePart::Expression("p.name".to_string()),
                TemplatePart::Literal(" is ".to_string()),
                TemplatePart::Expression("p.age".to_string()),
            ])
        );
    }

    #[test]
    fn test_operators() {
        let tokens = tokenize("== != < <= > >= + - * / % =~ !~ && || ?? ?. ? :");
        assert_eq!(
            tokens,
            vec![
                Token::Equal,
                Token::NotEqual,
                Token::LessThan,
                Token::LessThanEq,
                Token::GreaterThan,
                Token::GreaterThanEq,
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Percent,
                Token::RegEx,
                Token::NotRegEx,
                Token::DoubleAmp,
                Token::DoublePipe,
                Token::NullCoalesce,
                Token::QuestionDot,
                Token::Question,
                Token::Colon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_dotted_path() {
        let tokens = tokenize("p.address.city");
        assert_eq!(tokens[0], Token::Identifier("p".to_string()));
        assert_eq!(tokens[1], Token::Dot);
        assert_eq!(tokens[2], Token::Identifier("address".to_string()));
        assert_eq!(tokens[3], Token::Dot);
        assert_eq!(tokens[4], Token::Identifier("city".to_string()));
    }

    #[test]
    fn test_eof() {
        assert_eq!(tokenize(""), vec![Token::Eof]);
    }

    #[test]
    fn test_errors() {
        assert!(Lexer::new("\"unterminated").tokenize().is_err());
        assert!(Lexer::new("x = 1").tokenize().is_err());
        assert!(Lexer::new("a & b").tokenize().is_err());
        assert!(Lexer::new("#").tokenize().is_err());
    }
}
