//! Validator expression syntax
//!
//! Schema leaves are strings such as `list(str(), int(min=0), min=1)` or
//! `enum('a', 'b', required=False)`. This module turns one such string into
//! a [`Call`] tree; giving the tree meaning is the compiler's job.
//!
//! ```text
//! call     := IDENT '(' [argument (',' argument)* [',']] ')'
//! argument := IDENT '=' value | value
//! value    := call | STRING | INT | FLOAT | True | False | None
//! ```

use crate::types::Value;
use thiserror::Error;

/// A syntax error with the byte offset it was detected at
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} (at offset {offset})")]
pub struct ExpressionError {
    /// Byte offset into the expression
    pub offset: usize,
    /// What went wrong
    pub message: String,
}

impl ExpressionError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Result type for expression parsing
pub type ExpressionResult<T> = Result<T, ExpressionError>;

// ============================================================================
// Tokens
// ============================================================================

/// Token kinds of the expression language
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    String(String),
    Integer(i64),
    Float(f64),
    LeftParen,
    RightParen,
    Comma,
    Equals,
    Eof,
}

/// A token and where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

impl Token {
    fn new(kind: TokenKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

// ============================================================================
// Lexer
// ============================================================================

/// Lexer for validator expressions
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from an input string
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    /// Tokenize the entire input string, ending with [`TokenKind::Eof`]
    pub fn tokenize(&mut self) -> ExpressionResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> ExpressionResult<Token> {
        self.skip_whitespace();

        let start = self.position;

        let Some(ch) = self.current_char() else {
            return Ok(Token::new(TokenKind::Eof, start));
        };

        let kind = match ch {
            '(' => {
                self.advance();
                TokenKind::LeftParen
            }
            ')' => {
                self.advance();
                TokenKind::RightParen
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            '=' => {
                self.advance();
                TokenKind::Equals
            }
            '"' | '\'' => self.read_string(ch)?,
            '-' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number()?,
            ch if ch.is_ascii_digit() => self.read_number()?,
            ch if ch.is_alphabetic() || ch == '_' => self.read_identifier(),
            _ => {
                return Err(ExpressionError::new(
                    start,
                    format!("unexpected character '{}'", ch),
                ));
            }
        };

        Ok(Token::new(kind, start))
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek(&self) -> Option<char> {
        let current = self.current_char()?;
        self.input[self.position + current.len_utf8()..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += ch.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn read_string(&mut self, quote: char) -> ExpressionResult<TokenKind> {
        let start = self.position;
        self.advance(); // opening quote

        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            self.advance();
            if ch == quote {
                return Ok(TokenKind::String(result));
            }
            if ch == '\\' {
                let Some(escaped) = self.current_char() else {
                    break;
                };
                self.advance();
                result.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
            } else {
                result.push(ch);
            }
        }

        Err(ExpressionError::new(start, "unterminated string literal"))
    }

    fn read_number(&mut self) -> ExpressionResult<TokenKind> {
        let start = self.position;
        let mut is_float = false;

        if self.current_char() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == '.' && !is_float && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.input[start..self.position];
        if is_float {
            text.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| ExpressionError::new(start, format!("invalid float '{}'", text)))
        } else {
            text.parse::<i64>()
                .map(TokenKind::Integer)
                .map_err(|_| ExpressionError::new(start, format!("invalid integer '{}'", text)))
        }
    }

    fn read_identifier(&mut self) -> TokenKind {
        let start = self.position;
        while self
            .current_char()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }
        TokenKind::Identifier(self.input[start..self.position].to_string())
    }
}

// ============================================================================
// AST
// ============================================================================

/// A validator invocation such as `int(min=0)`
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Validator tag
    pub name: String,
    /// Positional arguments in order
    pub args: Vec<Argument>,
    /// Keyword arguments in order
    pub kwargs: Vec<(String, Argument)>,
}

impl Call {
    /// Keyword argument by name
    pub fn kwarg(&self, name: &str) -> Option<&Argument> {
        self.kwargs.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

/// An argument value
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// Literal scalar
    Literal(Value),
    /// Nested validator expression
    Call(Call),
}

// ============================================================================
// Parser
// ============================================================================

/// Recursive descent parser over a token list
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a new parser from a list of tokens
    ///
    /// A list that does not end in [`TokenKind::Eof`] gets one appended.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| &t.kind) != Some(&TokenKind::Eof) {
            let end = tokens.last().map_or(0, |t| t.offset);
            tokens.push(Token::new(TokenKind::Eof, end));
        }
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parse exactly one call and require the input to end after it
    pub fn parse(&mut self) -> ExpressionResult<Call> {
        let call = self.parse_call()?;
        let token = self.current();
        if token.kind != TokenKind::Eof {
            return Err(ExpressionError::new(
                token.offset,
                "unexpected input after expression",
            ));
        }
        Ok(call)
    }

    fn current(&self) -> &Token {
        // new() guarantees a trailing Eof and advance() never moves past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.position + 1).map(|t| &t.kind)
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> ExpressionResult<()> {
        let token = self.current();
        if token.kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(ExpressionError::new(token.offset, format!("expected {}", what)))
        }
    }

    fn parse_call(&mut self) -> ExpressionResult<Call> {
        let token = self.current().clone();
        let TokenKind::Identifier(name) = token.kind else {
            return Err(ExpressionError::new(token.offset, "expected validator name"));
        };
        self.advance();
        self.expect(TokenKind::LeftParen, "'(' after validator name")?;

        let mut call = Call {
            name,
            args: Vec::new(),
            kwargs: Vec::new(),
        };

        loop {
            if self.current().kind == TokenKind::RightParen {
                self.advance();
                return Ok(call);
            }

            self.parse_argument(&mut call)?;

            if self.current().kind == TokenKind::Comma {
                self.advance();
            } else if self.current().kind != TokenKind::RightParen {
                return Err(ExpressionError::new(
                    self.current().offset,
                    "expected ',' or ')'",
                ));
            }
        }
    }

    fn parse_argument(&mut self, call: &mut Call) -> ExpressionResult<()> {
        let token = self.current().clone();

        if let TokenKind::Identifier(keyword) = &token.kind {
            if self.peek_kind() == Some(&TokenKind::Equals) {
                self.advance();
                self.advance();
                if call.kwarg(keyword).is_some() {
                    return Err(ExpressionError::new(
                        token.offset,
                        format!("keyword argument '{}' repeated", keyword),
                    ));
                }
                let value = self.parse_value()?;
                call.kwargs.push((keyword.clone(), value));
                return Ok(());
            }
        }

        if !call.kwargs.is_empty() {
            return Err(ExpressionError::new(
                token.offset,
                "positional argument follows keyword argument",
            ));
        }
        let value = self.parse_value()?;
        call.args.push(value);
        Ok(())
    }

    fn parse_value(&mut self) -> ExpressionResult<Argument> {
        let token = self.current().clone();
        let literal = match token.kind {
            TokenKind::String(s) => Value::String(s),
            TokenKind::Integer(i) => Value::Int(i),
            TokenKind::Float(f) => Value::Float(f),
            TokenKind::Identifier(name) => {
                if self.peek_kind() == Some(&TokenKind::LeftParen) {
                    return self.parse_call().map(Argument::Call);
                }
                match name.as_str() {
                    "True" | "true" => Value::Bool(true),
                    "False" | "false" => Value::Bool(false),
                    "None" | "null" => Value::Null,
                    _ => {
                        return Err(ExpressionError::new(
                            token.offset,
                            format!("unknown literal '{}'", name),
                        ))
                    }
                }
            }
            _ => return Err(ExpressionError::new(token.offset, "expected a value")),
        };
        self.advance();
        Ok(Argument::Literal(literal))
    }
}

/// Parse a validator expression
pub fn parse_expression(input: &str) -> ExpressionResult<Call> {
    let tokens = Lexer::new(input).tokenize()?;
    Parser::new(tokens).parse()
}
