//! SQL lexer.
//!
//! Single pass, no backtracking. Keywords are case-insensitive. The lexer
//! tracks 1-based line/column positions for every token and emits
//! [`TokenKind::Invalid`] for characters it does not recognize; structural
//! problems inside a braced reference or string literal are hard errors.

use crate::sql::error::ParseError;
use crate::sql::token::{Token, TokenKind};

/// Tokenizes one SQL string.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `input`.
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenizes the whole input.
    ///
    /// The returned vector always ends with an [`TokenKind::Eof`] token.
    ///
    /// # Errors
    ///
    /// Fails with [`ParseError`] on an unterminated string literal or a
    /// malformed `{…}` reference.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            if self.at_end() {
                tokens.push(Token::new(TokenKind::Eof, self.line, self.column));
                return Ok(tokens);
            }
            tokens.push(self.next_token()?);
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> u8 {
        if self.at_end() {
            0
        } else {
            self.input[self.pos]
        }
    }

    fn peek_next(&self) -> u8 {
        if self.pos + 1 >= self.input.len() {
            0
        } else {
            self.input[self.pos + 1]
        }
    }

    fn advance(&mut self) -> u8 {
        let c = self.input[self.pos];
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while !self.at_end() && self.peek().is_ascii_whitespace() {
            self.advance();
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        let line = self.line;
        let column = self.column;
        let c = self.peek();

        let simple = match c {
            b'(' => Some(TokenKind::LParen),
            b')' => Some(TokenKind::RParen),
            b',' => Some(TokenKind::Comma),
            b'*' => Some(TokenKind::Star),
            b'.' => Some(TokenKind::Dot),
            b'=' => Some(TokenKind::Eq),
            _ => None,
        };
        if let Some(kind) = simple {
            self.advance();
            return Ok(Token::new(kind, line, column));
        }

        match c {
            b'<' => {
                self.advance();
                let kind = match self.peek() {
                    b'=' => {
                        self.advance();
                        TokenKind::Le
                    }
                    b'>' => {
                        self.advance();
                        TokenKind::Ne
                    }
                    _ => TokenKind::Lt,
                };
                Ok(Token::new(kind, line, column))
            }
            b'>' => {
                self.advance();
                let kind = if self.peek() == b'=' {
                    self.advance();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                };
                Ok(Token::new(kind, line, column))
            }
            b'!' if self.peek_next() == b'=' => {
                self.advance();
                self.advance();
                Ok(Token::new(TokenKind::Ne, line, column))
            }
            b'{' => self.scan_braced(line, column),
            b'\'' => self.scan_string(line, column),
            c if c.is_ascii_digit() => self.scan_number(line, column),
            c if c.is_ascii_alphabetic() || c == b'_' => Ok(self.scan_word(line, column)),
            other => {
                self.advance();
                Ok(Token::new(TokenKind::Invalid(other as char), line, column))
            }
        }
    }

    /// Scans `{n}`, `{name}` or `{*}`.
    fn scan_braced(&mut self, line: usize, column: usize) -> Result<Token, ParseError> {
        self.advance(); // consume '{'

        if self.peek() == b'*' {
            self.advance();
            if self.peek() != b'}' {
                return Err(ParseError::new(
                    "expected '}' after '*' in braced reference",
                    self.line,
                    self.column,
                ));
            }
            self.advance();
            return Ok(Token::new(TokenKind::Star, line, column));
        }

        if self.peek().is_ascii_digit() {
            let mut number = String::new();
            while self.peek().is_ascii_digit() {
                number.push(self.advance() as char);
            }
            if self.peek() != b'}' {
                return Err(ParseError::new(
                    "expected '}' in column reference",
                    self.line,
                    self.column,
                ));
            }
            self.advance();
            let value = number.parse().map_err(|_| {
                ParseError::new("column reference number too large", line, column)
            })?;
            return Ok(Token::new(TokenKind::ColumnRef(value), line, column));
        }

        let mut ident = String::new();
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            ident.push(self.advance() as char);
        }
        if self.peek() != b'}' {
            return Err(ParseError::new(
                "expected '}' in braced identifier",
                self.line,
                self.column,
            ));
        }
        self.advance();
        if ident.is_empty() {
            return Err(ParseError::new("empty braced reference", line, column));
        }
        Ok(Token::new(TokenKind::Ident(ident), line, column))
    }

    /// Scans `'…'` with backslash-quote escapes.
    fn scan_string(&mut self, line: usize, column: usize) -> Result<Token, ParseError> {
        self.advance(); // consume opening quote
        let mut value = String::new();
        while !self.at_end() && self.peek() != b'\'' {
            if self.peek() == b'\\' && self.peek_next() == b'\'' {
                self.advance(); // skip the backslash
            }
            value.push(self.advance() as char);
        }
        if self.at_end() {
            return Err(ParseError::new("unterminated string literal", line, column));
        }
        self.advance(); // consume closing quote
        Ok(Token::new(TokenKind::StrLit(value), line, column))
    }

    fn scan_number(&mut self, line: usize, column: usize) -> Result<Token, ParseError> {
        let mut number = String::new();
        while self.peek().is_ascii_digit() {
            number.push(self.advance() as char);
        }
        let value = number
            .parse()
            .map_err(|_| ParseError::new("integer literal too large", line, column))?;
        Ok(Token::new(TokenKind::IntLit(value), line, column))
    }

    fn scan_word(&mut self, line: usize, column: usize) -> Token {
        let mut word = String::new();
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            word.push(self.advance() as char);
        }
        let kind = TokenKind::keyword(&word).unwrap_or(TokenKind::Ident(word));
        Token::new(kind, line, column)
    }
}
