//! Lexer for the Spl language
//!
//! Converts source code into a stream of tokens, tagging each with its
//! line and column.

use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result, Span};

/// Suffixes accepted on integer literals
pub const INT_SUFFIXES: &[&str] = &["i", "u", "i8", "i16", "i32", "u8", "u16", "u32"];

/// The lexer state
pub struct Lexer {
    source: Vec<char>,
    /// Current position in source
    pos: usize,
    /// Start position of current token
    start: usize,
    line: u32,
    column: u32,
    start_line: u32,
    start_column: u32,
    file_id: usize,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str, file_id: usize) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            start: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
            file_id,
        }
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        if c == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    /// Consume the next character if it is `expected`
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Create a span from start to current position
    fn make_span(&self) -> Span {
        Span::new(self.start, self.pos, self.start_line, self.start_column, self.file_id)
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.make_span())
    }

    fn text(&self) -> String {
        self.source[self.start..self.pos].iter().collect()
    }

    /// Skip whitespace and comments
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '/' if self.peek_next() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                '/' if self.peek_next() == Some('*') => {
                    self.advance();
                    self.advance();
                    let mut depth = 1;
                    while depth > 0 && !self.is_at_end() {
                        match (self.peek(), self.peek_next()) {
                            (Some('*'), Some('/')) => {
                                self.advance();
                                self.advance();
                                depth -= 1;
                            }
                            (Some('/'), Some('*')) => {
                                self.advance();
                                self.advance();
                                depth += 1;
                            }
                            _ => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let text = self.text();
        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Ident(text));
        self.make_token(kind)
    }

    /// Read an integer literal with an optional type suffix
    fn read_number(&mut self) -> Result<Token> {
        let hex = self.peek() == Some('0') && matches!(self.peek_next(), Some('x') | Some('X'));
        if hex {
            self.advance();
            self.advance();
        }
        let digits_start = self.pos;
        while let Some(c) = self.peek() {
            if c == '_' || (hex && c.is_ascii_hexdigit()) || (!hex && c.is_ascii_digit()) {
                self.advance();
            } else {
                break;
            }
        }
        let digits: String = self.source[digits_start..self.pos]
            .iter()
            .filter(|&&c| c != '_')
            .collect();

        let suffix_start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() {
                self.advance();
            } else {
                break;
            }
        }
        let suffix: String = self.source[suffix_start..self.pos].iter().collect();
        if !suffix.is_empty() && !INT_SUFFIXES.contains(&suffix.as_str()) {
            return Err(Error::UnexpectedToken {
                expected: "integer suffix".to_string(),
                got: suffix,
                span: self.make_span(),
            });
        }

        let radix = if hex { 16 } else { 10 };
        let value = u64::from_str_radix(&digits, radix).map_err(|_| Error::IntegerLiteralOutOfRange {
            literal: digits.clone(),
            span: self.make_span(),
        })?;
        let suffix = if suffix.is_empty() { None } else { Some(suffix) };
        Ok(self.make_token(TokenKind::IntLit { value, suffix }))
    }

    /// Read a string literal
    fn read_string(&mut self) -> Result<Token> {
        self.advance();
        let mut value = String::new();

        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('r') => value.push('\r'),
                        Some('t') => value.push('\t'),
                        Some('0') => value.push('\0'),
                        Some(c) => value.push(c),
                        None => return Err(Error::UnterminatedString { span: self.make_span() }),
                    }
                }
                Some('\n') | None => {
                    return Err(Error::UnterminatedString { span: self.make_span() });
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Ok(self.make_token(TokenKind::StringLit(value)))
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        self.start = self.pos;
        self.start_line = self.line;
        self.start_column = self.column;

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::eof(self.make_span())),
        };

        if c.is_alphabetic() || c == '_' {
            return Ok(self.read_identifier());
        }
        if c.is_ascii_digit() {
            return self.read_number();
        }
        if c == '"' {
            return self.read_string();
        }

        self.advance();
        let kind = match c {
            '+' if self.eat('=') => TokenKind::PlusEq,
            '+' => TokenKind::Plus,
            '-' if self.eat('>') => TokenKind::Arrow,
            '-' if self.eat('=') => TokenKind::MinusEq,
            '-' => TokenKind::Minus,
            '*' if self.eat('=') => TokenKind::StarEq,
            '*' => TokenKind::Star,
            '/' if self.eat('=') => TokenKind::SlashEq,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' if self.eat('=') => TokenKind::EqEq,
            '=' if self.eat('>') => TokenKind::FatArrow,
            '=' => TokenKind::Eq,
            '!' if self.eat('=') => TokenKind::Ne,
            '!' => TokenKind::Not,
            '<' if self.eat('=') => TokenKind::Le,
            '<' => TokenKind::Lt,
            '>' if self.eat('=') => TokenKind::Ge,
            '>' => TokenKind::Gt,
            '&' if self.eat('&') => TokenKind::AndAnd,
            '|' if self.eat('|') => TokenKind::OrOr,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            _ => return Err(Error::UnexpectedChar { ch: c, span: self.make_span() }),
        };

        Ok(self.make_token(kind))
    }

    /// Tokenize the entire source and return all tokens
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new(source, 0).tokenize().unwrap()
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = lex("fn main() { }");

        assert!(matches!(tokens[0].kind, TokenKind::Fn));
        assert!(matches!(tokens[1].kind, TokenKind::Ident(ref s) if s == "main"));
        assert!(matches!(tokens[2].kind, TokenKind::LParen));
        assert!(matches!(tokens[3].kind, TokenKind::RParen));
        assert!(matches!(tokens[4].kind, TokenKind::LBrace));
        assert!(matches!(tokens[5].kind, TokenKind::RBrace));
        assert!(matches!(tokens[6].kind, TokenKind::Eof));
    }

    #[test]
    fn test_line_and_column() {
        let tokens = lex("let x = 1;\n  foo");
        let foo = &tokens[5];
        assert!(matches!(foo.kind, TokenKind::Ident(ref s) if s == "foo"));
        assert_eq!((foo.span.line, foo.span.column), (2, 3));
    }

    #[test]
    fn test_numbers_and_suffixes() {
        let tokens = lex("42 7u8 0xFF_FF 9223372036854775808u");

        assert!(matches!(tokens[0].kind, TokenKind::IntLit { value: 42, suffix: None }));
        assert!(matches!(tokens[1].kind, TokenKind::IntLit { value: 7, suffix: Some(ref s) } if s == "u8"));
        assert!(matches!(tokens[2].kind, TokenKind::IntLit { value: 0xFFFF, .. }));
        assert!(matches!(tokens[3].kind, TokenKind::IntLit { value: 9223372036854775808, .. }));
    }

    #[test]
    fn test_literal_wider_than_64_bits() {
        let err = Lexer::new("18446744073709551616", 0).tokenize().unwrap_err();
        assert!(matches!(err, Error::IntegerLiteralOutOfRange { .. }));
    }

    #[test]
    fn test_bad_suffix() {
        assert!(Lexer::new("5q", 0).tokenize().is_err());
    }

    #[test]
    fn test_strings() {
        let tokens = lex(r#""hello\nworld""#);
        assert!(matches!(tokens[0].kind, TokenKind::StringLit(ref s) if s == "hello\nworld"));
        assert!(Lexer::new("\"open", 0).tokenize().is_err());
    }

    #[test]
    fn test_operators() {
        let tokens = lex("=> -> == != <= >= += && ||");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::FatArrow,
                TokenKind::Arrow,
                TokenKind::EqEq,
                TokenKind::Ne,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::PlusEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unknown_character() {
        let err = Lexer::new("let x = #;", 0).tokenize().unwrap_err();
        assert!(matches!(err, Error::UnexpectedChar { ch: '#', .. }));
    }
}
