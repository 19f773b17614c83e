//! Lexer for textual index notation.
//!
//! Produces tokens on demand; the parser pulls one token of lookahead.

use crate::frontend::token::{Token, TokenKind};
use crate::utils::errors::{LexerError, LexerErrorKind};
use crate::utils::location::{SourceLocation, Span};
use std::iter::Peekable;
use std::str::CharIndices;
use unicode_xid::UnicodeXID;

pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    /// Position of the next unread character
    position: SourceLocation,
    /// Start of the token being scanned
    start: SourceLocation,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            position: SourceLocation::start(),
            start: SourceLocation::start(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let (offset, c) = self.chars.next()?;
        self.position.offset = offset + c.len_utf8();
        if c == '\n' {
            self.position.line += 1;
            self.position.column = 1;
        } else {
            self.position.column += 1;
        }
        Some(c)
    }

    fn bump_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
    }

    fn span(&self) -> Span {
        Span::new(self.start, self.position)
    }

    fn token(&self, kind: TokenKind) -> Token {
        let span = self.span();
        Token::new(kind, span, self.source[span.range()].to_string())
    }

    fn error(&self, kind: LexerErrorKind, message: String) -> LexerError {
        LexerError { message, span: self.span(), kind }
    }

    /// `plain`, or `compound` when followed by `=`.
    fn operator(&mut self, plain: TokenKind, compound: TokenKind) -> Token {
        if self.peek() == Some('=') {
            self.bump();
            self.token(compound)
        } else {
            self.token(plain)
        }
    }

    /// Digits, an optional fraction and an optional exponent. `seen_dot`
    /// is set when the literal started with `.`.
    fn number(&mut self, seen_dot: bool) -> Result<Token, LexerError> {
        self.bump_while(|c| c.is_ascii_digit());
        let mut kind = if seen_dot { TokenKind::Float } else { TokenKind::Integer };

        if !seen_dot && self.peek() == Some('.') {
            self.bump();
            self.bump_while(|c| c.is_ascii_digit());
            kind = TokenKind::Float;
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.error(LexerErrorKind::InvalidNumber, "Missing digits in exponent".to_string()));
            }
            self.bump_while(|c| c.is_ascii_digit());
            kind = TokenKind::Float;
        }

        Ok(self.token(kind))
    }

    fn word(&mut self) -> Token {
        self.bump_while(|c| c.is_xid_continue());
        let span = self.span();
        let kind = TokenKind::keyword(&self.source[span.range()]).unwrap_or(TokenKind::Identifier);
        self.token(kind)
    }

    /// Scan the next token; at the end of input this keeps returning `Eof`.
    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.bump_while(char::is_whitespace);
        self.start = self.position;

        let Some(c) = self.bump() else {
            return Ok(self.token(TokenKind::Eof));
        };

        match c {
            '(' => Ok(self.token(TokenKind::LeftParen)),
            ')' => Ok(self.token(TokenKind::RightParen)),
            ',' => Ok(self.token(TokenKind::Comma)),
            '=' => Ok(self.token(TokenKind::Equal)),
            '+' => Ok(self.operator(TokenKind::Plus, TokenKind::PlusEqual)),
            '-' => Ok(self.operator(TokenKind::Minus, TokenKind::MinusEqual)),
            '*' => Ok(self.operator(TokenKind::Star, TokenKind::StarEqual)),
            '/' => Ok(self.operator(TokenKind::Slash, TokenKind::SlashEqual)),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.number(true),
            c if c.is_ascii_digit() => self.number(false),
            c if c == '_' || c.is_xid_start() => Ok(self.word()),
            c => Err(self.error(LexerErrorKind::UnexpectedChar, format!("Unexpected character '{}'", c))),
        }
    }

    /// All tokens of the input, ending with `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}
