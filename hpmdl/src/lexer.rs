//! Tokenizer for HPM-DL source text.

use crate::error::{ParseError, Position};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    /// Numeric literal. `text` keeps the source spelling so integer-only
    /// positions (dimensions, sizes) can reject `2.5`.
    Number { value: f64, text: String },
    Str(String),
    Colon,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Eq,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    /// `·`
    MiddleDot,
    /// `⊗`
    Otimes,
    /// `†`
    Dagger,
    Eof,
}

impl TokenKind {
    /// Human-readable description used in parse errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("`{name}`"),
            Self::Number { text, .. } => format!("number {text}"),
            Self::Str(s) => format!("string \"{s}\""),
            Self::Colon => "`:`".into(),
            Self::Comma => "`,`".into(),
            Self::LParen => "`(`".into(),
            Self::RParen => "`)`".into(),
            Self::LBracket => "`[`".into(),
            Self::RBracket => "`]`".into(),
            Self::LBrace => "`{`".into(),
            Self::RBrace => "`}`".into(),
            Self::Eq => "`=`".into(),
            Self::Plus => "`+`".into(),
            Self::Minus => "`-`".into(),
            Self::Star => "`*`".into(),
            Self::Slash => "`/`".into(),
            Self::Caret => "`^`".into(),
            Self::MiddleDot => "`·`".into(),
            Self::Otimes => "`⊗`".into(),
            Self::Dagger => "`†`".into(),
            Self::Eof => "end of input".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
}

/// Split source text into tokens, terminated by a single `Eof` token.
///
/// # Errors
///
/// Returns [`ParseError`] on characters outside the language, unterminated
/// strings and malformed numeric literals.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer { chars: source.chars().collect(), idx: 0, line: 1, col: 1 };
    let mut tokens = Vec::new();

    loop {
        lexer.skip_trivia();
        let pos = lexer.position();
        let Some(ch) = lexer.peek() else {
            tokens.push(Token { kind: TokenKind::Eof, pos });
            return Ok(tokens);
        };

        let kind = match ch {
            c if c.is_ascii_digit() => lexer.number(pos)?,
            '.' if lexer.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => lexer.number(pos)?,
            c if c.is_ascii_alphabetic() || c == '_' => TokenKind::Ident(lexer.ident()),
            '"' => lexer.string(pos)?,
            _ => {
                let kind = match ch {
                    ':' => TokenKind::Colon,
                    ',' => TokenKind::Comma,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    '=' => TokenKind::Eq,
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' => TokenKind::Star,
                    '/' => TokenKind::Slash,
                    '^' => TokenKind::Caret,
                    '·' => TokenKind::MiddleDot,
                    '⊗' => TokenKind::Otimes,
                    '†' => TokenKind::Dagger,
                    other => return Err(ParseError::UnexpectedChar { pos, ch: other }),
                };
                lexer.bump();
                kind
            }
        };
        tokens.push(Token { kind, pos });
    }
}

struct Lexer {
    chars: Vec<char>,
    idx: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    fn position(&self) -> Position {
        Position { line: self.line, col: self.col }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.idx + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.idx += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    /// Skip whitespace and `//` line comments.
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.bump();
            } else if ch == '/' && self.peek_at(1) == Some('/') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek().filter(|c| c.is_ascii_alphanumeric() || *c == '_') {
            out.push(ch);
            self.bump();
        }
        out
    }

    fn digits(&mut self, out: &mut String) {
        while let Some(ch) = self.peek().filter(char::is_ascii_digit) {
            out.push(ch);
            self.bump();
        }
    }

    fn number(&mut self, pos: Position) -> Result<TokenKind, ParseError> {
        let mut text = String::new();
        self.digits(&mut text);

        if self.peek() == Some('.') {
            text.push('.');
            self.bump();
            self.digits(&mut text);
        }

        // Exponent only when digits follow, so `2e` lexes as `2` then `e`.
        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    if let Some(c) = self.bump() {
                        text.push(c);
                    }
                }
                self.digits(&mut text);
            }
        }

        let value = text
            .parse::<f64>()
            .map_err(|_| ParseError::MalformedNumber { pos, text: text.clone() })?;
        Ok(TokenKind::Number { value, text })
    }

    fn string(&mut self, pos: Position) -> Result<TokenKind, ParseError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(TokenKind::Str(out)),
                Some(ch) => out.push(ch),
                None => return Err(ParseError::UnterminatedString { pos }),
            }
        }
    }
}

#[cfg(test)]
#[path = "lexer_test.rs"]
mod tests;
