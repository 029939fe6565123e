//! The lexer/tokenizer is treated as an external collaborator to the core
//! passes. This module defines the trait boundary the parser consumes plus
//! one reference implementation, so the workspace still compiles a real
//! program end to end, grounded in `original_source/src/lexer.h` and
//! `token.h`.

use crate::error::CompileErrorKind;
use crate::intern::Interner;
use crate::token::{Ident, Keyword, Operator, SrcPos, SrcRange, Token, TokenKind};

/// What the parser needs from a lexer: one token at a time.
///
/// Implementations must eventually yield `TokenKind::Eof` and keep yielding
/// it on every subsequent call.
pub trait TokenSource {
    fn next_token(&mut self, interner: &mut Interner) -> Token;
}

/// A hand-written character scanner over UTF-8 source text.
///
/// Recognizes the token kinds of the language's surface grammar. A leading
/// `0` on a decimal integer literal raises `AMBIGUOUS_INT` and an unrecognized
/// character raises `UNKNOWN_CHAR`; both are reported via
/// `TokenKind::Invalid` rather than panicking, so the parser's own error
/// recovery stays in control of resynchronization.
pub struct Scanner<'a> {
    chars: Vec<char>,
    pos: usize,
    row: u32,
    col: u32,
    _source: std::marker::PhantomData<&'a str>,
}

impl<'a> Scanner<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        // A synthetic trailing newline guarantees scanning terminates even
        // if the file doesn't end in one.
        let owned: String = if source.ends_with('\n') { source.to_owned() } else { format!("{source}\n") };
        let chars: Vec<char> = owned.chars().collect();
        Self { chars, pos: 0, row: 0, col: 0, _source: std::marker::PhantomData }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.row += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn here(&self) -> SrcPos {
        SrcPos::new(self.row, self.col)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek2() == Some('/') => {
                    while !matches!(self.peek(), Some('\n') | None) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn make(&self, kind: TokenKind, head: SrcPos) -> Token {
        Token::new(kind, SrcRange::new(head, self.here()))
    }
}

impl<'a> TokenSource for Scanner<'a> {
    fn next_token(&mut self, interner: &mut Interner) -> Token {
        self.skip_trivia();
        let head = self.here();
        let Some(c) = self.peek() else {
            return self.make(TokenKind::Eof, head);
        };

        if c.is_ascii_digit() {
            return self.scan_number(head);
        }
        if c == '_' || c.is_alphabetic() {
            return self.scan_word(head, interner);
        }
        if c == '"' {
            return self.scan_string(head, interner);
        }

        self.advance();
        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '+' => TokenKind::Operator(Operator::Plus),
            '*' => TokenKind::Operator(Operator::Star),
            '/' => TokenKind::Operator(Operator::Slash),
            '%' => TokenKind::Operator(Operator::Percent),
            '.' => TokenKind::Operator(Operator::Dot),
            '-' => {
                if self.peek() == Some('>') {
                    self.advance();
                    TokenKind::Arrow
                } else {
                    TokenKind::Operator(Operator::Minus)
                }
            }
            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Operator(Operator::Eq)
                } else {
                    TokenKind::Operator(Operator::Assign)
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Operator(Operator::Ne)
                } else {
                    TokenKind::Operator(Operator::Bang)
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Operator(Operator::Le)
                } else {
                    TokenKind::Operator(Operator::Lt)
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Operator(Operator::Ge)
                } else {
                    TokenKind::Operator(Operator::Gt)
                }
            }
            _ => TokenKind::Invalid(CompileErrorKind::UnknownChar),
        };
        self.make(kind, head)
    }
}

impl<'a> Scanner<'a> {
    fn scan_number(&mut self, head: SrcPos) -> Token {
        let mut text = String::new();
        let leading_zero = self.peek() == Some('0');
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
        }
        let mut is_float = false;
        if self.peek() == Some('.') && matches!(self.peek2(), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            text.push(self.advance().unwrap());
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
        }

        if is_float {
            let value: f64 = text.parse().unwrap_or(0.0);
            return self.make(TokenKind::FloatLiteral(value), head);
        }

        if leading_zero && text.len() > 1 {
            return self.make(TokenKind::Invalid(CompileErrorKind::AmbiguousInt), head);
        }
        let value: i64 = text.parse().unwrap_or(0);
        self.make(TokenKind::IntLiteral(value), head)
    }

    fn scan_word(&mut self, head: SrcPos, interner: &mut Interner) -> Token {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            text.push(self.advance().unwrap());
        }
        let kind = match text.as_str() {
            "var" => TokenKind::Keyword(Keyword::Var),
            "func" => TokenKind::Keyword(Keyword::Func),
            "return" => TokenKind::Keyword(Keyword::Return),
            _ => TokenKind::Identifier(interner.intern(&text)),
        };
        self.make(kind, head)
    }

    fn scan_string(&mut self, head: SrcPos, interner: &mut Interner) -> Token {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    if let Some(escaped) = self.advance() {
                        text.push(escaped);
                    }
                }
                Some(_) => text.push(self.advance().unwrap()),
                None => break,
            }
        }
        let id = interner.intern(&text);
        self.make(TokenKind::StringLiteral(id), head)
    }
}

/// Scans an entire source file up front, used by the parser's lookahead
/// buffer. Returns an empty vector only if the source is genuinely empty
/// after trivia-skipping: a sole EOF token still
/// counts as "scanned".
#[must_use]
pub fn scan_all(source: &str, interner: &mut Interner) -> Vec<Token> {
    let mut scanner = Scanner::new(source);
    let mut tokens = Vec::new();
    loop {
        let tok = scanner.next_token(interner);
        let is_eof = tok.is_eof();
        tokens.push(tok);
        if is_eof {
            break;
        }
    }
    tokens
}

pub fn ident_from_token(tok: &Token) -> Option<Ident> {
    match tok.kind {
        TokenKind::Identifier(name) => Some(Ident::new(name, tok.range)),
        _ => None,
    }
}
