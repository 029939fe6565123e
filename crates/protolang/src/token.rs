//! Source locations and the token value type (C1).
//!
//! Tokens themselves are produced by an external collaborator (the
//! [`crate::lexer`] module) — this module only defines the value types the
//! rest of the core passes around.

use crate::intern::StringId;

/// A zero-based `(row, column)` position in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SrcPos {
    pub row: u32,
    pub col: u32,
}

impl SrcPos {
    #[must_use]
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// An inclusive `(head, tail)` span. `head <= tail` lexicographically.
///
/// The zero/zero span is the synthetic sentinel: "not from source", used for
/// built-in entities that have no textual declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SrcRange {
    pub head: SrcPos,
    pub tail: SrcPos,
}

impl SrcRange {
    #[must_use]
    pub fn new(head: SrcPos, tail: SrcPos) -> Self {
        debug_assert!(head <= tail, "SrcRange::new: head must not exceed tail");
        Self { head, tail }
    }

    /// The synthetic "not from source" sentinel used for built-ins.
    #[must_use]
    pub fn synthetic() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        *self == Self::default()
    }

    /// Lexical precedence used by the forward-reference check in
    /// `Scope::get_backwards`: has `self` (a declaration's full range,
    /// including its initializer) finished *before* `other` (a reference's
    /// range) begins? Strict so that a reference occurring anywhere inside
    /// its own declaration — e.g. a self-referencing initializer — is never
    /// treated as coming after it.
    #[must_use]
    pub fn precedes(&self, other: &SrcRange) -> bool {
        self.tail < other.head
    }
}

/// A name together with the source range of its occurrence, mirroring the
/// original's `Ident` value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident {
    pub name: StringId,
    pub range: SrcRange,
}

impl Ident {
    #[must_use]
    pub fn new(name: StringId, range: SrcRange) -> Self {
        Self { name, range }
    }
}

/// Discriminated token kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    IntLiteral(i64),
    FloatLiteral(f64),
    Identifier(StringId),
    Keyword(Keyword),
    Operator(Operator),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Arrow,
    StringLiteral(StringId),
    /// A malformed lexeme the scanner could not classify; carries the
    /// diagnostic kind it raised so the parser can report and recover
    /// (`AMBIGUOUS_INT`, `UNKNOWN_CHAR`).
    Invalid(crate::error::CompileErrorKind),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Keyword {
    Var,
    Func,
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Operator {
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "*")]
    Star,
    #[strum(serialize = "/")]
    Slash,
    #[strum(serialize = "%")]
    Percent,
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "!")]
    Bang,
    #[strum(serialize = ".")]
    Dot,
}

impl Operator {
    /// The name under which this operator's overload set lives in scope:
    /// `+`, `-`, `*`, `/` are pre-installed under these literal names; user
    /// code never declares new operator overloads, but binary/unary
    /// expressions resolve through the same name.
    #[must_use]
    pub fn overload_name(self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Star => "*",
            Operator::Slash => "/",
            Operator::Percent => "%",
            Operator::Assign => "=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Bang => "!",
            Operator::Dot => ".",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub range: SrcRange,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, range: SrcRange) -> Self {
        Self { kind, range }
    }

    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}
