//! The compile-time error taxonomy, rendered the way the
//! teacher renders its own `ExcType` exception-kind enum: a plain
//! `strum::Display` derive over the kind set, no external error-derive
//! crate, and a `Result` alias threaded through the parser/validator/codegen
//! (mirroring the teacher's `RunResult<T> = Result<T, RunError>`).

use std::fmt;

use crate::token::SrcRange;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Clone, PartialEq, Eq, strum::Display)]
pub enum CompileErrorKind {
    ReadFail,
    EmptyInput,
    AmbiguousInt,
    UnknownChar,
    UnexpectedToken,
    ParenMismatch,
    ExprExpected,
    SymbolRedef,
    NoMatchingOverload,
    AmbiguousOverload,
    CallArity,
    CallTypeMismatch,
    ReturnTypeMismatch,
    FuncAlreadyExists,
    UnsupportedCast,
    Internal,
}

impl CompileErrorKind {
    /// Whether an error of this kind is fatal to the whole compilation
    /// rather than merely diagnosed-and-recovered.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CompileErrorKind::ReadFail
                | CompileErrorKind::EmptyInput
                | CompileErrorKind::FuncAlreadyExists
                | CompileErrorKind::Internal
        )
    }
}

/// A single diagnosed problem, with the source range it refers to and a
/// human-readable message. `message` is free text; only `kind` is load-bearing for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub range: SrcRange,
    pub message: String,
}

impl CompileError {
    #[must_use]
    pub fn new(kind: CompileErrorKind, range: SrcRange, message: impl Into<String>) -> Self {
        Self { kind, range, message: message.into() }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for CompileError {}
