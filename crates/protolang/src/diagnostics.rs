//! Diagnostic accumulation and rendering, grounded in the original's
//! `Log`/`Logger` (`log.h`, `logger.h`): severity, a source range, and a
//! renderer that is independent of what accumulates the diagnostics.

use std::io::{self, Write};

use crate::error::{CompileError, CompileErrorKind};
use crate::token::SrcRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl CompileErrorKind {
    #[must_use]
    pub fn severity(&self) -> Severity {
        if self.is_fatal() {
            Severity::Fatal
        } else if matches!(self, CompileErrorKind::AmbiguousInt) {
            Severity::Warning
        } else {
            Severity::Error
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub range: SrcRange,
    pub message: String,
}

impl From<&CompileError> for Diagnostic {
    fn from(err: &CompileError) -> Self {
        Diagnostic { severity: err.kind.severity(), range: err.range, message: err.message.clone() }
    }
}

/// Accumulates diagnostics and renders them to any `io::Write`, mirroring
/// the teacher's pattern of keeping rendering logic out of the types that
/// collect errors in the first place.
#[derive(Debug, Default)]
pub struct Logger {
    diagnostics: Vec<Diagnostic>,
}

impl Logger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, diag: Diagnostic) {
        self.diagnostics.push(diag);
    }

    pub fn log_error(&mut self, err: &CompileError) {
        self.log(Diagnostic::from(err));
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d.severity, Severity::Error | Severity::Fatal))
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Render every accumulated diagnostic, one line per diagnostic plus a
    /// source excerpt when `source` is available, matching the original's
    /// `Logger::print(CodeRef)`.
    pub fn render(&self, mut out: impl Write, source: Option<&str>) -> io::Result<()> {
        for diag in &self.diagnostics {
            writeln!(
                out,
                "{}: {} (at {}:{}-{}:{})",
                diag.severity,
                diag.message,
                diag.range.head.row + 1,
                diag.range.head.col + 1,
                diag.range.tail.row + 1,
                diag.range.tail.col + 1
            )?;
            if let Some(src) = source {
                if let Some(line) = src.lines().nth(diag.range.head.row as usize) {
                    writeln!(out, "  {line}")?;
                    writeln!(out, "  {}^", " ".repeat(diag.range.head.col as usize))?;
                }
            }
        }
        Ok(())
    }
}
