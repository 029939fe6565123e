//! `protolang`: parser, scope/symbol environment, type system, validator and
//! SSA code generator for a small statically-typed procedural language,
//! grounded throughout in `original_source/src/compiler.cpp`'s pipeline
//! (`Compiler::compile`): read source → lex → parse → validate → codegen →
//! emit object → link.

#![allow(clippy::module_name_repetitions)]

pub mod ast;
pub mod backend;
pub mod builtins;
pub mod codegen;
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod intern;
pub mod lexer;
pub mod linker;
pub mod parser;
pub mod scope;
pub mod token;
pub mod types;
pub mod validator;

#[cfg(feature = "llvm-backend")]
pub mod llvm_backend;

use std::io;

use ast::AstArena;
use diagnostics::Logger;
use error::{CompileError, CompileErrorKind};
use intern::Interner;
use parser::Parser;
use scope::ScopeArena;
use validator::Validator;

/// A single translation unit's compilation state: the arenas and logger a
/// `Compilation` owns for its lifetime, mirroring `Compiler`'s member
/// fields in the original (`m_logger`, the root `Scope`, and — via
/// `CodeGenerator` — the LLVM module).
pub struct Compilation {
    pub interner: Interner,
    pub scopes: ScopeArena,
    pub ast: AstArena,
    pub logger: Logger,
}

impl Compilation {
    /// Builds a fresh session with `void` + the scalar keyword table +
    /// built-in arithmetic overloads already installed (§6: "the root scope
    /// is never empty").
    pub fn new() -> Result<Self, CompileError> {
        let mut interner = Interner::new();
        let empty = interner.intern("");
        let mut scopes = ScopeArena::new(empty);
        builtins::install(&mut scopes, &mut interner)?;
        Ok(Self { interner, scopes, ast: AstArena::new(), logger: Logger::new() })
    }

    /// Lexes and parses `source`, registering declarations as they're
    /// parsed. Mirrors `Compiler::compile`'s "读取源代码" / "词法分析" /
    /// "语法分析" steps up to (not including) validation. `EMPTY_INPUT`
    /// (§7) fires when the scanner produces nothing but the trailing EOF
    /// token — an empty or all-whitespace file.
    pub fn parse(&mut self, source: &str) -> Result<(), CompileError> {
        let tokens = lexer::scan_all(source, &mut self.interner);
        if tokens.len() <= 1 {
            return Err(CompileError::new(CompileErrorKind::EmptyInput, token::SrcRange::synthetic(), "input is empty"));
        }
        let root = self.scopes.root();
        let parser = Parser::new(tokens, root, &mut self.logger, &mut self.interner, &mut self.scopes, &mut self.ast);
        parser.parse();
        Ok(())
    }

    /// Runs the validation walk (C7) and reports whether code generation
    /// may proceed, matching `program->validate(success)`.
    #[must_use]
    pub fn validate(&mut self) -> bool {
        let validator = Validator::new(&mut self.logger, &mut self.interner, &mut self.scopes, &mut self.ast);
        validator.validate(&self.ast.program)
    }

    /// Lowers every function body to the given backend, matching
    /// `program->codegen(g, success)`.
    pub fn codegen<'ctx, B: backend::IrBackend<'ctx>>(&mut self, backend: &mut B) -> Result<(), CompileError> {
        let mut gen = codegen::CodeGenerator::new(backend, &self.ast, &self.scopes, &mut self.interner);
        gen.codegen_program(&self.ast.program)
    }

    pub fn render_diagnostics(&self, out: impl io::Write, source: &str) -> io::Result<()> {
        self.logger.render(out, Some(source))
    }
}

impl Default for Compilation {
    fn default() -> Self {
        Self::new().expect("builtins::install never fails against a fresh arena")
    }
}
