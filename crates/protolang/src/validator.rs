//! The pre-codegen validation walk (C7), grounded in
//! `original_source/src/typechecker.h`/`typechecker.cpp`. The original's
//! `check_type` overrides are mostly thin (`VarDecl::check_type` in
//! particular is an empty stub) — this module performs the substantive
//! checks spec.md §4.5 actually describes, filling every gap the original's
//! own incompleteness leaves with a deliberate, documented choice rather
//! than inventing a new error kind per gap (see `DESIGN.md`).
//!
//! Errors accumulate in the [`Logger`]; `success` reflects whether any were
//! raised, mirroring `CodeGenerator`'s own `bool& success` out-parameter in
//! the original.

use crate::ast::{AstArena, CompoundElem, DeclId, DeclKind, ExprId, ExprKind, StmtId, StmtKind};
use crate::diagnostics::Logger;
use crate::entity::{CallableId, VarId};
use crate::error::{CompileError, CompileErrorKind};
use crate::intern::Interner;
use crate::scope::{ScopeArena, ScopeId};
use crate::token::{Operator, SrcRange};
use crate::types::TypeId;

pub struct Validator<'a> {
    logger: &'a mut Logger,
    interner: &'a mut Interner,
    scopes: &'a mut ScopeArena,
    ast: &'a mut AstArena,
    success: bool,
}

impl<'a> Validator<'a> {
    pub fn new(logger: &'a mut Logger, interner: &'a mut Interner, scopes: &'a mut ScopeArena, ast: &'a mut AstArena) -> Self {
        Self { logger, interner, scopes, ast, success: true }
    }

    /// Validates every top-level declaration in source order (§5: "validated
    /// in AST traversal order — pre-order over the program"). Returns
    /// whether code generation may proceed: parser-recovered diagnostics
    /// (logged via `sync()` during parsing, before this walk ever runs)
    /// must fail validation just as much as an error raised here, so this
    /// also consults `logger.has_errors()` rather than only this walk's own
    /// `success` flag.
    pub fn validate(mut self, program: &[DeclId]) -> bool {
        for &decl in program {
            self.validate_decl(decl);
        }
        self.success && !self.logger.has_errors()
    }

    fn fail(&mut self, err: CompileError) {
        self.logger.log_error(&err);
        self.success = false;
    }

    fn validate_decl(&mut self, id: DeclId) {
        match self.ast.decl(id).kind.clone() {
            DeclKind::Var { init, resolved_type, .. } => {
                self.validate_expr(init);
                // §4.5 item 6: the initializer's type must be `accepts`-
                // compatible with the declared type. The taxonomy (§7) has
                // no dedicated "var-init mismatch" kind, so this reuses
                // `ReturnTypeMismatch` — the closest existing "expression
                // type doesn't fit its context" kind — rather than adding a
                // seventeenth variant for one call site.
                if let Some(declared) = resolved_type {
                    self.check_assignable(declared, init, "variable initializer");
                }
            }
            DeclKind::Param { .. } => {}
            DeclKind::Func { body, resolved_return_type, .. } => {
                if let Some(body) = body {
                    self.validate_stmt(body, resolved_return_type);
                }
            }
        }
    }

    fn validate_stmt(&mut self, id: StmtId, enclosing_return: Option<TypeId>) {
        match self.ast.stmt(id).kind.clone() {
            StmtKind::Compound(elems) => {
                for elem in elems {
                    match elem {
                        CompoundElem::Decl(d) => self.validate_decl(d),
                        CompoundElem::Stmt(s) => self.validate_stmt(s, enclosing_return),
                    }
                }
            }
            StmtKind::Return(expr) => {
                self.validate_expr(expr);
                if let Some(ret_ty) = enclosing_return {
                    self.check_assignable(ret_ty, expr, "return value");
                }
            }
            StmtKind::Expr(expr) => {
                self.validate_expr(expr);
            }
        }
    }

    /// §4.5 items 1–4: resolves every expression's type, caching it on the
    /// node, and (for `Binary`/`Unary`/`Call`) the overload-resolved callee.
    fn validate_expr(&mut self, id: ExprId) -> Option<TypeId> {
        let range = self.ast.expr(id).range;
        let scope = self.ast.expr(id).scope;
        let kind = self.ast.expr(id).kind.clone();

        let resolved = match kind {
            ExprKind::IntLiteral(_) => self.literal_type("int"),
            ExprKind::FloatLiteral(_) => self.literal_type("double"),
            ExprKind::Ident { name, .. } => {
                // Locals may not be forward-referenced; callables and types
                // may be (§4.5 item 1). An `Ident` expression can only ever
                // resolve to a variable — callables are referenced through
                // call syntax, types never appear as expressions — so the
                // forward-reference restriction always applies here.
                match self.scopes.get_backwards::<VarId>(scope, name.name, range) {
                    Some(var_id) => {
                        self.ast.expr_mut(id).kind = ExprKind::Ident { name, resolved_var: Some(var_id) };
                        Some(self.scopes.entities.var(var_id).ty)
                    }
                    None => {
                        let ident = self.interner.resolve(name.name).to_owned();
                        self.fail(CompileError::new(
                            CompileErrorKind::NoMatchingOverload,
                            range,
                            format!("`{ident}` is not a known variable in scope, or is referenced before its declaration"),
                        ));
                        None
                    }
                }
            }
            ExprKind::Grouped(inner) => self.validate_expr(inner),
            ExprKind::Unary { op, operand, .. } => {
                let operand_ty = self.validate_expr(operand);
                self.resolve_operator(id, op.overload_name(), range, scope, &[operand], operand_ty.map(|t| vec![t]))
            }
            ExprKind::Binary { op, left, right, .. } if op == Operator::Assign => self.validate_assign(left, right, range),
            ExprKind::Binary { op, left, right, .. } => {
                let lt = self.validate_expr(left);
                let rt = self.validate_expr(right);
                let arg_types = match (lt, rt) {
                    (Some(a), Some(b)) => Some(vec![a, b]),
                    _ => None,
                };
                self.resolve_operator(id, op.overload_name(), range, scope, &[left, right], arg_types)
            }
            ExprKind::Call { callee, args, .. } => self.validate_call(id, callee, args, range, scope),
            ExprKind::Index { base, args } => {
                self.validate_expr(base);
                for a in args {
                    self.validate_expr(a);
                }
                // §9 open question 4: subscript has no codegen lowering;
                // left untyped deliberately (see DESIGN.md).
                None
            }
            ExprKind::Member { base, field } => {
                self.validate_expr(base);
                self.validate_expr(field);
                None
            }
        };

        self.ast.expr_mut(id).resolved_type = resolved;
        resolved
    }

    /// `int`/`double` are always pre-installed keywords (§4.4); looked up
    /// through the interner rather than cached, since every scalar keyword
    /// name is already resident after `builtins::install` and re-interning
    /// an existing string is a dedup lookup, not a fresh allocation.
    fn literal_type(&mut self, keyword: &str) -> Option<TypeId> {
        let name = self.interner.intern(keyword);
        self.scopes.get_keyword_type(name)
    }

    fn validate_assign(&mut self, left: ExprId, right: ExprId, range: SrcRange) -> Option<TypeId> {
        let right_ty = self.validate_expr(right);
        let left_is_var = matches!(self.ast.expr(left).kind, ExprKind::Ident { .. });
        let left_ty = self.validate_expr(left);
        if !left_is_var {
            self.fail(CompileError::new(CompileErrorKind::CallTypeMismatch, range, "assignment target must be a variable"));
            return None;
        }
        let (Some(lt), Some(rt)) = (left_ty, right_ty) else { return None };
        if self.scopes.types.equals(lt, rt) {
            // exact match, no cast needed
        } else if self.scopes.types.accepts(lt, rt) {
            self.ast.expr_mut(right).cast_target = Some(lt);
        } else {
            self.fail(CompileError::new(
                CompileErrorKind::ReturnTypeMismatch,
                range,
                "assigned value's type is not compatible with the variable's declared type",
            ));
            return None;
        }
        // `resolved_callable` stays `None` on this Binary node: codegen
        // reads that as the sentinel meaning "this is a store, not an
        // overload call" — there is no builtin `=` overload to resolve to.
        Some(lt)
    }

    /// Shared by `Unary`/`Binary` (non-assignment) lowering: both resolve
    /// through the same overload-resolution path keyed by the operator's
    /// literal symbol text. Since `builtins::install` only ever installs
    /// `+`/`-`/`*`/`/` as 2-ary overload sets, every comparison operator and
    /// every unary expression deterministically fails here with
    /// `NoMatchingOverload` — a faithful consequence of the grammar's
    /// operator set outrunning the installed built-ins, not a bug.
    fn resolve_operator(
        &mut self,
        id: ExprId,
        symbol: &str,
        range: SrcRange,
        scope: ScopeId,
        operands: &[ExprId],
        arg_types: Option<Vec<TypeId>>,
    ) -> Option<TypeId> {
        let arg_types = arg_types?;
        let name = self.interner.intern(symbol);
        match self.scopes.overload_resolution(scope, name, range, &arg_types, self.interner) {
            Ok(callable_id) => {
                self.set_resolved_callable(id, callable_id);
                self.install_arg_casts(callable_id, operands, &arg_types);
                Some(self.scopes.entities.callable(callable_id).func_type.return_type)
            }
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    fn validate_call(&mut self, id: ExprId, callee: ExprId, args: Vec<ExprId>, range: SrcRange, scope: ScopeId) -> Option<TypeId> {
        let arg_types: Vec<Option<TypeId>> = args.iter().map(|&a| self.validate_expr(a)).collect();
        let name = match &self.ast.expr(callee).kind {
            ExprKind::Ident { name, .. } => Some(*name),
            // §4.5's algorithm only covers calls whose callee is an
            // identifier; a non-identifier callee (e.g. `f()()`) has no
            // overload set to resolve against. `CALL_TYPE_MISMATCH` is
            // otherwise unused by the literal overload-resolution
            // algorithm, so it gets a concrete purpose here.
            _ => None,
        };
        let Some(name) = name else {
            self.fail(CompileError::new(CompileErrorKind::CallTypeMismatch, range, "call target must be a named function"));
            return None;
        };
        if arg_types.iter().any(Option::is_none) {
            return None;
        }
        let arg_types: Vec<TypeId> = arg_types.into_iter().map(Option::unwrap).collect();
        match self.scopes.overload_resolution(scope, name.name, range, &arg_types, self.interner) {
            Ok(callable_id) => {
                self.set_resolved_callable(id, callable_id);
                self.install_arg_casts(callable_id, &args, &arg_types);
                Some(self.scopes.entities.callable(callable_id).func_type.return_type)
            }
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    /// §4.5 item 4: annotate each argument with an implicit-cast target
    /// when its natural type doesn't exactly `equals` the parameter type
    /// (but does `accepts`, which overload resolution already guaranteed).
    fn install_arg_casts(&mut self, callable_id: CallableId, args: &[ExprId], arg_types: &[TypeId]) {
        let param_types: Vec<TypeId> =
            self.scopes.entities.callable(callable_id).func_type.params.iter().map(|(_, t)| *t).collect();
        for ((&arg, &arg_ty), &param_ty) in args.iter().zip(arg_types).zip(&param_types) {
            if !self.scopes.types.equals(param_ty, arg_ty) {
                self.ast.expr_mut(arg).cast_target = Some(param_ty);
            }
        }
    }

    fn set_resolved_callable(&mut self, id: ExprId, callable_id: CallableId) {
        match &mut self.ast.expr_mut(id).kind {
            ExprKind::Unary { resolved_callable, .. }
            | ExprKind::Binary { resolved_callable, .. }
            | ExprKind::Call { resolved_callable, .. } => *resolved_callable = Some(callable_id),
            _ => unreachable!("set_resolved_callable only called for overload-resolved node kinds"),
        }
    }

    fn check_assignable(&mut self, declared: TypeId, value: ExprId, what: &str) {
        let Some(value_ty) = self.ast.expr(value).resolved_type else { return };
        if self.scopes.types.equals(declared, value_ty) {
            return;
        }
        if self.scopes.types.accepts(declared, value_ty) {
            self.ast.expr_mut(value).cast_target = Some(declared);
            return;
        }
        let range = self.ast.expr(value).range;
        self.fail(CompileError::new(
            CompileErrorKind::ReturnTypeMismatch,
            range,
            format!("{what}'s type is not compatible with its expected type"),
        ));
    }
}
