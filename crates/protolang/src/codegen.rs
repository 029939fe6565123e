//! The code generator (C8), grounded in `original_source/src/codegen.cpp`
//! and `code_generator.h`: module/function/body lowering driven from the
//! validated AST, emitted through the [`IrBackend`] trait rather than
//! directly against an LLVM binding, so the lowering rules of §4.6 are
//! backend-agnostic and only [`crate::llvm_backend`] touches `inkwell`.
//!
//! Top-level `func` declarations get ordinary function prototypes +
//! bodies. Top-level `var` declarations have no "current function" of
//! their own (§4.6's locals rule is all written in terms of one), so they
//! are gathered into a single synthesized init function instead — see
//! `codegen_top_level_vars` and `DESIGN.md`'s Open Question 3.

use std::collections::HashMap;

use crate::ast::{AstArena, CompoundElem, DeclId, DeclKind, ExprId, ExprKind, StmtId, StmtKind};
use crate::backend::IrBackend;
use crate::entity::{BuiltinArithOp, CallableId, CallableKind, VarId};
use crate::error::{CompileError, CompileErrorKind, CompileResult};
use crate::intern::Interner;
use crate::scope::ScopeArena;
use crate::token::{Operator, SrcRange};
use crate::types::{ScalarKind, TypeData, TypeId};

pub struct CodeGenerator<'a, 'ctx, B: IrBackend<'ctx>> {
    backend: &'a mut B,
    ast: &'a AstArena,
    scopes: &'a ScopeArena,
    interner: &'a mut Interner,
    var_slots: HashMap<VarId, B::Value>,
    functions: HashMap<CallableId, B::Function>,
    type_cache: HashMap<TypeId, B::Type>,
    current_func: Option<B::Function>,
    _ctx: std::marker::PhantomData<&'ctx ()>,
}

impl<'a, 'ctx, B: IrBackend<'ctx>> CodeGenerator<'a, 'ctx, B> {
    pub fn new(backend: &'a mut B, ast: &'a AstArena, scopes: &'a ScopeArena, interner: &'a mut Interner) -> Self {
        Self {
            backend,
            ast,
            scopes,
            interner,
            var_slots: HashMap::new(),
            functions: HashMap::new(),
            type_cache: HashMap::new(),
            current_func: None,
            _ctx: std::marker::PhantomData,
        }
    }

    /// Lowers every top-level `func` in source order, in two passes so
    /// mutually-referencing calls resolve to an already-declared prototype
    /// (§5: "lowered in the same order" as parsing — a later function can
    /// still be called from an earlier one, since the validator's
    /// forward-reference rule already permits this for callables), then
    /// lowers any top-level `var` declarations into a synthesized init
    /// function (§8 boundary scenario 1: a program consisting of a single
    /// top-level `var` must still produce an entry-block alloca and store).
    pub fn codegen_program(&mut self, program: &[DeclId]) -> CompileResult<()> {
        for &decl_id in program {
            if let DeclKind::Func { callable: Some(callable_id), .. } = &self.ast.decl(decl_id).kind {
                self.declare_prototype(*callable_id)?;
            }
        }
        for &decl_id in program {
            if let DeclKind::Func { callable: Some(callable_id), body: Some(body), params, .. } = &self.ast.decl(decl_id).kind {
                self.codegen_function(*callable_id, params, *body)?;
            }
        }

        let top_level_vars: Vec<DeclId> =
            program.iter().copied().filter(|&d| matches!(self.ast.decl(d).kind, DeclKind::Var { .. })).collect();
        if !top_level_vars.is_empty() {
            self.codegen_top_level_vars(&top_level_vars)?;
        }
        Ok(())
    }

    /// Synthesizes a no-argument, void-returning function whose body is
    /// nothing but an entry-block alloca+store per top-level `var`, in
    /// source order. `$top_level_init` is not a valid identifier in this
    /// language's grammar, so it can never collide with a user-declared
    /// mangled name.
    fn codegen_top_level_vars(&mut self, decls: &[DeclId]) -> CompileResult<()> {
        let void = self.backend.void_type();
        let func = self
            .backend
            .declare_function("$top_level_init", &[], void)
            .ok_or_else(|| internal(SrcRange::synthetic(), "top-level init function already declared"))?;
        self.current_func = Some(func);
        let entry = self.backend.append_block(func, "entry");
        self.backend.set_insert_point(entry);
        for &decl_id in decls {
            self.codegen_local(decl_id)?;
        }
        self.backend.ret(None);
        self.backend
            .verify_function(func)
            .map_err(|msg| CompileError::new(CompileErrorKind::Internal, SrcRange::synthetic(), msg))?;
        self.current_func = None;
        Ok(())
    }

    fn declare_prototype(&mut self, callable_id: CallableId) -> CompileResult<()> {
        let data = self.scopes.entities.callable(callable_id).clone();
        let param_types: Vec<B::Type> = data.func_type.params.iter().map(|(_, t)| self.backend_type(*t)).collect();
        let return_type = self.backend_type(data.func_type.return_type);
        let mangled = self.interner.resolve(data.mangled_name).to_owned();
        match self.backend.declare_function(&mangled, &param_types, return_type) {
            Some(func) => {
                self.functions.insert(callable_id, func);
                Ok(())
            }
            None => Err(CompileError::new(
                CompileErrorKind::FuncAlreadyExists,
                data.declared_in,
                format!("function `{mangled}` already has a declared prototype"),
            )),
        }
    }

    fn backend_type(&mut self, ty: TypeId) -> B::Type {
        if let Some(&cached) = self.type_cache.get(&ty) {
            return cached;
        }
        let bty = match *self.scopes.types.get(ty) {
            TypeData::Void => self.backend.void_type(),
            TypeData::Scalar { kind, bits } => self.backend.scalar_type(kind, bits),
        };
        self.type_cache.insert(ty, bty);
        bty
    }

    /// **Function body.** Entry block, parameter allocas + stores (§4.6).
    fn codegen_function(&mut self, callable_id: CallableId, param_decls: &[DeclId], body: StmtId) -> CompileResult<()> {
        let func = *self.functions.get(&callable_id).expect("prototype declared in the first codegen pass");
        self.current_func = Some(func);
        let entry = self.backend.append_block(func, "entry");
        self.backend.set_insert_point(entry);

        for (index, &pdecl) in param_decls.iter().enumerate() {
            if let DeclKind::Param { resolved_type: Some(ty), var: Some(var_id), .. } = &self.ast.decl(pdecl).kind {
                let ty = *ty;
                let var_id = *var_id;
                let bty = self.backend_type(ty);
                let incoming = self.backend.function_param(func, index);
                let slot = self.backend.alloca_entry(func, bty, &format!("param{index}"));
                self.backend.store(slot, incoming);
                self.var_slots.insert(var_id, slot);
            }
        }

        self.codegen_stmt(body)?;

        self.backend
            .verify_function(func)
            .map_err(|msg| CompileError::new(CompileErrorKind::Internal, SrcRange::synthetic(), msg))?;
        self.current_func = None;
        Ok(())
    }

    fn codegen_stmt(&mut self, id: StmtId) -> CompileResult<()> {
        match self.ast.stmt(id).kind.clone() {
            StmtKind::Compound(elems) => {
                for elem in elems {
                    match elem {
                        CompoundElem::Decl(d) => self.codegen_local(d)?,
                        CompoundElem::Stmt(s) => self.codegen_stmt(s)?,
                    }
                }
                Ok(())
            }
            StmtKind::Return(expr) => {
                let value = self.codegen_expr(expr)?;
                self.backend.ret(Some(value));
                Ok(())
            }
            StmtKind::Expr(expr) => {
                self.codegen_expr(expr)?;
                Ok(())
            }
        }
    }

    /// **Locals (`VarDecl`).** Always `alloca` in the current function's
    /// entry block, regardless of where the statement textually lives
    /// (§4.6) — `alloca_entry` is the backend's hook for that.
    fn codegen_local(&mut self, decl_id: DeclId) -> CompileResult<()> {
        let (ty, init, var_id) = match &self.ast.decl(decl_id).kind {
            DeclKind::Var { resolved_type: Some(ty), init, var: Some(var_id), .. } => (*ty, *init, *var_id),
            _ => return Err(internal(self.ast.decl(decl_id).range, "local var decl reached codegen without a resolved type/slot")),
        };
        let func = self.current_func.expect("locals are only codegen'd inside a function body");
        let bty = self.backend_type(ty);
        let slot = self.backend.alloca_entry(func, bty, "local");
        let value = self.codegen_expr(init)?;
        self.backend.store(slot, value);
        self.var_slots.insert(var_id, slot);
        Ok(())
    }

    fn codegen_expr(&mut self, id: ExprId) -> CompileResult<B::Value> {
        let range = self.ast.expr(id).range;
        let cast_target = self.ast.expr(id).cast_target;
        let kind = self.ast.expr(id).kind.clone();

        let raw = match kind {
            ExprKind::IntLiteral(v) => {
                let ty = self.literal_type("int");
                self.backend.int_const(ty, v)
            }
            ExprKind::FloatLiteral(v) => {
                let ty = self.literal_type("double");
                self.backend.float_const(ty, v)
            }
            ExprKind::Ident { resolved_var: Some(var_id), .. } => {
                let slot = *self
                    .var_slots
                    .get(&var_id)
                    .ok_or_else(|| internal(range, "read of a variable that has no stack slot yet"))?;
                let ty = self.backend_type(self.scopes.entities.var(var_id).ty);
                self.backend.load(ty, slot, "load")
            }
            ExprKind::Ident { resolved_var: None, .. } => {
                return Err(internal(range, "identifier reached codegen unresolved"));
            }
            ExprKind::Grouped(inner) => self.codegen_expr(inner)?,
            ExprKind::Binary { op, left, right, .. } if op == Operator::Assign => {
                let value = self.codegen_expr(right)?;
                let var_id = match &self.ast.expr(left).kind {
                    ExprKind::Ident { resolved_var: Some(v), .. } => *v,
                    _ => return Err(internal(range, "assignment target reached codegen unresolved")),
                };
                let slot = *self
                    .var_slots
                    .get(&var_id)
                    .ok_or_else(|| internal(range, "assignment to a variable with no stack slot yet"))?;
                self.backend.store(slot, value);
                value
            }
            ExprKind::Binary { left, right, resolved_callable: Some(callable_id), .. } => {
                let lhs = self.codegen_expr(left)?;
                let rhs = self.codegen_expr(right)?;
                self.emit_call(callable_id, &[lhs, rhs], range)?
            }
            ExprKind::Unary { operand, resolved_callable: Some(callable_id), .. } => {
                let v = self.codegen_expr(operand)?;
                self.emit_call(callable_id, &[v], range)?
            }
            ExprKind::Binary { resolved_callable: None, .. } | ExprKind::Unary { resolved_callable: None, .. } => {
                return Err(internal(range, "operator expression reached codegen without a resolved overload"));
            }
            ExprKind::Call { args, resolved_callable: Some(callable_id), .. } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.codegen_expr(arg)?);
                }
                self.emit_call(callable_id, &values, range)?
            }
            ExprKind::Call { resolved_callable: None, .. } => {
                return Err(internal(range, "call expression reached codegen without a resolved callee"));
            }
            ExprKind::Index { .. } | ExprKind::Member { .. } => {
                // §9 open question 4: subscript/member access is parsed but
                // stubbed here rather than lowered.
                return Err(CompileError::new(
                    CompileErrorKind::UnsupportedCast,
                    range,
                    "subscript/member-access expressions have no code generation lowering",
                ));
            }
        };

        self.apply_cast(raw, cast_target, id)
    }

    /// `int`/`double` are always-present keywords; see the identical note
    /// on `Validator::literal_type`.
    fn literal_type(&mut self, keyword: &str) -> TypeId {
        let name = self.interner.intern(keyword);
        self.scopes.get_keyword_type(name).expect("scalar keywords are installed by builtins::install")
    }

    fn emit_call(&mut self, callable_id: CallableId, args: &[B::Value], range: SrcRange) -> CompileResult<B::Value> {
        let data = self.scopes.entities.callable(callable_id).clone();
        match data.kind {
            CallableKind::UserFunc(_) => {
                let func = *self
                    .functions
                    .get(&callable_id)
                    .ok_or_else(|| internal(range, "call to a user function with no declared prototype"))?;
                self.backend
                    .call(func, args, "call")
                    .ok_or_else(|| internal(range, "call result used as a value but the callee returns void"))
            }
            CallableKind::BuiltinArith(op, kind, _bits) => {
                let (lhs, rhs) = (args[0], args[1]);
                Ok(self.emit_arith(op, kind, lhs, rhs))
            }
        }
    }

    /// **Built-in arithmetic `emit_call`** (§4.6). `UInt` gets the same
    /// no-signed-wrap flags as signed `Int` — the source's own quirk (§9
    /// open question 2), followed literally rather than "fixed".
    fn emit_arith(&mut self, op: BuiltinArithOp, kind: ScalarKind, lhs: B::Value, rhs: B::Value) -> B::Value {
        match (op, kind) {
            (BuiltinArithOp::Add, ScalarKind::Int | ScalarKind::UInt) => self.backend.add_nsw(lhs, rhs),
            (BuiltinArithOp::Add, ScalarKind::Float | ScalarKind::Double) => self.backend.fadd(lhs, rhs),
            (BuiltinArithOp::Sub, ScalarKind::Int | ScalarKind::UInt) => self.backend.sub_nsw(lhs, rhs),
            (BuiltinArithOp::Sub, ScalarKind::Float | ScalarKind::Double) => self.backend.fsub(lhs, rhs),
            (BuiltinArithOp::Mul, ScalarKind::Int | ScalarKind::UInt) => self.backend.mul_nsw(lhs, rhs),
            (BuiltinArithOp::Mul, ScalarKind::Float | ScalarKind::Double) => self.backend.fmul(lhs, rhs),
            (BuiltinArithOp::Div, ScalarKind::Int) => self.backend.sdiv(lhs, rhs),
            (BuiltinArithOp::Div, ScalarKind::UInt) => self.backend.udiv(lhs, rhs),
            (BuiltinArithOp::Div, ScalarKind::Float | ScalarKind::Double) => self.backend.fdiv(lhs, rhs),
        }
    }

    /// Applies the validator's implicit-cast annotation, if any, following
    /// §4.4's lowering table. §9 open question 1 (sign- vs. zero-extend for
    /// unsigned widening) is resolved to match the source literally: always
    /// sign-extend.
    fn apply_cast(&mut self, value: B::Value, target: Option<TypeId>, id: ExprId) -> CompileResult<B::Value> {
        let Some(target) = target else { return Ok(value) };
        let range = self.ast.expr(id).range;
        let from = self
            .ast
            .expr(id)
            .resolved_type
            .ok_or_else(|| internal(range, "cast target set on a node with no resolved source type"))?;
        if self.scopes.types.equals(from, target) {
            return Ok(value);
        }
        let to_bty = self.backend_type(target);
        let from_data = *self.scopes.types.get(from);
        let to_data = *self.scopes.types.get(target);
        let cast = match (from_data, to_data) {
            (TypeData::Scalar { kind: ScalarKind::Double, .. }, TypeData::Scalar { kind: ScalarKind::Float, .. }) => {
                self.backend.fptrunc(value, to_bty)
            }
            (TypeData::Scalar { kind: ScalarKind::Float, .. }, TypeData::Scalar { kind: ScalarKind::Double, .. }) => {
                self.backend.fpext(value, to_bty)
            }
            (TypeData::Scalar { kind: k1, bits: b1 }, TypeData::Scalar { kind: k2, bits: b2 }) if k1 == k2 && b1 < b2 => {
                self.backend.sext(value, to_bty)
            }
            (TypeData::Scalar { kind: k1, bits: b1 }, TypeData::Scalar { kind: k2, bits: b2 }) if k1 == k2 && b1 > b2 => {
                self.backend.trunc(value, to_bty)
            }
            (TypeData::Scalar { kind: k1, bits: b1 }, TypeData::Scalar { kind: k2, bits: b2 }) if k1 == k2 && b1 == b2 => {
                self.backend.bitcast(value, to_bty)
            }
            _ => return Err(CompileError::new(CompileErrorKind::UnsupportedCast, range, "no lowering defined for this implicit cast")),
        };
        Ok(cast)
    }
}

fn internal(range: SrcRange, message: &str) -> CompileError {
    CompileError::new(CompileErrorKind::Internal, range, message)
}
