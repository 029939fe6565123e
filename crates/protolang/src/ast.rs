//! The AST (C4): typed expression/statement/declaration nodes, arena-owned
//! and referenced by typed index, grounded in `original_source/src/ast.h`
//! and `parser.h`'s node shapes, generalized to the fuller grammar (`=`
//! assignment, postfix call/subscript, `.` member chains, `return`).

use crate::entity::{CallableId, VarId};
use crate::scope::ScopeId;
use crate::token::{Ident, Operator, SrcRange};
use crate::types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u32);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtId(u32);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(u32);

impl ExprId {
    fn new(i: usize) -> Self {
        Self(i.try_into().expect("expr arena overflow"))
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}
impl StmtId {
    fn new(i: usize) -> Self {
        Self(i.try_into().expect("stmt arena overflow"))
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}
impl DeclId {
    fn new(i: usize) -> Self {
        Self(i.try_into().expect("decl arena overflow"))
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Every expression node caches, post-validation, its resolved type and
/// (for `Binary`/`Unary`/`Call`) the overload-resolved callee, plus an
/// optional implicit-cast target installed by the validator when the
/// node's natural type doesn't exactly `equal` what its context requires.
#[derive(Debug, Clone)]
pub struct ExprData {
    pub kind: ExprKind,
    pub scope: ScopeId,
    pub range: SrcRange,
    pub resolved_type: Option<TypeId>,
    pub cast_target: Option<TypeId>,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntLiteral(i64),
    FloatLiteral(f64),
    /// An identifier reference; resolves to a `Var` (locals obey the
    /// forward-reference rule) during validation.
    Ident { name: Ident, resolved_var: Option<VarId> },
    Unary { op: Operator, operand: ExprId, resolved_callable: Option<CallableId> },
    Binary { op: Operator, left: ExprId, right: ExprId, resolved_callable: Option<CallableId> },
    Grouped(ExprId),
    Call { callee: ExprId, args: Vec<ExprId>, resolved_callable: Option<CallableId> },
    /// Subscript placeholder (open question: codegen may stub this).
    Index { base: ExprId, args: Vec<ExprId> },
    /// `.` member access placeholder (open question: codegen may stub this).
    Member { base: ExprId, field: ExprId },
}

#[derive(Debug, Clone)]
pub struct StmtData {
    pub kind: StmtKind,
    pub scope: ScopeId,
    pub range: SrcRange,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Compound(Vec<CompoundElem>),
    Return(ExprId),
    Expr(ExprId),
}

#[derive(Debug, Clone, Copy)]
pub enum CompoundElem {
    Decl(DeclId),
    Stmt(StmtId),
}

#[derive(Debug, Clone)]
pub struct DeclData {
    pub kind: DeclKind,
    pub scope: ScopeId,
    pub range: SrcRange,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Var { name: Ident, type_ident: Ident, init: ExprId, resolved_type: Option<TypeId>, var: Option<VarId> },
    Param { name: Ident, type_ident: Ident, resolved_type: Option<TypeId>, var: Option<VarId> },
    Func {
        name: Ident,
        params: Vec<DeclId>,
        return_type_ident: Ident,
        /// `None` only during the brief window between registering the
        /// callable (so recursive calls resolve) and finishing the body
        /// parse.
        body: Option<StmtId>,
        resolved_return_type: Option<TypeId>,
        callable: Option<CallableId>,
    },
}

/// Owns every AST node created while parsing a single translation unit.
#[derive(Debug, Default)]
pub struct AstArena {
    exprs: Vec<ExprData>,
    stmts: Vec<StmtData>,
    decls: Vec<DeclData>,
    /// Top-level `decl*` in source order (the `Program` node).
    pub program: Vec<DeclId>,
}

impl AstArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_expr(&mut self, kind: ExprKind, scope: ScopeId, range: SrcRange) -> ExprId {
        let id = ExprId::new(self.exprs.len());
        self.exprs.push(ExprData { kind, scope, range, resolved_type: None, cast_target: None });
        id
    }

    #[must_use]
    pub fn expr(&self, id: ExprId) -> &ExprData {
        &self.exprs[id.index()]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut ExprData {
        &mut self.exprs[id.index()]
    }

    pub fn push_stmt(&mut self, kind: StmtKind, scope: ScopeId, range: SrcRange) -> StmtId {
        let id = StmtId::new(self.stmts.len());
        self.stmts.push(StmtData { kind, scope, range });
        id
    }

    #[must_use]
    pub fn stmt(&self, id: StmtId) -> &StmtData {
        &self.stmts[id.index()]
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut StmtData {
        &mut self.stmts[id.index()]
    }

    pub fn push_decl(&mut self, kind: DeclKind, scope: ScopeId, range: SrcRange) -> DeclId {
        let id = DeclId::new(self.decls.len());
        self.decls.push(DeclData { kind, scope, range });
        id
    }

    #[must_use]
    pub fn decl(&self, id: DeclId) -> &DeclData {
        &self.decls[id.index()]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut DeclData {
        &mut self.decls[id.index()]
    }
}
