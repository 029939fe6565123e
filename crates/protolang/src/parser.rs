//! The recursive-descent parser (C5), grounded in
//! `original_source/src/parser.h`/`parser.cpp`: the same declaration loop,
//! `sync()`-to-`}` recovery, and "register a decl into the current scope as
//! soon as it's parsed" discipline, generalized to the fuller expression
//! grammar of `spec.md` §4.1 (assignment, postfix call/subscript, `.` member
//! chains).
//!
//! Type identifiers resolve to a concrete [`TypeId`] right here rather than
//! being deferred to the validator: every type name in this language is a
//! pre-installed scalar keyword (§4.4), so `type_expr` is a plain keyword
//! lookup the parser can perform the moment it sees the identifier, the same
//! way it immediately inserts a declared name into scope. Only expression
//! nodes carry a `resolved_type`/`resolved_callable` left for the validator
//! to fill in (C7).

use crate::ast::{AstArena, CompoundElem, DeclId, DeclKind, ExprId, ExprKind, StmtId, StmtKind};
use crate::diagnostics::Logger;
use crate::entity::{CallableData, CallableKind, VarData};
use crate::error::{CompileError, CompileErrorKind};
use crate::intern::{Interner, StringId};
use crate::scope::{ScopeArena, ScopeId};
use crate::token::{Ident, Keyword, Operator, SrcRange, Token, TokenKind};
use crate::types::{FuncTypeData, TypeId};

type PResult<T> = Result<T, CompileError>;

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    logger: &'a mut Logger,
    interner: &'a mut Interner,
    scopes: &'a mut ScopeArena,
    ast: &'a mut AstArena,
    scope_stack: Vec<ScopeId>,
    /// Interned empty string, used as the scope name for every anonymous
    /// block — only `func`/`var` declarations contribute a named segment to
    /// a mangled qualifier, so nested blocks don't need distinct names.
    anon_name: StringId,
}

impl<'a> Parser<'a> {
    pub fn new(
        tokens: Vec<Token>,
        root: ScopeId,
        logger: &'a mut Logger,
        interner: &'a mut Interner,
        scopes: &'a mut ScopeArena,
        ast: &'a mut AstArena,
    ) -> Self {
        let anon_name = interner.intern("");
        Self { tokens, pos: 0, logger, interner, scopes, ast, scope_stack: vec![root], anon_name }
    }

    /// `program := decl*`. Recovers from a failed declaration by syncing to
    /// the next consumed `}` and resuming at the next declaration, so one
    /// bad declaration never masks diagnostics from later ones. The scope
    /// stack is truncated back to its pre-declaration depth on every exit
    /// path, matching §5's "set on entry, restore on every exit" rule.
    pub fn parse(mut self) {
        while !self.is_eof() {
            let depth = self.scope_stack.len();
            match self.declaration() {
                Ok(decl) => self.ast.program.push(decl),
                Err(_) => self.sync(),
            }
            self.scope_stack.truncate(depth);
        }
    }

    fn current_scope(&self) -> ScopeId {
        *self.scope_stack.last().expect("scope stack is never empty")
    }

    // --- token-stream plumbing -------------------------------------------------

    /// Lexer-reported `Invalid` tokens (`AMBIGUOUS_INT`, `UNKNOWN_CHAR`) are
    /// diagnosed and transparently skipped here: per §7 they are
    /// "reported, parsing continues", unlike a genuine grammar error.
    fn skip_invalid(&mut self) {
        while let TokenKind::Invalid(kind) = &self.tokens[self.pos].kind {
            let kind = kind.clone();
            let range = self.tokens[self.pos].range;
            let message = match kind {
                CompileErrorKind::AmbiguousInt => "leading zero makes this integer literal ambiguous",
                CompileErrorKind::UnknownChar => "unrecognized character",
                _ => "invalid token",
            };
            self.logger.log_error(&CompileError::new(kind, range, message));
            self.pos += 1;
        }
    }

    fn cur(&mut self) -> Token {
        self.skip_invalid();
        self.tokens[self.pos].clone()
    }

    fn prev(&self) -> Token {
        self.tokens[self.pos - 1].clone()
    }

    fn is_eof(&mut self) -> bool {
        self.cur().is_eof()
    }

    fn advance(&mut self) -> Token {
        self.cur();
        let tok = self.tokens[self.pos].clone();
        if !tok.is_eof() {
            self.pos += 1;
        }
        tok
    }

    fn check_kind(&mut self, pred: impl Fn(&TokenKind) -> bool) -> bool {
        pred(&self.cur().kind)
    }

    fn check_keyword(&mut self, kw: Keyword) -> bool {
        matches!(self.cur().kind, TokenKind::Keyword(k) if k == kw)
    }

    fn eat_if_op(&mut self, ops: &[Operator]) -> Option<Operator> {
        if let TokenKind::Operator(op) = self.cur().kind {
            if ops.contains(&op) {
                self.advance();
                return Some(op);
            }
        }
        None
    }

    fn eat_if_kind(&mut self, pred: impl Fn(&TokenKind) -> bool) -> bool {
        if pred(&self.cur().kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&mut self, kind: CompileErrorKind, range: SrcRange, message: impl Into<String>) -> CompileError {
        let err = CompileError::new(kind, range, message);
        self.logger.log_error(&err);
        err
    }

    fn expect_kind(&mut self, pred: impl Fn(&TokenKind) -> bool, expected: &str) -> PResult<Token> {
        if pred(&self.cur().kind) {
            Ok(self.advance())
        } else {
            let tok = self.cur();
            Err(self.error(CompileErrorKind::UnexpectedToken, tok.range, format!("`{expected}` expected here")))
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> PResult<Token> {
        let expected = kw.to_string().to_lowercase();
        self.expect_kind(|k| matches!(k, TokenKind::Keyword(k2) if *k2 == kw), &expected)
    }

    fn expect_ident(&mut self) -> PResult<Ident> {
        let tok = self.expect_kind(|k| matches!(k, TokenKind::Identifier(_)), "identifier")?;
        match tok.kind {
            TokenKind::Identifier(name) => Ok(Ident::new(name, tok.range)),
            _ => unreachable!("expect_kind guarantees an Identifier token"),
        }
    }

    fn expect_op(&mut self, op: Operator) -> PResult<Token> {
        let expected = op.overload_name();
        self.expect_kind(|k| matches!(k, TokenKind::Operator(o) if *o == op), expected)
    }

    /// `Parser::sync`: advances tokens until one consumed token is `}`.
    /// A mismatched opening `(`/`[` is caught separately as
    /// `PAREN_MISMATCH` at the point it's expected; this is only the
    /// top-level declaration-loop recovery.
    fn sync(&mut self) {
        while !self.is_eof() {
            let tok = self.advance();
            if matches!(tok.kind, TokenKind::RBrace) {
                return;
            }
        }
    }

    fn span(&self, a: ExprId, b: ExprId) -> SrcRange {
        SrcRange::new(self.ast.expr(a).range.head, self.ast.expr(b).range.tail)
    }

    fn range_from(&self, start: SrcRange) -> SrcRange {
        SrcRange::new(start.head, self.prev().range.tail)
    }

    // --- type expressions -------------------------------------------------

    /// `type_expr := IDENT`, resolved immediately against the root scope's
    /// keyword table: every type name is a pre-installed scalar, so there is
    /// no forward-declared user type to defer to the validator.
    fn type_expr(&mut self) -> PResult<(Ident, TypeId)> {
        let ident = self.expect_ident()?;
        match self.scopes.get_keyword_type(ident.name) {
            Some(ty) => Ok((ident, ty)),
            None => {
                let name = self.interner.resolve(ident.name).to_owned();
                Err(self.error(CompileErrorKind::UnexpectedToken, ident.range, format!("`{name}` is not a known type")))
            }
        }
    }

    // --- declarations -------------------------------------------------

    fn declaration(&mut self) -> PResult<DeclId> {
        if self.check_keyword(Keyword::Var) {
            self.var_decl()
        } else if self.check_keyword(Keyword::Func) {
            self.func_decl()
        } else {
            let tok = self.cur();
            Err(self.error(CompileErrorKind::UnexpectedToken, tok.range, "`var` or `func` expected"))
        }
    }

    /// `var_decl := "var" IDENT ":" type_expr "=" expr ";"`. The variable is
    /// registered with `declared_in` set to the *whole* declaration's range
    /// (through the trailing `;`), not just its name token: a reference
    /// inside the initializer itself lexically falls within that range, so
    /// `Scope::get`'s `precedes` check (strict: declaration must fully end
    /// before a reference begins) rejects a self-referencing initializer
    /// the same way it rejects any other forward reference — §4.5 item 1.
    fn var_decl(&mut self) -> PResult<DeclId> {
        let start = self.cur().range;
        self.expect_keyword(Keyword::Var)?;
        let name = self.expect_ident()?;
        self.expect_kind(|k| matches!(k, TokenKind::Colon), ":")?;
        let (type_ident, ty) = self.type_expr()?;
        self.expect_op(Operator::Assign)?;
        let init = self.expr()?;
        self.expect_kind(|k| matches!(k, TokenKind::Semicolon), ";")?;
        let range = self.range_from(start);
        let scope = self.current_scope();

        let var_id = self
            .scopes
            .add_var(scope, name.name, name.range, VarData { ident: name.name, ty, declared_in: range })
            .map_err(|e| {
                self.logger.log_error(&e);
                e
            })?;

        Ok(self.ast.push_decl(
            DeclKind::Var { name, type_ident, init, resolved_type: Some(ty), var: Some(var_id) },
            scope,
            range,
        ))
    }

    /// `func_decl := "func" IDENT "(" param_list? ")" "->" type_expr block`.
    ///
    /// The callable is registered into the *enclosing* scope's overload set
    /// before its body is parsed (so recursive calls resolve), then a fresh
    /// child scope is created for the body and pre-populated with the
    /// parameters, matching §4.1's "parameters are inserted into the
    /// function body's block scope prior to parsing its statements".
    fn func_decl(&mut self) -> PResult<DeclId> {
        let start = self.cur().range;
        self.expect_keyword(Keyword::Func)?;
        let name = self.expect_ident()?;
        self.expect_kind(|k| matches!(k, TokenKind::LParen), "(")?;

        let mut param_infos: Vec<(Ident, Ident, TypeId)> = Vec::new();
        if !self.check_kind(|k| matches!(k, TokenKind::RParen)) {
            loop {
                let pname = self.expect_ident()?;
                self.expect_kind(|k| matches!(k, TokenKind::Colon), ":")?;
                let (type_ident, ty) = self.type_expr()?;
                param_infos.push((pname, type_ident, ty));
                if self.eat_if_kind(|k| matches!(k, TokenKind::Comma)) {
                    continue;
                }
                break;
            }
        }
        self.expect_kind(|k| matches!(k, TokenKind::RParen), ")")?;
        self.expect_kind(|k| matches!(k, TokenKind::Arrow), "->")?;
        let (return_type_ident, return_ty) = self.type_expr()?;

        let outer_scope = self.current_scope();
        let func_type =
            FuncTypeData { return_type: return_ty, params: param_infos.iter().map(|(p, _, t)| (p.name, *t)).collect() };

        // A placeholder decl node is needed before the callable can be
        // constructed, since `CallableKind::UserFunc` carries the body's
        // `DeclId`; it's patched with the real params/body/callable once
        // those exist.
        let decl_id = self.ast.push_decl(
            DeclKind::Func {
                name,
                params: Vec::new(),
                return_type_ident,
                body: None,
                resolved_return_type: Some(return_ty),
                callable: None,
            },
            outer_scope,
            start,
        );

        let placeholder_name = self.interner.intern("");
        let callable_data =
            CallableData { func_type, mangled_name: placeholder_name, kind: CallableKind::UserFunc(decl_id), declared_in: name.range };
        let callable_id = self.scopes.add_callable(outer_scope, name.name, name.range, self.interner, callable_data).map_err(|e| {
            self.logger.log_error(&e);
            e
        })?;

        let func_scope = self.scopes.create_child(outer_scope, self.anon_name);
        let mut param_decls = Vec::with_capacity(param_infos.len());
        for (pname, type_ident, ty) in param_infos {
            let var_id = match self.scopes.add_var(func_scope, pname.name, pname.range, VarData {
                ident: pname.name,
                ty,
                declared_in: pname.range,
            }) {
                Ok(id) => Some(id),
                Err(e) => {
                    self.logger.log_error(&e);
                    None
                }
            };
            let pdecl = self.ast.push_decl(
                DeclKind::Param { name: pname, type_ident, resolved_type: Some(ty), var: var_id },
                func_scope,
                pname.range,
            );
            param_decls.push(pdecl);
        }

        let elems = self.compound_body(func_scope)?;
        let full_range = self.range_from(start);
        let body = self.ast.push_stmt(StmtKind::Compound(elems), func_scope, full_range);

        if let DeclKind::Func { params, body: body_slot, callable, .. } = &mut self.ast.decl_mut(decl_id).kind {
            *params = param_decls;
            *body_slot = Some(body);
            *callable = Some(callable_id);
        }
        self.ast.decl_mut(decl_id).range = full_range;

        Ok(decl_id)
    }

    // --- statements -------------------------------------------------

    /// `"{" (var_decl | stmt)* "}"`, run with `scope` pushed as current.
    /// Consumed by both a nested `block` statement (fresh empty scope) and a
    /// function body (scope pre-populated with parameters).
    fn compound_body(&mut self, scope: ScopeId) -> PResult<Vec<CompoundElem>> {
        self.expect_kind(|k| matches!(k, TokenKind::LBrace), "{")?;
        self.scope_stack.push(scope);
        let mut elems = Vec::new();
        while !self.check_kind(|k| matches!(k, TokenKind::RBrace)) && !self.is_eof() {
            if self.check_keyword(Keyword::Var) {
                elems.push(CompoundElem::Decl(self.var_decl()?));
            } else {
                elems.push(CompoundElem::Stmt(self.statement()?));
            }
        }
        self.expect_kind(|k| matches!(k, TokenKind::RBrace), "}")?;
        self.scope_stack.pop();
        Ok(elems)
    }

    fn statement(&mut self) -> PResult<StmtId> {
        if self.check_kind(|k| matches!(k, TokenKind::LBrace)) {
            self.block_stmt()
        } else if self.check_keyword(Keyword::Return) {
            self.return_stmt()
        } else {
            self.expr_stmt()
        }
    }

    /// `stmt := block`: a nested block opens its own child scope, nested
    /// inside whatever scope is current.
    fn block_stmt(&mut self) -> PResult<StmtId> {
        let start = self.cur().range;
        let child = self.scopes.create_child(self.current_scope(), self.anon_name);
        let elems = self.compound_body(child)?;
        let range = self.range_from(start);
        Ok(self.ast.push_stmt(StmtKind::Compound(elems), child, range))
    }

    fn return_stmt(&mut self) -> PResult<StmtId> {
        let start = self.cur().range;
        self.expect_keyword(Keyword::Return)?;
        let value = self.expr()?;
        self.expect_kind(|k| matches!(k, TokenKind::Semicolon), ";")?;
        let range = self.range_from(start);
        let scope = self.current_scope();
        Ok(self.ast.push_stmt(StmtKind::Return(value), scope, range))
    }

    fn expr_stmt(&mut self) -> PResult<StmtId> {
        let start = self.cur().range;
        let value = self.expr()?;
        self.expect_kind(|k| matches!(k, TokenKind::Semicolon), ";")?;
        let range = self.range_from(start);
        let scope = self.current_scope();
        Ok(self.ast.push_stmt(StmtKind::Expr(value), scope, range))
    }

    // --- expressions -------------------------------------------------
    //
    // Precedence, lowest to highest: assign < equality < compare < term <
    // factor < unary < postfix < member < primary. Every level but `assign`
    // is left-associative.

    fn expr(&mut self) -> PResult<ExprId> {
        self.assign()
    }

    /// `assign := equality ( "=" assign )?` — right-associative, unlike
    /// every other binary level. Modeled as an ordinary `Binary` node (the
    /// original literally treats `=` this way too); the validator, not the
    /// parser, special-cases `Operator::Assign` to mean store-not-call.
    fn assign(&mut self) -> PResult<ExprId> {
        let left = self.equality()?;
        if self.eat_if_op(&[Operator::Assign]).is_some() {
            let right = self.assign()?;
            return Ok(self.make_binary(Operator::Assign, left, right));
        }
        Ok(left)
    }

    fn equality(&mut self) -> PResult<ExprId> {
        let mut left = self.compare()?;
        while let Some(op) = self.eat_if_op(&[Operator::Eq, Operator::Ne]) {
            let right = self.compare()?;
            left = self.make_binary(op, left, right);
        }
        Ok(left)
    }

    fn compare(&mut self) -> PResult<ExprId> {
        let mut left = self.term()?;
        while let Some(op) = self.eat_if_op(&[Operator::Lt, Operator::Le, Operator::Gt, Operator::Ge]) {
            let right = self.term()?;
            left = self.make_binary(op, left, right);
        }
        Ok(left)
    }

    fn term(&mut self) -> PResult<ExprId> {
        let mut left = self.factor()?;
        while let Some(op) = self.eat_if_op(&[Operator::Plus, Operator::Minus]) {
            let right = self.factor()?;
            left = self.make_binary(op, left, right);
        }
        Ok(left)
    }

    fn factor(&mut self) -> PResult<ExprId> {
        let mut left = self.unary()?;
        while let Some(op) = self.eat_if_op(&[Operator::Star, Operator::Slash, Operator::Percent]) {
            let right = self.unary()?;
            left = self.make_binary(op, left, right);
        }
        Ok(left)
    }

    /// `unary := ("!"|"-") unary | postfix`
    fn unary(&mut self) -> PResult<ExprId> {
        if let Some(op) = self.eat_if_op(&[Operator::Bang, Operator::Minus]) {
            let start = self.prev().range;
            let operand = self.unary()?;
            let range = SrcRange::new(start.head, self.ast.expr(operand).range.tail);
            let scope = self.current_scope();
            return Ok(self.ast.push_expr(ExprKind::Unary { op, operand, resolved_callable: None }, scope, range));
        }
        self.postfix()
    }

    /// `postfix := member ( "(" args? ")" | "[" args? "]" )*`
    fn postfix(&mut self) -> PResult<ExprId> {
        let mut e = self.member()?;
        loop {
            if self.eat_if_kind(|k| matches!(k, TokenKind::LParen)) {
                let args = self.args(|k| matches!(k, TokenKind::RParen))?;
                self.expect_kind(|k| matches!(k, TokenKind::RParen), ")")?;
                let range = SrcRange::new(self.ast.expr(e).range.head, self.prev().range.tail);
                let scope = self.current_scope();
                e = self.ast.push_expr(ExprKind::Call { callee: e, args, resolved_callable: None }, scope, range);
            } else if self.eat_if_kind(|k| matches!(k, TokenKind::LBracket)) {
                let args = self.args(|k| matches!(k, TokenKind::RBracket))?;
                self.expect_kind(|k| matches!(k, TokenKind::RBracket), "]")?;
                let range = SrcRange::new(self.ast.expr(e).range.head, self.prev().range.tail);
                let scope = self.current_scope();
                e = self.ast.push_expr(ExprKind::Index { base: e, args }, scope, range);
            } else {
                break;
            }
        }
        Ok(e)
    }

    fn args(&mut self, is_closing: impl Fn(&TokenKind) -> bool) -> PResult<Vec<ExprId>> {
        let mut out = Vec::new();
        if self.check_kind(&is_closing) {
            return Ok(out);
        }
        loop {
            out.push(self.expr()?);
            if self.eat_if_kind(|k| matches!(k, TokenKind::Comma)) {
                continue;
            }
            break;
        }
        Ok(out)
    }

    /// `member := primary ( "." primary )*`
    fn member(&mut self) -> PResult<ExprId> {
        let mut e = self.primary()?;
        while self.eat_if_op(&[Operator::Dot]).is_some() {
            let field = self.primary()?;
            let range = self.span(e, field);
            let scope = self.current_scope();
            e = self.ast.push_expr(ExprKind::Member { base: e, field }, scope, range);
        }
        Ok(e)
    }

    /// `primary := IDENT | LITERAL | "(" expr ")"`
    fn primary(&mut self) -> PResult<ExprId> {
        let tok = self.cur();
        let scope = self.current_scope();
        match tok.kind.clone() {
            TokenKind::IntLiteral(v) => {
                self.advance();
                Ok(self.ast.push_expr(ExprKind::IntLiteral(v), scope, tok.range))
            }
            TokenKind::FloatLiteral(v) => {
                self.advance();
                Ok(self.ast.push_expr(ExprKind::FloatLiteral(v), scope, tok.range))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                let ident = Ident::new(name, tok.range);
                Ok(self.ast.push_expr(ExprKind::Ident { name: ident, resolved_var: None }, scope, tok.range))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr()?;
                if self.check_kind(|k| matches!(k, TokenKind::RParen)) {
                    self.advance();
                } else {
                    return Err(self.error(CompileErrorKind::ParenMismatch, tok.range, "unmatched `(`"));
                }
                let range = self.range_from(tok.range);
                Ok(self.ast.push_expr(ExprKind::Grouped(inner), scope, range))
            }
            _ => Err(self.error(CompileErrorKind::ExprExpected, tok.range, "expression expected")),
        }
    }

    fn make_binary(&mut self, op: Operator, left: ExprId, right: ExprId) -> ExprId {
        let range = self.span(left, right);
        let scope = self.current_scope();
        self.ast.push_expr(ExprKind::Binary { op, left, right, resolved_callable: None }, scope, range)
    }
}
