//! The `Entity` capability taxonomy, grounded in
//! `original_source/src/entity_system.h` (`IEntity`/`IVar`/`IFuncType`/`IFunc`)
//! and `overloadset.h`. The original's deep `IEntity`/`IType`/`IVar`/...
//! class hierarchy is rendered here as a flat tagged union plus typed-index
//! arenas rather than trait objects: every entity that can live in a scope
//! is one variant of [`Entity`], and each variant's data lives in its own
//! arena so the scope's symbol table only ever stores small `Copy` ids.

use crate::intern::StringId;
use crate::token::SrcRange;
use crate::types::{FuncTypeData, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(u32);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallableId(u32);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverloadSetId(u32);

impl VarId {
    fn new(i: usize) -> Self {
        Self(i.try_into().expect("var arena overflow"))
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}
impl CallableId {
    fn new(i: usize) -> Self {
        Self(i.try_into().expect("callable arena overflow"))
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}
impl OverloadSetId {
    fn new(i: usize) -> Self {
        Self(i.try_into().expect("overload-set arena overflow"))
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Anything nameable in a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Type(TypeId),
    Var(VarId),
    Callable(CallableId),
    OverloadSet(OverloadSetId),
}

/// A declared variable: name, declared type, and (post-codegen) its stack
/// slot. Rather than threading a code-generation backend's associated
/// `Value` type through the entity model (the original's `IVar::stack_addr`
/// would otherwise force every `Entity` to be generic over the backend),
/// the slot is recorded indirectly: [`crate::codegen::CodeGenerator`] keeps
/// a side table from `VarId` to the active backend's `Value` handle, keyed
/// for the duration of the enclosing function's body. `declared_in` is the
/// range used for the forward-reference check: locals may not be
/// referenced before their textual declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarData {
    pub ident: StringId,
    pub ty: TypeId,
    pub declared_in: SrcRange,
}

/// What a callable actually does when invoked, grounded in the original's
/// split between `ast::FuncDecl` (AST-backed) and `BuiltInArithmetic<Ar>`
/// (a built-in, parameterized over the primitive arithmetic op).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    /// A user-declared `func`; the payload is the `DeclId` of its
    /// `FuncDecl` node in the AST arena.
    UserFunc(crate::ast::DeclId),
    /// One of the four built-in arithmetic operators, monomorphized over a
    /// scalar kind/width pair.
    BuiltinArith(BuiltinArithOp, crate::types::ScalarKind, u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum BuiltinArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone)]
pub struct CallableData {
    pub func_type: FuncTypeData,
    pub mangled_name: StringId,
    pub kind: CallableKind,
    pub declared_in: SrcRange,
}

/// Ordered collection of callables sharing a name, with an optional link to
/// the nearest enclosing scope's set of the same name.
#[derive(Debug, Clone, Default)]
pub struct OverloadSetData {
    pub locals: Vec<CallableId>,
    pub parent_set: Option<OverloadSetId>,
}

impl OverloadSetData {
    #[must_use]
    pub fn next_index(&self) -> usize {
        self.locals.len()
    }
}

#[derive(Debug, Default)]
pub struct EntityArena {
    pub vars: Vec<VarData>,
    pub callables: Vec<CallableData>,
    pub overload_sets: Vec<OverloadSetData>,
}

impl EntityArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_var(&mut self, data: VarData) -> VarId {
        let id = VarId::new(self.vars.len());
        self.vars.push(data);
        id
    }

    #[must_use]
    pub fn var(&self, id: VarId) -> &VarData {
        &self.vars[id.index()]
    }

    pub fn insert_callable(&mut self, data: CallableData) -> CallableId {
        let id = CallableId::new(self.callables.len());
        self.callables.push(data);
        id
    }

    #[must_use]
    pub fn callable(&self, id: CallableId) -> &CallableData {
        &self.callables[id.index()]
    }

    pub fn callable_mut(&mut self, id: CallableId) -> &mut CallableData {
        &mut self.callables[id.index()]
    }

    pub fn insert_overload_set(&mut self, data: OverloadSetData) -> OverloadSetId {
        let id = OverloadSetId::new(self.overload_sets.len());
        self.overload_sets.push(data);
        id
    }

    #[must_use]
    pub fn overload_set(&self, id: OverloadSetId) -> &OverloadSetData {
        &self.overload_sets[id.index()]
    }

    pub fn overload_set_mut(&mut self, id: OverloadSetId) -> &mut OverloadSetData {
        &mut self.overload_sets[id.index()]
    }

    /// Iterates a set's callables innermost-first, insertion order within
    /// each set, then its parent set, and so on to the root.
    pub fn iter_overloads(&self, mut id: OverloadSetId) -> Vec<CallableId> {
        let mut out = Vec::new();
        loop {
            let set = self.overload_set(id);
            out.extend(set.locals.iter().copied());
            match set.parent_set {
                Some(next) => id = next,
                None => break,
            }
        }
        out
    }
}
