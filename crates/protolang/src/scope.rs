//! The nested symbol environment (C3), grounded in
//! `original_source/src/scope.h` and `env.cpp`.

use std::collections::HashMap;

use crate::entity::{CallableData, CallableId, Entity, EntityArena, OverloadSetData, OverloadSetId, VarData, VarId};
use crate::error::{CompileError, CompileErrorKind};
use crate::intern::{Interner, StringId};
use crate::token::SrcRange;
use crate::types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    fn new(i: usize) -> Self {
        Self(i.try_into().expect("scope arena overflow"))
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub struct Scope {
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    symbols: HashMap<StringId, Entity>,
    /// Short name used to build this scope's qualifier; the
    /// root scope's name is empty.
    name: StringId,
}

/// Owns every scope and entity created during a single compilation: each
/// scope owns the entities it created and may reference an ancestor's
/// entities by id; the root scope outlives every inner scope because the
/// whole arena does.
#[derive(Debug)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
    /// Root-only keyword table, kept separate from every scope's ordinary
    /// symbol table.
    keywords: HashMap<StringId, Entity>,
    pub entities: EntityArena,
    pub types: crate::types::TypeArena,
}

const ROOT: ScopeId = ScopeId(0);

impl ScopeArena {
    #[must_use]
    pub fn new(empty_name: StringId) -> Self {
        let root = Scope { parent: None, children: Vec::new(), symbols: HashMap::new(), name: empty_name };
        Self {
            scopes: vec![root],
            keywords: HashMap::new(),
            entities: EntityArena::new(),
            types: crate::types::TypeArena::new(),
        }
    }

    #[must_use]
    pub fn root(&self) -> ScopeId {
        ROOT
    }

    pub fn create_child(&mut self, parent: ScopeId, name: StringId) -> ScopeId {
        let id = ScopeId::new(self.scopes.len());
        self.scopes.push(Scope { parent: Some(parent), children: Vec::new(), symbols: HashMap::new(), name });
        self.scopes[parent.index()].children.push(id);
        id
    }

    fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    #[must_use]
    pub fn parent_of(&self, id: ScopeId) -> Option<ScopeId> {
        self.scope(id).parent
    }

    /// `Scope::get_qualifier`: `::`-joined chain of scope
    /// names from the root down to (and excluding) the unqualified leaf.
    pub fn qualifier(&self, id: ScopeId, interner: &Interner) -> String {
        let mut parts = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            let name = interner.resolve(self.scope(c).name);
            if !name.is_empty() {
                parts.push(name.to_owned());
            }
            cur = self.scope(c).parent;
        }
        parts.reverse();
        parts.join("::")
    }

    pub fn full_qualified_name(&self, id: ScopeId, local: &str, interner: &Interner) -> String {
        let q = self.qualifier(id, interner);
        if q.is_empty() {
            local.to_owned()
        } else {
            format!("{q}::{local}")
        }
    }

    /// Nearest-ancestor overload set named `name`, used both by `add` (to
    /// chain a freshly created local set to its parent) and transitively by
    /// `iter_overloads`.
    fn find_overload_set(&self, id: ScopeId, name: StringId) -> Option<OverloadSetId> {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if let Some(Entity::OverloadSet(set)) = self.scope(c).symbols.get(&name) {
                return Some(*set);
            }
            cur = self.scope(c).parent;
        }
        None
    }

    /// `Scope::add`. Inserting a
    /// non-callable under a name already bound in this scope, or a callable
    /// under a name already bound to a non-callable, is `SYMBOL_REDEF`.
    pub fn add_var(&mut self, id: ScopeId, ident: StringId, range: SrcRange, var: VarData) -> Result<VarId, CompileError> {
        if self.scope(id).symbols.contains_key(&ident) {
            return Err(redef_error(range));
        }
        let var_id = self.entities.insert_var(var);
        self.scope_mut(id).symbols.insert(ident, Entity::Var(var_id));
        Ok(var_id)
    }

    /// Root-scope-only keyword insertion.
    pub fn add_keyword(&mut self, name: StringId, entity: Entity) {
        self.keywords.insert(name, entity);
    }

    #[must_use]
    pub fn get_keyword(&self, name: StringId) -> Option<Entity> {
        self.keywords.get(&name).copied()
    }

    #[must_use]
    pub fn get_keyword_type(&self, name: StringId) -> Option<TypeId> {
        match self.get_keyword(name) {
            Some(Entity::Type(t)) => Some(t),
            _ => None,
        }
    }

    /// Merges a callable into `ident`'s overload set in scope `id`,
    /// creating the set on first use and assigning the mangled name
    /// `qualifier::name#index`.
    pub fn add_callable(
        &mut self,
        id: ScopeId,
        ident: StringId,
        range: SrcRange,
        interner: &mut Interner,
        mut data: CallableData,
    ) -> Result<CallableId, CompileError> {
        let set_id = match self.scope(id).symbols.get(&ident) {
            Some(Entity::OverloadSet(set)) => *set,
            Some(_) => return Err(redef_error(range)),
            None => {
                let parent_set = self.parent_of(id).and_then(|p| self.find_overload_set(p, ident));
                let set_id = self.entities.insert_overload_set(OverloadSetData { locals: Vec::new(), parent_set });
                self.scope_mut(id).symbols.insert(ident, Entity::OverloadSet(set_id));
                set_id
            }
        };

        if self.entities.overload_set(set_id).locals.iter().any(|&existing| self.same_signature(existing, &data)) {
            return Err(redef_error(range));
        }

        let index = self.entities.overload_set(set_id).next_index();
        let local_name = interner.resolve(ident).to_owned();
        let qualified = self.full_qualified_name(id, &local_name, interner);
        data.mangled_name = interner.intern(&format!("{qualified}#{index}"));

        let callable_id = self.entities.insert_callable(data);
        self.entities.overload_set_mut(set_id).locals.push(callable_id);
        Ok(callable_id)
    }

    /// Two callables in the same overload set collide (§8 scenario 6) when
    /// their parameter-type lists are identical, irrespective of parameter
    /// names or return type. Only checked against the set's own `locals`,
    /// not inherited overloads from an enclosing scope — shadowing a parent
    /// overload with the same signature is legal, redeclaring one in the
    /// same scope is not.
    fn same_signature(&self, existing: CallableId, candidate: &CallableData) -> bool {
        let existing = &self.entities.callable(existing).func_type;
        let candidate = &candidate.func_type;
        existing.params.len() == candidate.params.len()
            && existing
                .params
                .iter()
                .zip(&candidate.params)
                .all(|((_, existing_ty), (_, candidate_ty))| self.types.equals(*existing_ty, *candidate_ty))
    }

    /// Walk the scope chain parent-ward for the first scope binding `ident`
    /// at all; "shadowing" means a name bound to the *wrong* kind at an
    /// inner scope hides an outer entity of the *right* kind.
    /// `allow_forward_ref = false` additionally requires the match's
    /// declaration range to lexically precede `ref_range` (used for locals).
    pub fn get<T: FromEntity>(&self, id: ScopeId, name: StringId, allow_forward_ref: bool, ref_range: SrcRange) -> Option<T> {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if let Some(&entity) = self.scope(c).symbols.get(&name) {
                let found = T::from_entity(entity)?;
                if !allow_forward_ref {
                    if let Some(decl_range) = T::declared_range(entity, &self.entities) {
                        if !decl_range.precedes(&ref_range) {
                            return None;
                        }
                    }
                }
                return Some(found);
            }
            cur = self.scope(c).parent;
        }
        None
    }

    pub fn get_backwards<T: FromEntity>(&self, id: ScopeId, name: StringId, ref_range: SrcRange) -> Option<T> {
        self.get::<T>(id, name, false, ref_range)
    }

    /// Overload resolution, consumed by the validator and by
    /// codegen's binary/unary/call lowering.
    pub fn overload_resolution(
        &self,
        id: ScopeId,
        name: StringId,
        range: SrcRange,
        arg_types: &[TypeId],
        interner: &Interner,
    ) -> Result<CallableId, CompileError> {
        let Some(set_id) = self.get::<OverloadSetId>(id, name, true, range) else {
            return Err(CompileError::new(CompileErrorKind::NoMatchingOverload, range, "no such function or operator"));
        };

        let mut loose = Vec::new();
        let mut strict = Vec::new();
        for candidate in self.entities.iter_overloads(set_id) {
            let func = self.entities.callable(candidate);
            if func.func_type.param_count() != arg_types.len() {
                continue;
            }
            let all_strict = func
                .func_type
                .params
                .iter()
                .zip(arg_types)
                .all(|((_, param_ty), arg_ty)| self.types.equals(*param_ty, *arg_ty));
            let all_loose = func
                .func_type
                .params
                .iter()
                .zip(arg_types)
                .all(|((_, param_ty), arg_ty)| self.types.accepts(*param_ty, *arg_ty));
            if all_strict {
                strict.push(candidate);
                loose.push(candidate);
            } else if all_loose {
                loose.push(candidate);
            }
        }

        match (loose.len(), strict.len()) {
            (0, _) => Err(CompileError::new(
                CompileErrorKind::NoMatchingOverload,
                range,
                format!("no overload of `{}` accepts the given argument types", interner.resolve(name)),
            )),
            (1, _) => Ok(loose[0]),
            (_, 1) => Ok(strict[0]),
            (_, _) => Err(CompileError::new(CompileErrorKind::AmbiguousOverload, range, "ambiguous call: multiple overloads match")),
        }
    }
}

fn redef_error(range: SrcRange) -> CompileError {
    CompileError::new(CompileErrorKind::SymbolRedef, range, "symbol already defined in this scope")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScalarKind, TypeData};

    fn func_of(interner: &mut Interner, param: TypeId, ret: TypeId) -> CallableData {
        let x = interner.intern("x");
        CallableData {
            func_type: crate::types::FuncTypeData { return_type: ret, params: vec![(x, param)] },
            mangled_name: x,
            kind: crate::entity::CallableKind::BuiltinArith(crate::entity::BuiltinArithOp::Add, ScalarKind::Int, 32),
            declared_in: SrcRange::synthetic(),
        }
    }

    #[test]
    fn add_callable_merges_same_name_into_one_overload_set() {
        let mut interner = Interner::new();
        let empty = interner.intern("");
        let mut scopes = ScopeArena::new(empty);
        let int32 = scopes.types.insert(TypeData::Scalar { kind: ScalarKind::Int, bits: 32 });
        let int64 = scopes.types.insert(TypeData::Scalar { kind: ScalarKind::Int, bits: 64 });
        let name = interner.intern("f");
        let root = scopes.root();

        let f1 = func_of(&mut interner, int32, int32);
        let f2 = func_of(&mut interner, int64, int32);
        let first = scopes.add_callable(root, name, SrcRange::synthetic(), &mut interner, f1).unwrap();
        let second = scopes.add_callable(root, name, SrcRange::synthetic(), &mut interner, f2).unwrap();

        let set_id = scopes.get::<OverloadSetId>(root, name, true, SrcRange::synthetic()).expect("one merged set");
        let locals = &scopes.entities.overload_set(set_id).locals;
        assert_eq!(locals, &[first, second]);
    }

    #[test]
    fn overload_resolution_prefers_the_strict_match_over_a_loose_widening() {
        let mut interner = Interner::new();
        let empty = interner.intern("");
        let mut scopes = ScopeArena::new(empty);
        let int32 = scopes.types.insert(TypeData::Scalar { kind: ScalarKind::Int, bits: 32 });
        let int64 = scopes.types.insert(TypeData::Scalar { kind: ScalarKind::Int, bits: 64 });
        let name = interner.intern("f");
        let root = scopes.root();

        let f1 = func_of(&mut interner, int32, int32);
        let f2 = func_of(&mut interner, int64, int32);
        let narrow = scopes.add_callable(root, name, SrcRange::synthetic(), &mut interner, f1).unwrap();
        scopes.add_callable(root, name, SrcRange::synthetic(), &mut interner, f2).unwrap();

        let resolved = scopes.overload_resolution(root, name, SrcRange::synthetic(), &[int32], &interner).expect("a strict match exists");
        assert_eq!(resolved, narrow);
    }

    #[test]
    fn overload_resolution_reports_no_matching_overload_on_arity_mismatch() {
        let mut interner = Interner::new();
        let empty = interner.intern("");
        let mut scopes = ScopeArena::new(empty);
        let int32 = scopes.types.insert(TypeData::Scalar { kind: ScalarKind::Int, bits: 32 });
        let name = interner.intern("f");
        let root = scopes.root();
        let f = func_of(&mut interner, int32, int32);
        scopes.add_callable(root, name, SrcRange::synthetic(), &mut interner, f).unwrap();

        let err = scopes.overload_resolution(root, name, SrcRange::synthetic(), &[int32, int32], &interner).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::NoMatchingOverload);
    }
}

/// A type that can be extracted from an [`Entity`], used to make
/// [`ScopeArena::get`] generic over which capability the caller wants.
pub trait FromEntity: Sized {
    fn from_entity(entity: Entity) -> Option<Self>;
    /// The declaration range used by the forward-reference check, if this
    /// entity kind tracks one (only variables do).
    fn declared_range(_entity: Entity, _arena: &EntityArena) -> Option<SrcRange> {
        None
    }
}

impl FromEntity for TypeId {
    fn from_entity(entity: Entity) -> Option<Self> {
        match entity {
            Entity::Type(t) => Some(t),
            _ => None,
        }
    }
}

impl FromEntity for VarId {
    fn from_entity(entity: Entity) -> Option<Self> {
        match entity {
            Entity::Var(v) => Some(v),
            _ => None,
        }
    }

    fn declared_range(entity: Entity, arena: &EntityArena) -> Option<SrcRange> {
        match entity {
            Entity::Var(v) => Some(arena.var(v).declared_in),
            _ => None,
        }
    }
}

impl FromEntity for OverloadSetId {
    fn from_entity(entity: Entity) -> Option<Self> {
        match entity {
            Entity::OverloadSet(s) => Some(s),
            _ => None,
        }
    }
}
