//! The type system (scalar kinds, widths, and implicit-cast acceptance),
//! grounded in `original_source/src/builtin.cpp` (`IScalarType`,
//! `BuiltInIntType<bits, signed>`, `BuiltInFloatType`, `BuiltInDoubleType`,
//! `BuiltInVoidType`).

use crate::intern::{Interner, StringId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

impl TypeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index.try_into().expect("type arena overflowed u32::MAX"))
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ScalarKind {
    UInt,
    Int,
    Float,
    Double,
}

/// `Type`'s capability set, reduced to a closed tagged union instead of a
/// class hierarchy: a type is either `Void` or a scalar of some kind and bit
/// width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeData {
    Void,
    Scalar { kind: ScalarKind, bits: u32 },
}

impl TypeData {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            TypeData::Void => "void",
            TypeData::Scalar { kind: ScalarKind::Int, bits: 8 } => "sbyte",
            TypeData::Scalar { kind: ScalarKind::Int, bits: 16 } => "short",
            TypeData::Scalar { kind: ScalarKind::Int, bits: 32 } => "int",
            TypeData::Scalar { kind: ScalarKind::Int, bits: 64 } => "long",
            TypeData::Scalar { kind: ScalarKind::UInt, bits: 8 } => "byte",
            TypeData::Scalar { kind: ScalarKind::UInt, bits: 16 } => "ushort",
            TypeData::Scalar { kind: ScalarKind::UInt, bits: 32 } => "uint",
            TypeData::Scalar { kind: ScalarKind::UInt, bits: 64 } => "ulong",
            TypeData::Scalar { kind: ScalarKind::Float, bits: 32 } => "float",
            TypeData::Scalar { kind: ScalarKind::Double, bits: 64 } => "double",
            TypeData::Scalar { .. } => "<invalid scalar>",
        }
    }

    /// `equal`: same kind AND same bit width. `Void` only equals `Void`.
    #[must_use]
    pub fn equals(&self, other: &TypeData) -> bool {
        self == other
    }

    /// `accepts` / implicit-cast acceptance: widening within the same
    /// scalar kind only; `Void` accepts only `Void`.
    #[must_use]
    pub fn accepts(&self, other: &TypeData) -> bool {
        match (self, other) {
            (TypeData::Void, TypeData::Void) => true,
            (TypeData::Void, _) | (_, TypeData::Void) => false,
            (TypeData::Scalar { kind: k1, bits: b1 }, TypeData::Scalar { kind: k2, bits: b2 }) => {
                k1 == k2 && b1 >= b2
            }
        }
    }
}

/// A `FuncType`'s shape: return type plus ordered, named parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncTypeData {
    pub return_type: TypeId,
    pub params: Vec<(StringId, TypeId)>,
}

impl FuncTypeData {
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn param_type(&self, index: usize) -> TypeId {
        self.params[index].1
    }

    pub fn type_name(&self, types: &TypeArena) -> String {
        let param_list = self
            .params
            .iter()
            .map(|(_, ty)| types.get(*ty).type_name())
            .collect::<Vec<_>>()
            .join(",");
        format!("func({})->{}", param_list, types.get(self.return_type).type_name())
    }
}

/// Owns every `TypeData` created during a compilation: the root scope owns
/// the primitive scalars and `Void` for the lifetime of the compilation.
#[derive(Debug, Default)]
pub struct TypeArena {
    types: Vec<TypeData>,
}

impl TypeArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, data: TypeData) -> TypeId {
        let id = TypeId::new(self.types.len());
        self.types.push(data);
        id
    }

    #[must_use]
    pub fn get(&self, id: TypeId) -> &TypeData {
        &self.types[id.index()]
    }

    #[must_use]
    pub fn equals(&self, a: TypeId, b: TypeId) -> bool {
        self.get(a).equals(self.get(b))
    }

    #[must_use]
    pub fn accepts(&self, dst: TypeId, src: TypeId) -> bool {
        self.get(dst).accepts(self.get(src))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(kind: ScalarKind, bits: u32) -> TypeData {
        TypeData::Scalar { kind, bits }
    }

    #[test]
    fn accepts_widens_within_kind_only() {
        let int32 = scalar(ScalarKind::Int, 32);
        let int64 = scalar(ScalarKind::Int, 64);
        let uint32 = scalar(ScalarKind::UInt, 32);

        assert!(int64.accepts(&int32)); // widening
        assert!(!int32.accepts(&int64)); // narrowing rejected
        assert!(!int32.accepts(&uint32)); // cross-kind rejected
        assert!(int32.accepts(&int32)); // reflexive: D.accepts(D)
    }

    #[test]
    fn equals_requires_exact_match() {
        let a = scalar(ScalarKind::Float, 32);
        let b = scalar(ScalarKind::Double, 64);
        assert!(a.equals(&a));
        assert!(!a.equals(&b));
    }

    #[test]
    fn void_only_accepts_void() {
        assert!(TypeData::Void.accepts(&TypeData::Void));
        assert!(!TypeData::Void.accepts(&scalar(ScalarKind::Int, 32)));
        assert!(!scalar(ScalarKind::Int, 32).accepts(&TypeData::Void));
    }
}
