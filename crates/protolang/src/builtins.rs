//! Primitive scalar types and arithmetic operator overload sets seeded into
//! the root scope (C6), grounded in `original_source/src/builtin.cpp`
//! (`add_builtins`, `add_scalar_and_op`) and generalized from its 32/64-bit
//! subset to the full scalar table.

use crate::entity::{BuiltinArithOp, CallableData, CallableKind, Entity};
use crate::error::CompileError;
use crate::intern::Interner;
use crate::scope::{ScopeArena, ScopeId};
use crate::token::SrcRange;
use crate::types::{FuncTypeData, ScalarKind, TypeData};

const INT_WIDTHS: [u32; 4] = [8, 16, 32, 64];

/// Installs `void`, the ten scalar primitives, and `+`/`-`/`*`/`/` for each
/// scalar, mirroring `add_builtins`'s structure while covering every width
/// the type table names rather than only 32/64-bit int/uint.
pub fn install(arena: &mut ScopeArena, interner: &mut Interner) -> Result<(), CompileError> {
    let root = arena.root();

    let void_id = arena.types.insert(TypeData::Void);
    let void_name = interner.intern("void");
    arena.add_keyword(void_name, Entity::Type(void_id));

    for &bits in &INT_WIDTHS {
        install_scalar(arena, interner, root, ScalarKind::Int, bits)?;
    }
    for &bits in &INT_WIDTHS {
        install_scalar(arena, interner, root, ScalarKind::UInt, bits)?;
    }
    install_scalar(arena, interner, root, ScalarKind::Float, 32)?;
    install_scalar(arena, interner, root, ScalarKind::Double, 64)?;

    Ok(())
}

fn install_scalar(
    arena: &mut ScopeArena,
    interner: &mut Interner,
    root: ScopeId,
    kind: ScalarKind,
    bits: u32,
) -> Result<(), CompileError> {
    let data = TypeData::Scalar { kind, bits };
    let type_id = arena.types.insert(data);
    let name = interner.intern(data.type_name());
    arena.add_keyword(name, Entity::Type(type_id));

    for op in [BuiltinArithOp::Add, BuiltinArithOp::Sub, BuiltinArithOp::Mul, BuiltinArithOp::Div] {
        let func_type = FuncTypeData {
            return_type: type_id,
            params: vec![(interner.intern("lhs"), type_id), (interner.intern("rhs"), type_id)],
        };
        let op_name = interner.intern(operator_name(op));
        let callable = CallableData {
            func_type,
            mangled_name: op_name,
            kind: CallableKind::BuiltinArith(op, kind, bits),
            declared_in: SrcRange::synthetic(),
        };
        arena.add_callable(root, op_name, SrcRange::synthetic(), interner, callable)?;
    }
    Ok(())
}

fn operator_name(op: BuiltinArithOp) -> &'static str {
    match op {
        BuiltinArithOp::Add => "+",
        BuiltinArithOp::Sub => "-",
        BuiltinArithOp::Mul => "*",
        BuiltinArithOp::Div => "/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installs_every_scalar_and_void() {
        let mut interner = Interner::new();
        let empty = interner.intern("");
        let mut arena = ScopeArena::new(empty);
        install(&mut arena, &mut interner).unwrap();

        let root = arena.root();
        let int_name = interner.intern("int");
        let ty = arena.get_keyword_type(int_name).expect("int registered");
        assert_eq!(*arena.types.get(ty), TypeData::Scalar { kind: ScalarKind::Int, bits: 32 });

        let plus = interner.intern("+");
        let set = arena
            .get::<crate::entity::OverloadSetId>(root, plus, true, SrcRange::synthetic())
            .expect("`+` overload set exists");
        // 10 scalar types × one `+` overload each.
        assert_eq!(arena.entities.iter_overloads(set).len(), 10);
    }
}
