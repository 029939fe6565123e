//! The SSA backend interface (§6.2), grounded in
//! `original_source/src/code_generator.h`/`codegen.cpp`: the code generator
//! (C8) is written against this trait rather than directly against
//! `inkwell`, the same way the original's `CodeGenerator` is the only class
//! that touches raw LLVM C++ API calls. A second backend (e.g. a textual
//! dump, or a different codegen library) only has to implement this trait.

use crate::types::ScalarKind;

/// What the lowering rules of §4.6 require a backend to provide. Generic
/// over the handle types a concrete implementation uses for values, types,
/// functions and basic blocks — an `LlvmBackend` makes all four thin
/// wrappers around `inkwell` handles (see [`crate::llvm_backend`]).
pub trait IrBackend<'ctx> {
    type Value: Copy;
    type Type: Copy;
    type Function: Copy;
    type Block: Copy;

    fn scalar_type(&self, kind: ScalarKind, bits: u32) -> Self::Type;
    fn void_type(&self) -> Self::Type;

    fn int_const(&self, ty: Self::Type, value: i64) -> Self::Value;
    fn float_const(&self, ty: Self::Type, value: f64) -> Self::Value;

    /// Declares a function with internal linkage and the given mangled
    /// name. Returns `None` if a function of that name already exists
    /// (`FUNC_ALREADY_EXISTS`, §4.6).
    fn declare_function(&mut self, mangled_name: &str, param_types: &[Self::Type], return_type: Self::Type) -> Option<Self::Function>;
    fn append_block(&mut self, func: Self::Function, name: &str) -> Self::Block;
    fn set_insert_point(&mut self, block: Self::Block);
    fn function_param(&self, func: Self::Function, index: usize) -> Self::Value;

    /// Entry-block-only alloca (§4.6): every local and parameter gets its
    /// stack slot allocated at the start of the entry block, regardless of
    /// where in the function body the backend's current insert point is.
    fn alloca_entry(&mut self, func: Self::Function, ty: Self::Type, name: &str) -> Self::Value;
    fn load(&mut self, ty: Self::Type, ptr: Self::Value, name: &str) -> Self::Value;
    fn store(&mut self, ptr: Self::Value, value: Self::Value);

    fn sext(&mut self, value: Self::Value, to: Self::Type) -> Self::Value;
    fn zext(&mut self, value: Self::Value, to: Self::Type) -> Self::Value;
    fn trunc(&mut self, value: Self::Value, to: Self::Type) -> Self::Value;
    fn fptrunc(&mut self, value: Self::Value, to: Self::Type) -> Self::Value;
    fn fpext(&mut self, value: Self::Value, to: Self::Type) -> Self::Value;
    fn bitcast(&mut self, value: Self::Value, to: Self::Type) -> Self::Value;
    fn ptrcast(&mut self, value: Self::Value, to: Self::Type) -> Self::Value;

    fn add_nsw(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value;
    fn sub_nsw(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value;
    fn mul_nsw(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value;
    fn sdiv(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value;
    fn udiv(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value;
    fn fadd(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value;
    fn fsub(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value;
    fn fmul(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value;
    fn fdiv(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value;

    fn call(&mut self, func: Self::Function, args: &[Self::Value], name: &str) -> Option<Self::Value>;
    fn ret(&mut self, value: Option<Self::Value>);

    /// Runs the backend's structural function verifier. `Err` carries a
    /// human-readable message for diagnostics, not a `CompileErrorKind` —
    /// an ill-formed function body at this stage is always `INTERNAL`
    /// (§7): every condition the verifier could catch is something the
    /// validator (C7) was supposed to already rule out.
    fn verify_function(&self, func: Self::Function) -> Result<(), String>;

    /// Emits the current module as a relocatable object file for the host
    /// target at `path`, after setting the module's target triple and data
    /// layout from the host `TargetMachine` (§4.6 "Module setup").
    fn emit_object(&mut self, path: &std::path::Path) -> Result<(), String>;

    /// Renders the module's textual IR form, for `--emit-llvm`.
    fn print_module(&self) -> String;
}
