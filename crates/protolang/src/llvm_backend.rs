//! `LlvmBackend`: the reference [`IrBackend`] implementation, built on
//! `inkwell` (§6.2). One [`inkwell::context::Context`] per compilation, the
//! same one-`LLVMContext`-per-`CodeGenerator` lifetime the original's
//! `code_generator.h` owns directly.

use std::collections::HashMap;
use std::path::Path;

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::targets::{CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine};
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum};
use inkwell::values::{BasicMetadataValueEnum, BasicValue, BasicValueEnum, FunctionValue};
use inkwell::OptimizationLevel;

use crate::backend::IrBackend;
use crate::types::ScalarKind;

pub struct LlvmBackend<'ctx> {
    context: &'ctx Context,
    builder: Builder<'ctx>,
    module: Module<'ctx>,
    /// One entry alloca block per function, so `alloca_entry` can always
    /// insert at its start regardless of the builder's current position
    /// (§4.6's "always in the current function's entry block").
    entry_blocks: HashMap<FunctionValue<'ctx>, inkwell::basic_block::BasicBlock<'ctx>>,
}

impl<'ctx> LlvmBackend<'ctx> {
    #[must_use]
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        Self { context, builder: context.create_builder(), module: context.create_module(module_name), entry_blocks: HashMap::new() }
    }

    fn int_type(&self, bits: u32) -> inkwell::types::IntType<'ctx> {
        match bits {
            8 => self.context.i8_type(),
            16 => self.context.i16_type(),
            32 => self.context.i32_type(),
            64 => self.context.i64_type(),
            other => self.context.custom_width_int_type(other),
        }
    }
}

impl<'ctx> IrBackend<'ctx> for LlvmBackend<'ctx> {
    type Value = BasicValueEnum<'ctx>;
    type Type = BasicTypeEnum<'ctx>;
    type Function = FunctionValue<'ctx>;
    type Block = inkwell::basic_block::BasicBlock<'ctx>;

    fn scalar_type(&self, kind: ScalarKind, bits: u32) -> Self::Type {
        match kind {
            ScalarKind::Int | ScalarKind::UInt => self.int_type(bits).into(),
            ScalarKind::Float => self.context.f32_type().into(),
            ScalarKind::Double => self.context.f64_type().into(),
        }
    }

    fn void_type(&self) -> Self::Type {
        // `void` never appears as a value type (only as a function return
        // type, handled separately in `declare_function`); `i8` is an inert
        // placeholder that is never actually produced or consumed.
        self.context.i8_type().into()
    }

    fn int_const(&self, ty: Self::Type, value: i64) -> Self::Value {
        ty.into_int_type().const_int(value as u64, true).into()
    }

    fn float_const(&self, ty: Self::Type, value: f64) -> Self::Value {
        ty.into_float_type().const_float(value).into()
    }

    fn declare_function(&mut self, mangled_name: &str, param_types: &[Self::Type], return_type: Self::Type) -> Option<Self::Function> {
        if self.module.get_function(mangled_name).is_some() {
            return None;
        }
        let param_metas: Vec<BasicMetadataTypeEnum> = param_types.iter().map(|t| (*t).into()).collect();
        let fn_type = return_type.fn_type(&param_metas, false);
        // §4.6: user functions get internal linkage, not external.
        Some(self.module.add_function(mangled_name, fn_type, Some(Linkage::Internal)))
    }

    fn append_block(&mut self, func: Self::Function, name: &str) -> Self::Block {
        let block = self.context.append_basic_block(func, name);
        self.entry_blocks.entry(func).or_insert(block);
        block
    }

    fn set_insert_point(&mut self, block: Self::Block) {
        self.builder.position_at_end(block);
    }

    fn function_param(&self, func: Self::Function, index: usize) -> Self::Value {
        func.get_nth_param(index as u32).expect("param index out of range")
    }

    fn alloca_entry(&mut self, func: Self::Function, ty: Self::Type, name: &str) -> Self::Value {
        let entry = *self.entry_blocks.get(&func).expect("append_block called before any alloca_entry");
        let saved = self.builder.get_insert_block();
        match entry.get_first_instruction() {
            Some(first) => self.builder.position_before(&first),
            None => self.builder.position_at_end(entry),
        }
        let slot = self.builder.build_alloca(ty, name).expect("alloca in a verified-reachable entry block");
        if let Some(saved) = saved {
            self.builder.position_at_end(saved);
        }
        slot.as_basic_value_enum()
    }

    fn load(&mut self, ty: Self::Type, ptr: Self::Value, name: &str) -> Self::Value {
        self.builder.build_load(ty, ptr.into_pointer_value(), name).expect("load from a previously allocated slot")
    }

    fn store(&mut self, ptr: Self::Value, value: Self::Value) {
        self.builder.build_store(ptr.into_pointer_value(), value).expect("store to a previously allocated slot");
    }

    fn sext(&mut self, value: Self::Value, to: Self::Type) -> Self::Value {
        self.builder
            .build_int_s_extend(value.into_int_value(), to.into_int_type(), "sext")
            .expect("widening cast")
            .into()
    }

    fn zext(&mut self, value: Self::Value, to: Self::Type) -> Self::Value {
        self.builder
            .build_int_z_extend(value.into_int_value(), to.into_int_type(), "zext")
            .expect("widening cast")
            .into()
    }

    fn trunc(&mut self, value: Self::Value, to: Self::Type) -> Self::Value {
        self.builder.build_int_truncate(value.into_int_value(), to.into_int_type(), "trunc").expect("narrowing cast").into()
    }

    fn fptrunc(&mut self, value: Self::Value, to: Self::Type) -> Self::Value {
        self.builder
            .build_float_trunc(value.into_float_value(), to.into_float_type(), "fptrunc")
            .expect("double-to-float cast")
            .into()
    }

    fn fpext(&mut self, value: Self::Value, to: Self::Type) -> Self::Value {
        self.builder
            .build_float_ext(value.into_float_value(), to.into_float_type(), "fpext")
            .expect("float-to-double cast")
            .into()
    }

    fn bitcast(&mut self, value: Self::Value, to: Self::Type) -> Self::Value {
        self.builder.build_bit_cast(value, to, "bitcast").expect("same-width reinterpret cast")
    }

    fn ptrcast(&mut self, value: Self::Value, to: Self::Type) -> Self::Value {
        self.builder
            .build_pointer_cast(value.into_pointer_value(), to.into_pointer_type(), "ptrcast")
            .expect("pointer reinterpret cast")
            .into()
    }

    fn add_nsw(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value {
        self.builder.build_int_nsw_add(lhs.into_int_value(), rhs.into_int_value(), "add").expect("int add").into()
    }

    fn sub_nsw(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value {
        self.builder.build_int_nsw_sub(lhs.into_int_value(), rhs.into_int_value(), "sub").expect("int sub").into()
    }

    fn mul_nsw(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value {
        self.builder.build_int_nsw_mul(lhs.into_int_value(), rhs.into_int_value(), "mul").expect("int mul").into()
    }

    fn sdiv(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value {
        self.builder.build_int_signed_div(lhs.into_int_value(), rhs.into_int_value(), "sdiv").expect("signed div").into()
    }

    fn udiv(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value {
        self.builder.build_int_unsigned_div(lhs.into_int_value(), rhs.into_int_value(), "udiv").expect("unsigned div").into()
    }

    fn fadd(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value {
        self.builder.build_float_add(lhs.into_float_value(), rhs.into_float_value(), "fadd").expect("float add").into()
    }

    fn fsub(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value {
        self.builder.build_float_sub(lhs.into_float_value(), rhs.into_float_value(), "fsub").expect("float sub").into()
    }

    fn fmul(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value {
        self.builder.build_float_mul(lhs.into_float_value(), rhs.into_float_value(), "fmul").expect("float mul").into()
    }

    fn fdiv(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value {
        self.builder.build_float_div(lhs.into_float_value(), rhs.into_float_value(), "fdiv").expect("float div").into()
    }

    fn call(&mut self, func: Self::Function, args: &[Self::Value], name: &str) -> Option<Self::Value> {
        let arg_metas: Vec<BasicMetadataValueEnum> = args.iter().map(|v| (*v).into()).collect();
        let call_site = self.builder.build_call(func, &arg_metas, name).expect("call to a declared function");
        call_site.try_as_basic_value().left()
    }

    fn ret(&mut self, value: Option<Self::Value>) {
        match value {
            Some(v) => {
                self.builder.build_return(Some(&v as &dyn BasicValue)).expect("return in a block with a terminator slot");
            }
            None => {
                self.builder.build_return(None).expect("void return");
            }
        }
    }

    fn verify_function(&self, func: Self::Function) -> Result<(), String> {
        if func.verify(true) { Ok(()) } else { Err(format!("LLVM verifier rejected function `{}`", func.get_name().to_string_lossy())) }
    }

    fn emit_object(&mut self, path: &Path) -> Result<(), String> {
        Target::initialize_native(&InitializationConfig::default()).map_err(|e| e.to_string())?;
        let triple = TargetMachine::get_default_triple();
        let target = Target::from_triple(&triple).map_err(|e| e.to_string())?;
        let cpu = TargetMachine::get_host_cpu_name().to_string();
        let features = TargetMachine::get_host_cpu_features().to_string();
        let machine = target
            .create_target_machine(&triple, &cpu, &features, OptimizationLevel::Default, RelocMode::PIC, CodeModel::Default)
            .ok_or_else(|| "could not create a target machine for the host triple".to_owned())?;

        self.module.set_triple(&triple);
        self.module.set_data_layout(&machine.get_target_data().get_data_layout());

        machine.write_to_file(&self.module, FileType::Object, path).map_err(|e| e.to_string())
    }

    fn print_module(&self) -> String {
        self.module.print_to_string().to_string()
    }
}
